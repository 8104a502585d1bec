//! Persisted assistant state
//!
//! The persistence layer owns where and how this is stored; this module only defines
//! the shape and its lenient decoding.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::models::{InsertMode, ProfileOverrides, WireFormat};

/// Snapshot of a registry, as written by [`ProviderRegistry::snapshot`]
///
/// [`ProviderRegistry::snapshot`]: super::ProviderRegistry::snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PersistedState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remember_key: Option<bool>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_insert_mode"
    )]
    pub insert_mode: Option<InsertMode>,
    pub providers: BTreeMap<String, StoredProfile>,
}

/// One provider's persisted fields; absent fields are left untouched on restore
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoredProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "type", alias = "wireFormat")]
    pub wire_format: Option<WireFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", alias = "endpoint")]
    pub endpoint_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_count"
    )]
    pub max_tokens: Option<u32>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_number"
    )]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anthropic_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_headers: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl StoredProfile {
    /// Convert to an override layer; the key is kept only when `with_key` is set
    pub fn to_overrides(&self, with_key: bool) -> ProfileOverrides {
        ProfileOverrides {
            label: self.label.clone(),
            wire_format: self.wire_format,
            enabled: self.enabled,
            base_url: self.base_url.clone(),
            endpoint_path: self.endpoint_path.clone(),
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            system_prompt: self.system_prompt.clone(),
            instructions: self.instructions.clone(),
            anthropic_version: self.anthropic_version.clone(),
            organization: self.organization.clone(),
            extra_headers: self.extra_headers.clone(),
            api_key: self
                .api_key
                .clone()
                .filter(|key| with_key && !key.is_empty()),
        }
    }
}

/// Accept a number or a numeric string; anything else, or a non-finite value, is absent
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let number = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(number.filter(|n| n.is_finite()))
}

/// Like [`lenient_number`], truncated to a count; negative values become zero
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let number = lenient_number(deserializer)?;
    Ok(number.map(|n| n.trunc().clamp(0.0, f64::from(u32::MAX)) as u32))
}

/// Accept only the two known insert modes
fn lenient_insert_mode<'de, D>(deserializer: D) -> Result<Option<InsertMode>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value.as_ref().and_then(Value::as_str) {
        Some("insert") => Some(InsertMode::Insert),
        Some("replace") => Some(InsertMode::Replace),
        _ => None,
    })
}
