//! Data models for providers

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Default sampling temperature
pub const DEFAULT_TEMPERATURE: f64 = 0.2;

/// Default completion budget in tokens
pub const DEFAULT_MAX_TOKENS: u32 = 800;

/// Default value of the `anthropic-version` header
pub const DEFAULT_ANTHROPIC_VERSION: &str = "2023-06-01";

/// System prompt used when a profile has none
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are an assistant that writes JavaScript. Respond with runnable JavaScript code only, without explanations.";

/// Request/response schema spoken by a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    #[default]
    #[serde(alias = "openai-style")]
    OpenAi,
    #[serde(alias = "anthropic-style")]
    Anthropic,
}

impl WireFormat {
    /// Endpoint used when a profile leaves `endpoint_path` empty
    pub fn default_endpoint(&self) -> &'static str {
        match self {
            WireFormat::OpenAi => "/chat/completions",
            WireFormat::Anthropic => "/messages",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WireFormat::OpenAi => "openai",
            WireFormat::Anthropic => "anthropic",
        }
    }
}

impl fmt::Display for WireFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How generated code is placed into the editor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsertMode {
    /// Replace the whole document
    #[default]
    Replace,
    /// Replace the current selection
    Insert,
}

/// One configured AI backend
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderProfile {
    pub id: String,
    pub label: String,
    pub wire_format: WireFormat,
    pub base_url: String,
    /// Empty means the wire format's default endpoint
    pub endpoint_path: String,
    pub model: String,
    /// Zero means [`DEFAULT_MAX_TOKENS`]
    pub max_tokens: u32,
    pub temperature: f64,
    pub system_prompt: String,
    /// Prepended to every prompt, separated by a blank line
    pub instructions: String,
    pub api_key: String,
    pub organization: Option<String>,
    pub anthropic_version: String,
    pub extra_headers: BTreeMap<String, String>,
    pub enabled: bool,
}

impl ProviderProfile {
    /// Generic profile for a wire format, with no endpoint or model filled in
    pub fn for_format(id: impl Into<String>, wire_format: WireFormat) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            wire_format,
            base_url: String::new(),
            endpoint_path: wire_format.default_endpoint().to_string(),
            model: String::new(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            instructions: String::new(),
            api_key: String::new(),
            organization: None,
            anthropic_version: DEFAULT_ANTHROPIC_VERSION.to_string(),
            extra_headers: BTreeMap::new(),
            enabled: true,
        }
    }

    /// Built-in defaults for a well-known provider id
    pub fn builtin(id: &str) -> Option<Self> {
        match id {
            "openai" => Some(Self {
                label: "OpenAI".to_string(),
                base_url: "https://api.openai.com/v1".to_string(),
                model: "gpt-4.1-mini".to_string(),
                ..Self::for_format("openai", WireFormat::OpenAi)
            }),
            "anthropic" => Some(Self {
                label: "Anthropic".to_string(),
                base_url: "https://api.anthropic.com/v1".to_string(),
                model: "claude-3-5-sonnet-20241022".to_string(),
                ..Self::for_format("anthropic", WireFormat::Anthropic)
            }),
            _ => None,
        }
    }

    /// Every built-in profile, in registration order
    pub fn builtins() -> Vec<Self> {
        BUILTIN_IDS.iter().filter_map(|id| Self::builtin(id)).collect()
    }

    /// Three-tier merge: built-in defaults, then each override layer in order
    ///
    /// The base is the built-in profile for `id`, else a generic profile for the wire
    /// format named by the first layer that sets one, else a generic openai-style
    /// profile. Fields a layer leaves unset never overwrite earlier values.
    pub fn layered(id: &str, layers: &[&ProfileOverrides]) -> Self {
        let mut profile = Self::builtin(id).unwrap_or_else(|| {
            let format = layers
                .iter()
                .find_map(|layer| layer.wire_format)
                .unwrap_or_default();
            Self::for_format(id, format)
        });
        for layer in layers {
            layer.apply_to(&mut profile);
        }
        profile
    }

    /// `max_tokens`, falling back to the default when unset
    pub fn effective_max_tokens(&self) -> u32 {
        if self.max_tokens == 0 {
            DEFAULT_MAX_TOKENS
        } else {
            self.max_tokens
        }
    }

    /// `temperature`, falling back to the default when non-finite or non-positive
    pub fn effective_temperature(&self) -> f64 {
        if self.temperature.is_finite() && self.temperature > 0.0 {
            self.temperature
        } else {
            DEFAULT_TEMPERATURE
        }
    }

    pub fn effective_system_prompt(&self) -> &str {
        if self.system_prompt.trim().is_empty() {
            DEFAULT_SYSTEM_PROMPT
        } else {
            &self.system_prompt
        }
    }

    pub fn effective_endpoint(&self) -> &str {
        let endpoint = self.endpoint_path.trim();
        if endpoint.is_empty() {
            self.wire_format.default_endpoint()
        } else {
            endpoint
        }
    }

    pub fn display_name(&self) -> &str {
        if self.label.is_empty() {
            &self.id
        } else {
            &self.label
        }
    }
}

impl fmt::Debug for ProviderProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let api_key = if self.api_key.is_empty() {
            ""
        } else {
            "[REDACTED]"
        };
        f.debug_struct("ProviderProfile")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("wire_format", &self.wire_format)
            .field("base_url", &self.base_url)
            .field("endpoint_path", &self.endpoint_path)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("api_key", &api_key)
            .field("organization", &self.organization)
            .field("extra_headers", &self.extra_headers.keys().collect::<Vec<_>>())
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

/// Ids with built-in defaults
pub const BUILTIN_IDS: [&str; 2] = ["openai", "anthropic"];

/// A partial profile: every field optional
///
/// Used for configuration files, stored snapshots and live edits alike.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wire_format: Option<WireFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anthropic_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_headers: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

impl ProfileOverrides {
    /// Overwrite the fields this layer sets
    pub fn apply_to(&self, profile: &mut ProviderProfile) {
        if let Some(label) = &self.label {
            profile.label = label.clone();
        }
        if let Some(format) = self.wire_format {
            profile.wire_format = format;
        }
        if let Some(base_url) = &self.base_url {
            profile.base_url = base_url.trim().to_string();
        }
        if let Some(endpoint) = &self.endpoint_path {
            profile.endpoint_path = endpoint.trim().to_string();
        }
        if let Some(model) = &self.model {
            profile.model = model.trim().to_string();
        }
        if let Some(max_tokens) = self.max_tokens {
            profile.max_tokens = max_tokens;
        }
        if let Some(temperature) = self.temperature.filter(|t| t.is_finite()) {
            profile.temperature = temperature;
        }
        if let Some(prompt) = &self.system_prompt {
            profile.system_prompt = prompt.clone();
        }
        if let Some(instructions) = &self.instructions {
            profile.instructions = instructions.clone();
        }
        if let Some(api_key) = &self.api_key {
            profile.api_key = api_key.clone();
        }
        if let Some(organization) = &self.organization {
            let organization = organization.trim();
            profile.organization = (!organization.is_empty()).then(|| organization.to_string());
        }
        if let Some(version) = &self.anthropic_version {
            profile.anthropic_version = version.trim().to_string();
        }
        if let Some(headers) = &self.extra_headers {
            profile.extra_headers = headers.clone();
        }
        if let Some(enabled) = self.enabled {
            profile.enabled = enabled;
        }
    }

    /// Fold a later layer into this one; fields set in `other` win
    pub fn merge(&mut self, other: ProfileOverrides) {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if other.$field.is_some() {
                    self.$field = other.$field;
                })*
            };
        }
        take!(
            label,
            wire_format,
            base_url,
            endpoint_path,
            model,
            max_tokens,
            temperature,
            system_prompt,
            instructions,
            api_key,
            organization,
            anthropic_version,
            extra_headers,
            enabled
        );
    }
}

/// A single editable profile field with its new value
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileField {
    Label(String),
    WireFormat(WireFormat),
    BaseUrl(String),
    EndpointPath(String),
    Model(String),
    MaxTokens(u32),
    Temperature(f64),
    SystemPrompt(String),
    Instructions(String),
    ApiKey(String),
    Organization(String),
    AnthropicVersion(String),
    ExtraHeaders(BTreeMap<String, String>),
    Enabled(bool),
}

impl From<ProfileField> for ProfileOverrides {
    fn from(field: ProfileField) -> Self {
        let mut overrides = ProfileOverrides::default();
        match field {
            ProfileField::Label(v) => overrides.label = Some(v),
            ProfileField::WireFormat(v) => overrides.wire_format = Some(v),
            ProfileField::BaseUrl(v) => overrides.base_url = Some(v),
            ProfileField::EndpointPath(v) => overrides.endpoint_path = Some(v),
            ProfileField::Model(v) => overrides.model = Some(v),
            ProfileField::MaxTokens(v) => overrides.max_tokens = Some(v),
            ProfileField::Temperature(v) => overrides.temperature = Some(v),
            ProfileField::SystemPrompt(v) => overrides.system_prompt = Some(v),
            ProfileField::Instructions(v) => overrides.instructions = Some(v),
            ProfileField::ApiKey(v) => overrides.api_key = Some(v),
            ProfileField::Organization(v) => overrides.organization = Some(v),
            ProfileField::AnthropicVersion(v) => overrides.anthropic_version = Some(v),
            ProfileField::ExtraHeaders(v) => overrides.extra_headers = Some(v),
            ProfileField::Enabled(v) => overrides.enabled = Some(v),
        }
        overrides
    }
}
