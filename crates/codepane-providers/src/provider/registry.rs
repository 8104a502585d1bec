//! Per-widget registry of provider profiles

use std::collections::BTreeMap;

use tracing::{debug, info};

use super::snapshot::{PersistedState, StoredProfile};
use crate::error::ProviderError;
use crate::models::{InsertMode, ProfileField, ProfileOverrides, ProviderProfile};

/// Registry of configured backends with exactly one active profile
///
/// Profiles keep their registration order; fallback picks the first enabled profile in
/// that order.
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    profiles: Vec<ProviderProfile>,
    active: String,
    remember_key: bool,
    insert_mode: InsertMode,
}

impl ProviderRegistry {
    pub fn new(profiles: Vec<ProviderProfile>, active: impl Into<String>) -> Self {
        Self {
            profiles,
            active: active.into(),
            remember_key: false,
            insert_mode: InsertMode::default(),
        }
    }

    /// Registry over the built-in profiles with `openai` active
    pub fn with_defaults() -> Self {
        Self::new(ProviderProfile::builtins(), "openai")
    }

    /// Register a profile, replacing any profile with the same id in place
    pub fn register(&mut self, profile: ProviderProfile) {
        match self.profiles.iter_mut().find(|p| p.id == profile.id) {
            Some(existing) => *existing = profile,
            None => self.profiles.push(profile),
        }
    }

    pub fn profiles(&self) -> &[ProviderProfile] {
        &self.profiles
    }

    pub fn get(&self, id: &str) -> Option<&ProviderProfile> {
        self.profiles.iter().find(|p| p.id == id)
    }

    pub fn has_provider(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Id of the nominally active profile, which may be disabled
    pub fn active_id(&self) -> &str {
        &self.active
    }

    pub fn set_active(&mut self, id: &str) -> Result<(), ProviderError> {
        if !self.has_provider(id) {
            return Err(ProviderError::NotFound(id.to_string()));
        }
        self.active = id.to_string();
        Ok(())
    }

    fn first_enabled_id(&self) -> Option<String> {
        self.profiles
            .iter()
            .find(|p| p.enabled)
            .map(|p| p.id.clone())
    }

    /// The active profile if enabled, else the first enabled profile
    ///
    /// Falling back updates the active id.
    pub fn get_active(&mut self) -> Option<&ProviderProfile> {
        let active_enabled = self.get(&self.active).map_or(false, |p| p.enabled);
        if !active_enabled {
            let fallback = self.first_enabled_id()?;
            debug!("Provider '{}' unavailable, falling back to '{}'", self.active, fallback);
            self.active = fallback;
        }
        self.get(&self.active)
    }

    /// Change one field of one profile in place
    pub fn set_field(&mut self, id: &str, field: ProfileField) -> Result<(), ProviderError> {
        let profile = self
            .profiles
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| ProviderError::NotFound(id.to_string()))?;
        ProfileOverrides::from(field).apply_to(profile);
        Ok(())
    }

    /// Change one field of the active profile
    pub fn set_active_field(&mut self, field: ProfileField) -> Result<(), ProviderError> {
        let id = self
            .get_active()
            .map(|p| p.id.clone())
            .ok_or(ProviderError::NoActiveProvider)?;
        self.set_field(&id, field)
    }

    pub fn remember_key(&self) -> bool {
        self.remember_key
    }

    pub fn set_remember_key(&mut self, remember: bool) {
        self.remember_key = remember;
    }

    pub fn insert_mode(&self) -> InsertMode {
        self.insert_mode
    }

    pub fn set_insert_mode(&mut self, mode: InsertMode) {
        self.insert_mode = mode;
    }

    /// Persistable view of every profile; keys are included only when remembered
    pub fn snapshot(&self) -> PersistedState {
        let providers = self
            .profiles
            .iter()
            .map(|profile| {
                let stored = StoredProfile {
                    label: Some(profile.label.clone()),
                    wire_format: Some(profile.wire_format),
                    enabled: Some(profile.enabled),
                    base_url: Some(profile.base_url.trim().to_string()),
                    endpoint_path: Some(profile.endpoint_path.trim().to_string()),
                    model: Some(profile.model.trim().to_string()),
                    max_tokens: Some(profile.max_tokens),
                    temperature: Some(profile.temperature).filter(|t| t.is_finite()),
                    system_prompt: Some(profile.system_prompt.clone()),
                    instructions: Some(profile.instructions.clone()),
                    anthropic_version: Some(profile.anthropic_version.trim().to_string()),
                    organization: Some(profile.organization.clone().unwrap_or_default()),
                    extra_headers: (!profile.extra_headers.is_empty())
                        .then(|| profile.extra_headers.clone()),
                    api_key: (self.remember_key && !profile.api_key.is_empty())
                        .then(|| profile.api_key.clone()),
                };
                (profile.id.clone(), stored)
            })
            .collect::<BTreeMap<_, _>>();

        PersistedState {
            provider: Some(self.active.clone()),
            remember_key: Some(self.remember_key),
            insert_mode: Some(self.insert_mode),
            providers,
        }
    }

    /// Merge a persisted snapshot into the current profiles
    ///
    /// Only fields present in the snapshot are overwritten. Stored keys are applied only
    /// when the snapshot opted into remembering them. Unknown ids are added, built from
    /// defaults and the stored fields.
    pub fn restore(&mut self, state: &PersistedState) {
        let with_key = state.remember_key.unwrap_or(false);

        for (id, stored) in &state.providers {
            let mut layer = stored.to_overrides(with_key);
            match self.profiles.iter_mut().find(|p| &p.id == id) {
                Some(profile) => {
                    layer.label = None;
                    layer.wire_format = None;
                    layer.apply_to(profile);
                }
                None => {
                    debug!("Restoring unknown provider '{}'", id);
                    self.profiles.push(ProviderProfile::layered(id, &[&layer]));
                }
            }
        }

        if let Some(remember) = state.remember_key {
            self.remember_key = remember;
        }
        if let Some(mode) = state.insert_mode {
            self.insert_mode = mode;
        }

        let stored_active = state
            .provider
            .as_deref()
            .filter(|id| self.get(id).map_or(false, |p| p.enabled));
        match stored_active {
            Some(id) => self.active = id.to_string(),
            None => {
                let current_enabled = self.get(&self.active).map_or(false, |p| p.enabled);
                if !current_enabled {
                    if let Some(fallback) = self.first_enabled_id() {
                        self.active = fallback;
                    }
                }
            }
        }
        info!("Restored assistant state; active provider '{}'", self.active);
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_active_falls_back_to_first_enabled() {
        let mut registry = ProviderRegistry::with_defaults();
        registry
            .set_field("openai", ProfileField::Enabled(false))
            .unwrap();

        let active = registry.get_active().map(|p| p.id.clone());
        assert_eq!(active.as_deref(), Some("anthropic"));
        assert_eq!(registry.active_id(), "anthropic");
    }

    #[test]
    fn test_get_active_none_when_all_disabled() {
        let mut registry = ProviderRegistry::with_defaults();
        registry.set_field("openai", ProfileField::Enabled(false)).unwrap();
        registry.set_field("anthropic", ProfileField::Enabled(false)).unwrap();
        assert!(registry.get_active().is_none());
        assert!(matches!(
            registry.set_active_field(ProfileField::Model("x".into())),
            Err(ProviderError::NoActiveProvider)
        ));
    }

    #[test]
    fn test_set_field_and_unknown_id() {
        let mut registry = ProviderRegistry::with_defaults();
        registry
            .set_field("anthropic", ProfileField::Model(" claude-x ".into()))
            .unwrap();
        assert_eq!(registry.get("anthropic").unwrap().model, "claude-x");

        assert_eq!(
            registry.set_field("nope", ProfileField::Enabled(true)),
            Err(ProviderError::NotFound("nope".to_string()))
        );
        assert_eq!(
            registry.set_active("nope"),
            Err(ProviderError::NotFound("nope".to_string()))
        );
    }

    #[test]
    fn test_snapshot_omits_key_unless_remembered() {
        let mut registry = ProviderRegistry::with_defaults();
        registry.set_active_field(ProfileField::ApiKey("sk-secret".into())).unwrap();

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.providers["openai"].api_key, None);

        registry.set_remember_key(true);
        let snapshot = registry.snapshot();
        assert_eq!(snapshot.providers["openai"].api_key.as_deref(), Some("sk-secret"));
    }

    #[test]
    fn test_restore_only_overwrites_present_fields() {
        let mut registry = ProviderRegistry::with_defaults();
        let state: PersistedState = serde_json::from_str(
            r#"{
                "provider": "anthropic",
                "insertMode": "insert",
                "providers": {"anthropic": {"model": "claude-y", "apiKey": "sk-ant-dropped"}}
            }"#,
        )
        .unwrap();

        registry.restore(&state);
        let anthropic = registry.get("anthropic").unwrap();
        assert_eq!(anthropic.model, "claude-y");
        assert_eq!(anthropic.base_url, "https://api.anthropic.com/v1");
        assert!(anthropic.api_key.is_empty());
        assert_eq!(registry.active_id(), "anthropic");
        assert_eq!(registry.insert_mode(), InsertMode::Insert);
    }

    #[test]
    fn test_restore_adds_unknown_provider_and_skips_disabled_choice() {
        let mut registry = ProviderRegistry::with_defaults();
        let state: PersistedState = serde_json::from_str(
            r#"{
                "provider": "local",
                "rememberKey": true,
                "providers": {
                    "local": {"type": "anthropic", "baseUrl": "http://127.0.0.1:9/v1",
                              "model": "m", "enabled": false, "apiKey": "k"}
                }
            }"#,
        )
        .unwrap();

        registry.restore(&state);
        let local = registry.get("local").unwrap();
        assert_eq!(local.api_key, "k");
        assert_eq!(local.effective_endpoint(), "/messages");
        assert_eq!(registry.active_id(), "openai");
        assert!(registry.remember_key());
    }

    #[test]
    fn test_snapshot_restore_preserves_profiles() {
        let mut original = ProviderRegistry::with_defaults();
        original.set_remember_key(true);
        original.set_field("anthropic", ProfileField::ApiKey("k".into())).unwrap();
        original.set_field("anthropic", ProfileField::Temperature(0.9)).unwrap();
        original.set_active("anthropic").unwrap();

        let json = serde_json::to_string(&original.snapshot()).unwrap();
        let mut restored = ProviderRegistry::with_defaults();
        restored.restore(&serde_json::from_str(&json).unwrap());

        assert_eq!(restored.profiles(), original.profiles());
        assert_eq!(restored.active_id(), "anthropic");
    }
}
