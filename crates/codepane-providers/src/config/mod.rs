//! Configuration management for assistant providers

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ProviderError;
use crate::models::{InsertMode, ProfileOverrides, ProviderProfile, BUILTIN_IDS};
use crate::provider::ProviderRegistry;

/// Environment variable selecting the default provider
pub const DEFAULT_PROVIDER_ENV: &str = "CODEPANE_DEFAULT_PROVIDER";

/// Assistant configuration as stored in YAML
///
/// ```yaml
/// default_provider: anthropic
/// insert_mode: insert
/// providers:
///   anthropic:
///     model: claude-3-5-haiku-latest
///   local:
///     wire_format: openai
///     base_url: http://localhost:8080/v1
///     model: qwen2.5-coder
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub default_provider: Option<String>,
    pub insert_mode: Option<InsertMode>,
    pub remember_key: Option<bool>,
    pub providers: BTreeMap<String, ProfileOverrides>,
}

/// Configuration manager for loading and validating assistant configuration
#[derive(Debug, Clone, Default)]
pub struct ConfigurationManager {
    config: AssistantConfig,
}

impl ConfigurationManager {
    /// Create a manager holding only the built-in defaults
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(&self) -> &AssistantConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut AssistantConfig {
        &mut self.config
    }

    /// Load configuration with proper precedence:
    /// 1. Environment variables (highest priority)
    /// 2. Project config (./.codepane/assistant.yaml)
    /// 3. Global config (<config dir>/codepane/assistant.yaml)
    /// 4. Built-in defaults (lowest priority)
    pub fn load_with_precedence(&mut self) -> Result<(), ProviderError> {
        if let Some(global) = Self::get_global_config_path() {
            self.load_from_file(&global)?;
        }
        self.merge_from_file(&Self::get_project_config_path())?;
        self.load_from_env()?;
        Ok(())
    }

    /// Get the global configuration path, if the platform has a config directory
    pub fn get_global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("codepane").join("assistant.yaml"))
    }

    /// Get the project configuration path
    pub fn get_project_config_path() -> PathBuf {
        PathBuf::from("./.codepane/assistant.yaml")
    }

    /// Apply `<ID>_API_KEY` for every known provider and the default provider override
    pub fn load_from_env(&mut self) -> Result<(), ProviderError> {
        for id in self.known_ids() {
            let env_var = format!("{}_API_KEY", id.to_uppercase().replace('-', "_"));
            if let Ok(api_key) = std::env::var(&env_var) {
                debug!("Using {} for provider '{}'", env_var, id);
                self.config.providers.entry(id).or_default().api_key = Some(api_key);
            }
        }

        if let Ok(provider) = std::env::var(DEFAULT_PROVIDER_ENV) {
            let provider = provider.trim();
            if !provider.is_empty() {
                self.config.default_provider = Some(provider.to_string());
            }
        }

        Ok(())
    }

    /// Load configuration from a YAML file (replaces current config)
    pub fn load_from_file(&mut self, path: &Path) -> Result<(), ProviderError> {
        if let Some(config) = Self::read_file(path)? {
            self.config = config;
        }
        Ok(())
    }

    /// Merge configuration from a YAML file (preserves fields the file omits)
    pub fn merge_from_file(&mut self, path: &Path) -> Result<(), ProviderError> {
        if let Some(config) = Self::read_file(path)? {
            self.merge(config);
        }
        Ok(())
    }

    /// Fold `other` into the current configuration; fields set in `other` win
    pub fn merge(&mut self, other: AssistantConfig) {
        if other.default_provider.is_some() {
            self.config.default_provider = other.default_provider;
        }
        if other.insert_mode.is_some() {
            self.config.insert_mode = other.insert_mode;
        }
        if other.remember_key.is_some() {
            self.config.remember_key = other.remember_key;
        }
        for (id, overrides) in other.providers {
            self.config.providers.entry(id).or_default().merge(overrides);
        }
    }

    fn read_file(path: &Path) -> Result<Option<AssistantConfig>, ProviderError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            ProviderError::ConfigError(format!("Failed to read config file: {}", e))
        })?;

        let config: AssistantConfig = serde_yaml::from_str(&content).map_err(|e| {
            ProviderError::ConfigError(format!("Failed to parse config file: {}", e))
        })?;

        debug!("Loaded assistant configuration from {}", path.display());
        Ok(Some(config))
    }

    /// Built-in ids followed by configured ids, without duplicates
    pub fn known_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = BUILTIN_IDS.iter().map(|id| id.to_string()).collect();
        for id in self.config.providers.keys() {
            if !ids.contains(id) {
                ids.push(id.clone());
            }
        }
        ids
    }

    /// Validate the current configuration
    ///
    /// Validates:
    /// - The default provider, if set, is a known provider
    /// - At least one provider is enabled
    pub fn validate(&self) -> Result<(), ProviderError> {
        let ids = self.known_ids();
        if let Some(default) = &self.config.default_provider {
            if !ids.contains(default) {
                return Err(ProviderError::ConfigError(format!(
                    "Default provider '{}' not configured",
                    default
                )));
            }
        }

        if !self.build_profiles().iter().any(|p| p.enabled) {
            return Err(ProviderError::ConfigError(
                "No enabled providers configured".to_string(),
            ));
        }

        Ok(())
    }

    /// Merge built-in defaults with the configured overrides
    pub fn build_profiles(&self) -> Vec<ProviderProfile> {
        self.known_ids()
            .iter()
            .map(|id| match self.config.providers.get(id) {
                Some(overrides) => ProviderProfile::layered(id, &[overrides]),
                None => ProviderProfile::layered(id, &[]),
            })
            .collect()
    }

    /// Build a per-widget registry from the current configuration
    pub fn build_registry(&self) -> ProviderRegistry {
        let profiles = self.build_profiles();
        let active = self
            .config
            .default_provider
            .clone()
            .or_else(|| profiles.first().map(|p| p.id.clone()))
            .unwrap_or_default();

        let mut registry = ProviderRegistry::new(profiles, active);
        registry.set_insert_mode(self.config.insert_mode.unwrap_or_default());
        registry.set_remember_key(self.config.remember_key.unwrap_or(false));
        registry
    }
}
