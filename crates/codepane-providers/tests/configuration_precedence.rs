//! Integration tests for configuration loading from multiple sources

use std::fs;

use codepane_providers::{ConfigurationManager, InsertMode, ProviderError};
use serial_test::serial;
use tempfile::TempDir;

fn write_config(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

/// Test: Project file overrides global file field by field
#[test]
fn test_project_merges_over_global() {
    let dir = TempDir::new().unwrap();
    let global = write_config(
        &dir,
        "global.yaml",
        "insert_mode: insert\nproviders:\n  openai:\n    model: gpt-4o\n    temperature: 0.6\n",
    );
    let project = write_config(
        &dir,
        "project.yaml",
        "providers:\n  openai:\n    model: gpt-4o-mini\n",
    );

    let mut manager = ConfigurationManager::new();
    manager.load_from_file(&global).unwrap();
    manager.merge_from_file(&project).unwrap();

    let registry = manager.build_registry();
    let openai = registry.get("openai").unwrap();
    assert_eq!(openai.model, "gpt-4o-mini");
    assert_eq!(openai.temperature, 0.6);
    assert_eq!(registry.insert_mode(), InsertMode::Insert);
}

/// Test: Missing files are skipped
#[test]
fn test_missing_file_is_ignored() {
    let dir = TempDir::new().unwrap();
    let mut manager = ConfigurationManager::new();
    manager
        .merge_from_file(&dir.path().join("absent.yaml"))
        .unwrap();
    assert_eq!(manager.config().providers.len(), 0);
}

/// Test: Malformed YAML is a configuration error
#[test]
fn test_invalid_yaml_is_config_error() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "broken.yaml", "providers: [unclosed");

    let mut manager = ConfigurationManager::new();
    assert!(matches!(
        manager.load_from_file(&path),
        Err(ProviderError::ConfigError(_))
    ));
}

/// Test: Environment variables override file values
#[test]
#[serial]
fn test_env_overrides_files() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        "project.yaml",
        "default_provider: openai\nproviders:\n  anthropic:\n    api_key: file-key\n  my-proxy:\n    base_url: http://localhost:1234\n    model: local\n",
    );

    std::env::set_var("ANTHROPIC_API_KEY", "env-key");
    std::env::set_var("MY_PROXY_API_KEY", "proxy-key");
    std::env::set_var("CODEPANE_DEFAULT_PROVIDER", "anthropic");

    let mut manager = ConfigurationManager::new();
    manager.merge_from_file(&path).unwrap();
    manager.load_from_env().unwrap();

    std::env::remove_var("ANTHROPIC_API_KEY");
    std::env::remove_var("MY_PROXY_API_KEY");
    std::env::remove_var("CODEPANE_DEFAULT_PROVIDER");

    assert!(manager.validate().is_ok());
    let mut registry = manager.build_registry();
    assert_eq!(registry.get("anthropic").unwrap().api_key, "env-key");
    assert_eq!(registry.get("my-proxy").unwrap().api_key, "proxy-key");
    assert_eq!(registry.get_active().map(|p| p.id.clone()).as_deref(), Some("anthropic"));
}

/// Test: Unknown default provider fails validation
#[test]
#[serial]
fn test_env_default_provider_must_exist() {
    std::env::set_var("CODEPANE_DEFAULT_PROVIDER", "missing");
    let mut manager = ConfigurationManager::new();
    manager.load_from_env().unwrap();
    std::env::remove_var("CODEPANE_DEFAULT_PROVIDER");

    assert!(matches!(
        manager.validate(),
        Err(ProviderError::ConfigError(_))
    ));
}
