//! Integration tests for configuration loading

use laminate::config::{project_config_path, CacheConfig, ConfigLoader, PROJECT_CONFIG_FILE};
use laminate::error::ConfigError;
use std::fs;
use tempfile::TempDir;

fn write_project_config(contents: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(PROJECT_CONFIG_FILE), contents).unwrap();
    dir
}

/// Test that the project file overrides built-in defaults
#[test]
fn test_project_file_overrides_defaults() {
    let dir = write_project_config(
        r#"
[cache]
max_parallelism = 2
max_index_nodes = 512

[cache.variant_fallbacks]
standin = ["render", "proxy"]

[logging]
level = "debug"
format = "json"
"#,
    );

    let config = ConfigLoader::new()
        .with_project_root(dir.path())
        .without_user_file()
        .without_environment()
        .load()
        .unwrap();

    assert_eq!(config.cache.max_parallelism, 2);
    assert_eq!(config.cache.max_index_nodes, 512);
    assert!(config.cache.cache_property_indexes);
    assert_eq!(
        config.cache.variant_fallbacks.get("standin"),
        Some(&vec!["render".to_string(), "proxy".to_string()])
    );
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.logging.format, "json");
    assert_eq!(config.logging.output, "stderr");
}

/// Test that a missing project file leaves the defaults in place
#[test]
fn test_missing_project_file() {
    let dir = TempDir::new().unwrap();
    assert!(!project_config_path(dir.path()).exists());

    let config = ConfigLoader::new()
        .with_project_root(dir.path())
        .without_user_file()
        .without_environment()
        .load()
        .unwrap();
    assert_eq!(config.cache, CacheConfig::default());
}

/// Test that invalid settings are rejected at load time
#[test]
fn test_invalid_values_are_rejected() {
    let dir = write_project_config("[cache]\nmax_index_nodes = 0\n");
    let result = ConfigLoader::new()
        .with_project_root(dir.path())
        .without_user_file()
        .without_environment()
        .load();
    assert!(matches!(result, Err(ConfigError::Invalid(_))));

    let dir = write_project_config("[cache]\nmax_parallelism = \"many\"\n");
    let result = ConfigLoader::new()
        .with_project_root(dir.path())
        .without_user_file()
        .without_environment()
        .load();
    assert!(matches!(result, Err(ConfigError::Load(_))));
}

/// Test that environment variables take precedence over the project file
#[test]
fn test_environment_overrides_project_file() {
    let dir = write_project_config("[cache]\nmax_parallelism = 2\n");
    std::env::set_var("LAMINATE__CACHE__MAX_PARALLELISM", "6");
    let result = ConfigLoader::new()
        .with_project_root(dir.path())
        .without_user_file()
        .load();
    std::env::remove_var("LAMINATE__CACHE__MAX_PARALLELISM");

    assert_eq!(result.unwrap().cache.max_parallelism, 6);
}
