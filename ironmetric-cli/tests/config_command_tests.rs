//! Integration tests for `ironmetric config` command.
//!
//! Tests config validation and loading with real TOML files.

use std::fs;

use tempfile::TempDir;

use ironmetric_core::config::IronmetricConfig;

#[tokio::test]
async fn test_config_validate_valid_toml() {
    // Given: A valid config file
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("ironmetric.toml");

    let valid_config = r#"
[general]
log_level = "info"
log_format = "pretty"

[processor]
rules_path = "/etc/ironmetric/processor.yaml"
meta_as_tags = ["unit", "source"]
on_error = "drop"
"#;

    fs::write(&config_path, valid_config).expect("should write config");

    // When: Loading the config
    let config = IronmetricConfig::load(&config_path)
        .await
        .expect("valid config should load successfully");

    // Then: Values are taken from the file
    assert_eq!(config.general.log_format, "pretty");
    assert_eq!(config.processor.meta_as_tags, vec!["unit", "source"]);
    assert!(!config.processor.forward_on_error());
}

#[tokio::test]
async fn test_config_validate_malformed_toml() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("bad.toml");
    fs::write(&config_path, "[general\nlog_level = \"info\"\n").expect("should write bad config");

    let result = IronmetricConfig::load(&config_path).await;

    assert!(result.is_err(), "malformed TOML should fail to load");
}

#[tokio::test]
async fn test_config_validate_missing_file() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("nonexistent.toml");

    let err = IronmetricConfig::load(&config_path)
        .await
        .expect_err("missing file should fail");

    assert!(err.to_string().contains("not found"), "got: {err}");
}

#[tokio::test]
async fn test_config_validate_empty_file_uses_defaults() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("empty.toml");
    fs::write(&config_path, "").expect("should write empty config");

    let config = IronmetricConfig::load(&config_path)
        .await
        .expect("empty config should load with defaults");

    assert_eq!(config.general.log_level, "info");
    assert!(config.processor.rules_path.is_empty());
    assert!(config.processor.forward_on_error());
}

#[tokio::test]
async fn test_config_rejects_empty_meta_key() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("ironmetric.toml");
    fs::write(&config_path, "[processor]\nmeta_as_tags = [\"unit\", \"\"]\n")
        .expect("should write config");

    let err = IronmetricConfig::load(&config_path)
        .await
        .expect_err("empty meta key should be rejected");

    assert!(err.to_string().contains("processor.meta_as_tags"), "got: {err}");
}

#[tokio::test]
async fn test_config_show_round_trips_through_toml() {
    // Given: A config loaded from disk
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("ironmetric.toml");
    fs::write(
        &config_path,
        "[processor]\nrules_path = \"rules.json\"\nnormalize_units = true\n",
    )
    .expect("should write config");
    let config = IronmetricConfig::load(&config_path)
        .await
        .expect("should load");

    // When: Serializing as `config show` does
    let rendered = toml::to_string_pretty(&config).expect("should serialize");

    // Then: Parsing the output yields the same settings
    let reparsed = IronmetricConfig::parse(&rendered).expect("output should parse");
    assert_eq!(reparsed.processor.rules_path, "rules.json");
    assert!(reparsed.processor.normalize_units);
}
