//! ironmetric.toml 통합 설정 테스트
//!
//! - ironmetric.toml.example 파싱 테스트
//! - 파일 로딩 (tokio::fs) 및 에러 경로
//! - 환경변수 우선순위 테스트

use ironmetric_core::config::IronmetricConfig;
use ironmetric_core::error::{ConfigError, IronmetricError};

// =============================================================================
// ironmetric.toml.example 파싱 테스트
// =============================================================================

#[test]
fn example_config_parses_successfully() {
    let content = include_str!("../../../ironmetric.toml.example");
    let config = IronmetricConfig::parse(content).expect("example config should parse");

    assert_eq!(config.general.log_level, "info");
    assert_eq!(config.general.log_format, "json");
    assert_eq!(config.processor.rules_path, "/etc/ironmetric/processor.json");
    assert_eq!(config.processor.meta_as_tags, vec!["unit"]);
    assert!(config.processor.forward_on_error());
}

#[test]
fn example_config_passes_validation() {
    let content = include_str!("../../../ironmetric.toml.example");
    let config = IronmetricConfig::parse(content).expect("should parse");
    config
        .validate()
        .expect("example config should pass validation");
}

// =============================================================================
// 파일 로딩 테스트
// =============================================================================

#[tokio::test]
#[serial_test::serial]
async fn load_reads_file_and_validates() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let path = dir.path().join("ironmetric.toml");
    std::fs::write(&path, "[general]\nlog_level = \"debug\"\n").expect("should write");

    let config = IronmetricConfig::load(&path).await.expect("should load");
    assert_eq!(config.general.log_level, "debug");
}

#[tokio::test]
async fn missing_file_reports_not_found() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let path = dir.path().join("absent.toml");

    let err = IronmetricConfig::load(&path).await.unwrap_err();
    assert!(matches!(
        err,
        IronmetricError::Config(ConfigError::FileNotFound { .. })
    ));
}

#[tokio::test]
async fn invalid_value_in_file_fails_validation() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let path = dir.path().join("bad.toml");
    std::fs::write(&path, "[processor]\non_error = \"explode\"\n").expect("should write");

    let err = IronmetricConfig::from_file(&path).await.unwrap_err();
    assert!(err.to_string().contains("processor.on_error"));
}

// =============================================================================
// 환경변수 우선순위 테스트
// =============================================================================

#[test]
#[serial_test::serial]
fn env_override_takes_precedence_over_toml() {
    let toml = r#"
[general]
log_level = "info"
"#;

    let original = std::env::var("IRONMETRIC_GENERAL_LOG_LEVEL").ok();
    // SAFETY: serial 테스트로 직렬화되어 환경변수 조작이 안전합니다.
    unsafe {
        std::env::set_var("IRONMETRIC_GENERAL_LOG_LEVEL", "error");
    }

    let mut config = IronmetricConfig::parse(toml).expect("should parse");
    config.apply_env_overrides();
    let result = config.general.log_level.clone();

    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var("IRONMETRIC_GENERAL_LOG_LEVEL", val),
            None => std::env::remove_var("IRONMETRIC_GENERAL_LOG_LEVEL"),
        }
    }

    assert_eq!(result, "error");
}

#[test]
#[serial_test::serial]
fn env_override_error_policy() {
    let original = std::env::var("IRONMETRIC_PROCESSOR_ON_ERROR").ok();
    // SAFETY: serial 테스트로 직렬화되어 환경변수 조작이 안전합니다.
    unsafe {
        std::env::set_var("IRONMETRIC_PROCESSOR_ON_ERROR", "drop");
    }

    let mut config = IronmetricConfig::default();
    config.apply_env_overrides();

    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var("IRONMETRIC_PROCESSOR_ON_ERROR", val),
            None => std::env::remove_var("IRONMETRIC_PROCESSOR_ON_ERROR"),
        }
    }

    assert!(!config.processor.forward_on_error());
}
