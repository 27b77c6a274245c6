//! Integration tests for `ironmetric process` and `ironmetric validate`.
//!
//! Exercises rule files and message streams written to real temporary files.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use ironmetric_cli::cli::MessageFormat;
use ironmetric_cli::commands::process::{self, ProcessOptions};
use ironmetric_cli::commands::validate;
use ironmetric_core::config::IronmetricConfig;
use ironmetric_core::message::{FieldValue, Message};

const RULES_YAML: &str = r#"
drop_messages:
  - debug_metric
rename_messages_if:
  "name == 'net_bytes_in' && tags.type == 'node'": net_in
change_unit_prefix:
  "name == 'net_bytes_in'": M
move_meta_to_tag_if:
  - if: "true"
    key: unit
    value: unit
"#;

const MESSAGES: &str = r#"{"name":"net_bytes_in","tags":{"type":"node","hostname":"n1"},"meta":{"unit":"Byte"},"fields":{"value":1024.0},"timestamp":"2024-05-01T12:00:00Z"}
{"name":"debug_metric","tags":{"type":"node"},"fields":{"value":1},"timestamp":"2024-05-01T12:00:00Z"}
{"name":"cpu_user","tags":{"type":"hwthread","type-id":"3"},"meta":{"unit":"%"},"fields":{"value":12.5},"timestamp":"2024-05-01T12:00:00Z"}
"#;

fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).expect("should write file");
    path
}

fn json_options() -> ProcessOptions {
    ProcessOptions {
        format: MessageFormat::Json,
        meta_as_tags: Vec::new(),
        forward_on_error: true,
    }
}

#[tokio::test]
async fn test_process_applies_rule_file_to_stream() {
    // Given: A YAML rule file and three input messages
    let dir = TempDir::new().expect("should create temp dir");
    let rules = write_file(&dir, "rules.yaml", RULES_YAML);
    let config = IronmetricConfig::default();
    let processor = process::build_processor(Some(rules), &config)
        .await
        .expect("rules should load");

    // When: Processing the stream
    let mut out = Vec::new();
    let summary = process::run(&processor, MESSAGES.as_bytes(), &mut out, &json_options())
        .await
        .expect("run should succeed");

    // Then: The debug metric is dropped and the others are rewritten
    assert_eq!(summary.read, 3);
    assert_eq!(summary.dropped, 1);
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.errors, 0);

    let output = String::from_utf8(out).expect("valid UTF-8");
    let messages: Vec<Message> = output
        .lines()
        .map(|line| serde_json::from_str(line).expect("each line is a message"))
        .collect();
    assert_eq!(messages.len(), 2);

    // Conditions are evaluated against the incoming message
    let net = &messages[0];
    assert_eq!(net.name(), "net_in");
    assert_eq!(net.get_meta("oldname"), Some("net_bytes_in"));
    assert_eq!(net.get_tag("unit"), Some("MB"));
    assert!(!net.has_meta("unit"));
    assert_eq!(net.get_field("value"), Some(&FieldValue::Float(0.001024)));

    let cpu = &messages[1];
    assert_eq!(cpu.name(), "cpu_user");
    assert_eq!(cpu.get_tag("unit"), Some("%"));
}

#[tokio::test]
async fn test_process_line_protocol_output() {
    let config = IronmetricConfig::default();
    let processor = process::build_processor(None, &config)
        .await
        .expect("should build");
    let options = ProcessOptions {
        format: MessageFormat::Line,
        meta_as_tags: vec!["unit".to_owned()],
        forward_on_error: true,
    };
    let input = r#"{"name":"temp","tags":{"hostname":"n1"},"meta":{"unit":"degC"},"fields":{"value":40.5},"timestamp":"1970-01-01T00:00:02Z"}"#;

    let mut out = Vec::new();
    process::run(&processor, input.as_bytes(), &mut out, &options)
        .await
        .expect("run should succeed");

    let output = String::from_utf8(out).expect("valid UTF-8");
    assert_eq!(output, "temp,hostname=n1,unit=degC value=40.5 2000000000\n");
}

#[tokio::test]
async fn test_process_normalize_units_from_settings() {
    let mut config = IronmetricConfig::default();
    config.processor.normalize_units = true;
    let processor = process::build_processor(None, &config)
        .await
        .expect("should build");
    let input = r#"{"name":"mem_used","meta":{"unit":"MBytes"},"fields":{"value":10}}"#;

    let mut out = Vec::new();
    process::run(&processor, input.as_bytes(), &mut out, &json_options())
        .await
        .expect("run should succeed");

    let message: Message =
        serde_json::from_str(String::from_utf8(out).expect("utf-8").trim()).expect("message");
    assert_eq!(message.get_meta("unit"), Some("MB"));
}

#[tokio::test]
async fn test_validate_rule_file_round_trip() {
    // Given: The same YAML rules used for processing
    let dir = TempDir::new().expect("should create temp dir");
    let rules = write_file(&dir, "rules.yml", RULES_YAML);

    // When: Validating
    let report = validate::validate_rules(&rules).await;

    // Then: Every entry is counted
    assert!(report.valid, "unexpected error: {:?}", report.error);
    assert_eq!(report.total, 4);
    assert!(report.error.is_none());
}

#[tokio::test]
async fn test_validate_rejects_unknown_extension() {
    let dir = TempDir::new().expect("should create temp dir");
    let rules = write_file(&dir, "rules.toml", "drop_messages = []");

    let report = validate::validate_rules(&rules).await;

    assert!(!report.valid);
    let error = report.error.expect("error recorded");
    assert!(error.contains("unsupported file extension"), "got: {error}");
}
