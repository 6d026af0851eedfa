// SPDX-FileCopyrightText: 2026 Chatgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the chatgate configuration system.

use chatgate_config::diagnostic::{suggest_key, ConfigError};
use chatgate_config::model::{ChatgateConfig, StorageBackend};
use chatgate_config::{load_and_validate_path, load_and_validate_str, load_config_from_str};

/// Valid TOML with every section deserializes successfully.
#[test]
fn valid_toml_deserializes_into_chatgate_config() {
    let toml = r#"
[gateway]
name = "edge-1"
host = "0.0.0.0"
port = 9000
log_level = "debug"

[routing]
workflows = ["research"]
complex_combinations = [["toolA", "toolB", "toolC"]]

[dispatch]
timeout_secs = 15
fallback_to_direct = false

[chunking]
min_chars = 40
preferred_max_chars = 120
max_chars = 160

[conversation]
strict_resume = true

[storage]
backend = "sqlite"
database_path = "/tmp/chatgate-test.db"
wal_mode = false

[backends.direct]
base_url = "http://localhost:8000/v1"
model = "small"

[backends.tool]
base_url = "http://localhost:8001/v1"
model = "tools"
api_key = "sk-tool"

[metrics]
enabled = true
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.gateway.name, "edge-1");
    assert_eq!(config.gateway.port, 9000);
    assert_eq!(config.routing.workflows, vec!["research"]);
    assert_eq!(config.routing.complex_combinations.len(), 1);
    assert_eq!(config.dispatch.timeout_secs, 15);
    assert!(!config.dispatch.fallback_to_direct);
    assert_eq!(config.chunking.max_chars, 160);
    assert!(config.conversation.strict_resume);
    assert_eq!(config.storage.backend, StorageBackend::Sqlite);
    assert!(!config.storage.wal_mode);
    assert_eq!(config.backends.direct.model, "small");
    let tool = config.backends.tool.expect("tool backend configured");
    assert_eq!(tool.api_key.as_deref(), Some("sk-tool"));
    assert!(config.backends.workflow.is_none());
    assert!(config.metrics.enabled);
}

/// Missing sections fall back to defaults.
#[test]
fn missing_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML is valid");
    assert_eq!(config.gateway.host, "127.0.0.1");
    assert_eq!(config.gateway.port, 8080);
    assert_eq!(config.dispatch.timeout_secs, 60);
    assert!(config.dispatch.fallback_to_direct);
    assert_eq!(config.storage.backend, StorageBackend::Memory);
    assert!(!config.metrics.enabled);
    assert!(config.routing.heuristic_fallback);
}

/// Unknown key in a section is rejected.
#[test]
fn unknown_field_in_dispatch_produces_error() {
    let toml = r#"
[dispatch]
timeout_sec = 10
"#;
    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("timeout_sec"),
        "got: {err_str}"
    );
}

/// Unknown top-level section is rejected.
#[test]
fn deny_unknown_fields_at_top_level() {
    let toml = r#"
[telemetry]
enabled = true
"#;
    assert!(load_config_from_str(toml).is_err());
}

/// The typo diagnostic suggests the closest valid key and points at it.
#[test]
fn diagnostic_suggests_closest_key_with_span() {
    let toml = "[chunking]\nmax_char = 200\n";
    let errors = load_and_validate_str(toml).expect_err("typo should fail");
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        ConfigError::UnknownKey {
            key,
            suggestion,
            span,
            ..
        } => {
            assert_eq!(key, "max_char");
            assert!(suggestion.is_some());
            let span = span.expect("span resolved from source");
            assert_eq!(&toml[span.offset()..span.offset() + span.len()], "max_char");
        }
        other => panic!("expected UnknownKey, got {other:?}"),
    }
}

#[test]
fn suggest_key_finds_near_match() {
    let suggestion = suggest_key("strict_resum", &["strict_resume"]);
    assert_eq!(suggestion.as_deref(), Some("strict_resume"));
}

#[test]
fn suggest_key_skips_distant_typo() {
    assert!(suggest_key("zzzz", &["preferred_max_chars", "min_chars"]).is_none());
}

/// Wrong value type produces a type diagnostic.
#[test]
fn invalid_type_is_reported() {
    let toml = r#"
[gateway]
port = "eighty"
"#;
    let errors = load_and_validate_str(toml).expect_err("string port must fail");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { key, .. } if key.contains("port"))),
        "got: {errors:?}"
    );
}

/// Parsed but semantically invalid values are caught by validation.
#[test]
fn validation_rejects_inverted_chunk_window() {
    let toml = r#"
[chunking]
min_chars = 300
"#;
    let errors = load_and_validate_str(toml).expect_err("min above max must fail");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("chunking")))
    );
}

#[test]
fn load_and_validate_defaults() {
    let config: ChatgateConfig = load_and_validate_str("").expect("defaults are valid");
    assert_eq!(config.chunking.preferred_max_chars, 150);
}

/// An explicit config file path is honored.
#[test]
fn load_and_validate_from_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("chatgate.toml");
    std::fs::write(&path, "[gateway]\nport = 7070\n").expect("write config");

    let config = load_and_validate_path(&path).expect("file config is valid");
    assert_eq!(config.gateway.port, 7070);
}

#[test]
fn config_error_renders_with_miette() {
    let errors = load_and_validate_str("[gateway]\nprot = 1\n").expect_err("typo");
    let report = miette::Report::new(errors.into_iter().next().expect("one error"));
    let rendered = format!("{report:?}");
    assert!(rendered.contains("prot"), "got: {rendered}");
}
