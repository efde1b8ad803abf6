// SPDX-FileCopyrightText: 2026 SmartRAG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the SmartRAG configuration system.

use std::time::Duration;

use smartrag_config::diagnostic::ConfigError;
use smartrag_config::model::SmartRagConfig;
use smartrag_config::{load_and_validate_str, load_config_from_path, load_config_from_str};

/// Valid TOML with all known fields deserializes successfully.
#[test]
fn valid_toml_deserializes_into_smartrag_config() {
    let toml = r#"
[client]
log_level = "debug"
user_role = "user"
user_id = 42
knowledge_name = "handbook"

[server]
base_url = "https://rag.example.test"
connect_timeout_secs = 5
read_timeout_secs = 90

[stream]
max_retries = 3
retry_delay_ms = 250
finished_offset_ms = 500

[auth]
token = "eyJhbGciOi"
expires_at = "2030-01-01T00:00:00Z"
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.client.log_level, "debug");
    assert_eq!(config.client.user_role, "user");
    assert_eq!(config.client.user_id, Some(42));
    assert_eq!(config.client.knowledge_name.as_deref(), Some("handbook"));
    assert_eq!(config.server.base_url, "https://rag.example.test");
    assert_eq!(config.server.connect_timeout(), Duration::from_secs(5));
    assert_eq!(config.server.read_timeout(), Some(Duration::from_secs(90)));
    assert_eq!(config.stream.max_retries, 3);
    assert_eq!(config.stream.retry_delay(), Duration::from_millis(250));
    assert_eq!(config.stream.finished_offset(), Duration::from_millis(500));
    assert_eq!(config.auth.token.as_deref(), Some("eyJhbGciOi"));
    assert!(config.auth.expires_at.is_some());
}

/// Empty TOML falls back to compiled defaults.
#[test]
fn empty_toml_uses_defaults() {
    let config = load_config_from_str("").expect("empty TOML should deserialize");
    assert_eq!(config.server.base_url, "http://127.0.0.1:8000");
    assert_eq!(config.stream.max_retries, 2);
    assert_eq!(config.stream.retry_delay_ms, 1000);
    assert_eq!(config.stream.finished_offset_ms, 1000);
    assert_eq!(config.client.user_role, "admin");
    assert!(config.auth.token.is_none());
}

/// Unknown field in [stream] produces an UnknownKey diagnostic with a suggestion.
#[test]
fn unknown_field_in_stream_suggests_correction() {
    let toml = r#"
[stream]
max_retires = 3
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject unknown field");
    let unknown = errors
        .iter()
        .find_map(|e| match e {
            ConfigError::UnknownKey {
                key, suggestion, ..
            } => Some((key.clone(), suggestion.clone())),
            _ => None,
        })
        .expect("expected an UnknownKey error");
    assert_eq!(unknown.0, "max_retires");
    assert_eq!(unknown.1.as_deref(), Some("max_retries"));
}

/// Unknown top-level section is rejected.
#[test]
fn unknown_section_is_rejected() {
    let toml = r#"
[telegram]
bot_token = "abc"
"#;
    assert!(load_config_from_str(toml).is_err());
}

/// Wrong value type produces an InvalidType diagnostic naming the key.
#[test]
fn wrong_type_produces_invalid_type_error() {
    let toml = r#"
[stream]
max_retries = "many"
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject wrong type");
    assert!(errors.iter().any(
        |e| matches!(e, ConfigError::InvalidType { key, .. } if key.contains("max_retries"))
    ));
}

/// Semantic validation runs after a successful parse.
#[test]
fn validation_errors_are_reported_after_parse() {
    let toml = r#"
[server]
base_url = "ftp://rag.example.test"
"#;

    let errors = load_and_validate_str(toml).expect_err("should fail validation");
    assert!(errors
        .iter()
        .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("base_url"))));
}

/// Environment variables override file values with section mapping.
#[test]
fn env_vars_override_file_values() {
    figment::Jail::expect_with(|jail| {
        jail.create_file(
            "custom.toml",
            r#"
[stream]
max_retries = 1

[server]
base_url = "http://file.example.test"
"#,
        )?;
        jail.set_env("SMARTRAG_STREAM_MAX_RETRIES", "4");
        jail.set_env("SMARTRAG_AUTH_TOKEN", "from-env");

        let config = load_config_from_path(std::path::Path::new("custom.toml"))
            .expect("config should load");
        assert_eq!(config.stream.max_retries, 4);
        assert_eq!(config.auth.token.as_deref(), Some("from-env"));
        assert_eq!(config.server.base_url, "http://file.example.test");
        Ok(())
    });
}

/// Defaults round-trip through serialization, which figment relies on.
#[test]
fn default_config_serializes() {
    let config = SmartRagConfig::default();
    let json = serde_json::to_value(&config).expect("should serialize");
    assert_eq!(json["stream"]["max_retries"], 2);
    assert_eq!(json["server"]["base_url"], "http://127.0.0.1:8000");
}

/// An explicit config file is loaded and its typos point into the file.
#[test]
fn explicit_path_errors_carry_file_span() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("smartrag.toml");
    std::fs::write(&path, "[server]\nbase_ur = \"http://x\"\n").unwrap();

    let errors = smartrag_config::load_and_validate_path(&path).expect_err("typo should fail");
    match &errors[0] {
        ConfigError::UnknownKey {
            key, suggestion, ..
        } => {
            assert_eq!(key, "base_ur");
            assert_eq!(suggestion.as_deref(), Some("base_url"));
        }
        other => panic!("expected UnknownKey, got {other:?}"),
    }
}

/// A valid explicit file loads and validates.
#[test]
fn explicit_path_loads_valid_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("custom.toml");
    std::fs::write(&path, "[stream]\nfinished_offset_ms = 250\n").unwrap();

    let config = smartrag_config::load_and_validate_path(&path).expect("valid file");
    assert_eq!(config.stream.finished_offset(), Duration::from_millis(250));
}

/// A mistyped `--config` path is an error, not a silent fall back to defaults.
#[test]
fn explicit_path_must_exist() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("typo.toml");

    let errors = smartrag_config::load_and_validate_path(&path).expect_err("missing file");
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        ConfigError::FileNotFound { path: reported } => {
            assert!(reported.ends_with("typo.toml"));
        }
        other => panic!("expected FileNotFound, got {other:?}"),
    }

    let err = load_config_from_path(&path).expect_err("loader rejects missing file");
    assert!(err.to_string().contains("does not exist"));
}
