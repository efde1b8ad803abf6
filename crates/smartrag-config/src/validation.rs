// SPDX-FileCopyrightText: 2026 SmartRAG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as URL schemes, retry bounds, and known log levels.

use crate::diagnostic::ConfigError;
use crate::model::SmartRagConfig;

/// Upper bound on connection retries; beyond this a stuck backend blocks a turn for minutes.
const MAX_RETRIES_LIMIT: u32 = 10;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &SmartRagConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let base_url = config.server.base_url.trim();
    if base_url.is_empty() {
        errors.push(ConfigError::Validation {
            message: "server.base_url must not be empty".to_string(),
        });
    } else if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        errors.push(ConfigError::Validation {
            message: format!("server.base_url `{base_url}` must start with http:// or https://"),
        });
    }

    if config.server.connect_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "server.connect_timeout_secs must be at least 1".to_string(),
        });
    }

    if config.server.read_timeout_secs == Some(0) {
        errors.push(ConfigError::Validation {
            message: "server.read_timeout_secs must be at least 1 when set".to_string(),
        });
    }

    if config.stream.max_retries > MAX_RETRIES_LIMIT {
        errors.push(ConfigError::Validation {
            message: format!(
                "stream.max_retries must be at most {MAX_RETRIES_LIMIT}, got {}",
                config.stream.max_retries
            ),
        });
    }

    // A zero offset would let the reply share the user message's timestamp.
    if config.stream.finished_offset_ms == 0 {
        errors.push(ConfigError::Validation {
            message: "stream.finished_offset_ms must be at least 1".to_string(),
        });
    }

    if config.client.user_role.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "client.user_role must not be empty".to_string(),
        });
    }

    if !LOG_LEVELS.contains(&config.client.log_level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "client.log_level `{}` is not one of {}",
                config.client.log_level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if let Some(token) = &config.auth.token {
        if token.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: "auth.token must not be blank when set".to_string(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_message(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    #[test]
    fn default_config_validates() {
        let config = SmartRagConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_base_url_fails_validation() {
        let mut config = SmartRagConfig::default();
        config.server.base_url = "  ".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "server.base_url must not be empty"));
    }

    #[test]
    fn base_url_without_scheme_fails_validation() {
        let mut config = SmartRagConfig::default();
        config.server.base_url = "localhost:8000".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "http:// or https://"));
    }

    #[test]
    fn zero_offset_fails_validation() {
        let mut config = SmartRagConfig::default();
        config.stream.finished_offset_ms = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "finished_offset_ms"));
    }

    #[test]
    fn excessive_retries_fail_validation() {
        let mut config = SmartRagConfig::default();
        config.stream.max_retries = 50;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "max_retries"));
    }

    #[test]
    fn unknown_log_level_fails_validation() {
        let mut config = SmartRagConfig::default();
        config.client.log_level = "verbose".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "log_level"));
    }

    #[test]
    fn collects_all_errors() {
        let mut config = SmartRagConfig::default();
        config.server.base_url = String::new();
        config.client.user_role = String::new();
        config.auth.token = Some(" ".to_string());
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn valid_custom_config_passes() {
        let mut config = SmartRagConfig::default();
        config.server.base_url = "https://rag.example.test".to_string();
        config.server.read_timeout_secs = Some(120);
        config.stream.max_retries = 0;
        config.auth.token = Some("eyJhbGciOi".to_string());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn parsed_toml_with_zero_connect_timeout_fails() {
        let toml_str = r#"
[server]
base_url = "http://localhost:8000"
connect_timeout_secs = 0
read_timeout_secs = 0
"#;
        let config: SmartRagConfig = toml::from_str(toml_str).unwrap();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "connect_timeout_secs"));
        assert!(has_message(&errors, "read_timeout_secs"));
    }

    #[test]
    fn toml_rejects_unknown_field_before_validation() {
        let toml_str = r#"
[auth]
password = "hunter2"
"#;
        assert!(toml::from_str::<SmartRagConfig>(toml_str).is_err());
    }
}
