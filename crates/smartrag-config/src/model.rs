// SPDX-FileCopyrightText: 2026 SmartRAG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the SmartRAG chat client.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Top-level SmartRAG client configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SmartRagConfig {
    /// Requester identity and logging settings.
    #[serde(default)]
    pub client: ClientConfig,

    /// Chat backend location and HTTP timeouts.
    #[serde(default)]
    pub server: ServerConfig,

    /// Streaming retry and message timestamp settings.
    #[serde(default)]
    pub stream: StreamConfig,

    /// Bearer credential settings.
    #[serde(default)]
    pub auth: AuthConfig,
}

/// Requester identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Role sent as `user_role` with every turn.
    #[serde(default = "default_user_role")]
    pub user_role: String,

    /// Numeric user id sent as `user_id`. `None` lets the backend use the request history.
    #[serde(default)]
    pub user_id: Option<i64>,

    /// Knowledge source used when a turn enables retrieval without naming one.
    #[serde(default)]
    pub knowledge_name: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            user_role: default_user_role(),
            user_id: None,
            knowledge_name: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_user_role() -> String {
    "admin".to_string()
}

/// Chat backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Base URL of the backend, without the `/api/v1/chat` suffix.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// TCP connect timeout in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Idle read timeout in seconds. `None` leaves stuck streams to the server.
    #[serde(default)]
    pub read_timeout_secs: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            connect_timeout_secs: default_connect_timeout_secs(),
            read_timeout_secs: None,
        }
    }
}

impl ServerConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_secs.map(Duration::from_secs)
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

/// Streaming transport and session configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StreamConfig {
    /// Retries after a connection-level failure, on top of the first attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Fixed delay between connection attempts, in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// How far after the user message a finished reply is timestamped, in milliseconds.
    #[serde(default = "default_finished_offset_ms")]
    pub finished_offset_ms: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            finished_offset_ms: default_finished_offset_ms(),
        }
    }
}

impl StreamConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn finished_offset(&self) -> Duration {
        Duration::from_millis(self.finished_offset_ms)
    }
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_finished_offset_ms() -> u64 {
    1000
}

/// Bearer credential configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// Access token issued by the backend's login endpoint. `None` requires
    /// the `SMARTRAG_AUTH_TOKEN` environment variable.
    #[serde(default)]
    pub token: Option<String>,

    /// Expiry of `token` (RFC 3339). Requests fail fast once it has passed.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}
