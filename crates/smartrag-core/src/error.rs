// SPDX-FileCopyrightText: 2026 SmartRAG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the SmartRAG chat client.

use thiserror::Error;

/// The primary error type used across the streaming pipeline and its adapters.
#[derive(Debug, Error)]
pub enum SmartRagError {
    /// Configuration errors (invalid TOML, missing required fields, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Missing, expired, or rejected bearer credential. Never retried.
    #[error("authentication error: {message}")]
    Auth { message: String },

    /// Network or connection failure before the stream produced anything usable.
    ///
    /// `retryable` is false for HTTP statuses that will not change on a retry.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        retryable: bool,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A malformed event line. Logged and skipped by the transport.
    #[error("protocol error: {message}")]
    Protocol {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The server terminated the stream with an explicit `error` event.
    #[error("stream error: {message}")]
    Stream { message: String },

    /// The request was rejected before any connection was opened.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SmartRagError {
    /// Returns true when the transport retry policy may try the connection again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SmartRagError::Transport { retryable: true, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_retryable_transport_errors_retry() {
        let transient = SmartRagError::Transport {
            message: "connection refused".into(),
            retryable: true,
            source: None,
        };
        let not_found = SmartRagError::Transport {
            message: "server returned 404".into(),
            retryable: false,
            source: None,
        };
        assert!(transient.is_retryable());
        assert!(!not_found.is_retryable());
        assert!(!SmartRagError::Auth { message: "expired".into() }.is_retryable());
        assert!(!SmartRagError::Stream { message: "boom".into() }.is_retryable());
    }

    #[test]
    fn stream_error_displays_server_message() {
        let err = SmartRagError::Stream {
            message: "upstream failure".into(),
        };
        assert_eq!(err.to_string(), "stream error: upstream failure");
    }
}
