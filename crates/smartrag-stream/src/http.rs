// SPDX-FileCopyrightText: 2026 SmartRAG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP connector for the SmartRAG chat API.
//!
//! Provides [`HttpConnector`], which builds requests, attaches the bearer
//! credential, and classifies failed responses. Each call is one attempt;
//! retries belong to the transport.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{ACCEPT, HeaderValue};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use smartrag_config::model::ServerConfig;
use smartrag_core::{
    ByteStream, ChatConnector, ChatTurnRequest, HealthStatus, PluginAdapter, SmartRagError,
};
use tracing::debug;

/// Streaming chat endpoint, relative to the base URL.
pub const STREAM_PATH: &str = "/api/v1/chat/stream";
/// Non-streaming chat endpoint.
pub const SIMPLE_MESSAGE_PATH: &str = "/api/v1/chat/simple-message";
/// Chat service health endpoint.
pub const HEALTH_PATH: &str = "/api/v1/chat/health";

/// FastAPI error body: `detail` is a string or a list of validation errors.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    detail: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct SimpleMessageResponse {
    response: String,
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
}

/// `reqwest`-backed connector for the chat backend.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    client: reqwest::Client,
    base_url: String,
}

impl HttpConnector {
    /// Creates a connector for the backend at `base_url`.
    ///
    /// `read_timeout` bounds the gap between body reads, not the whole
    /// stream, so long answers are not cut off.
    pub fn new(
        base_url: impl Into<String>,
        connect_timeout: Duration,
        read_timeout: Option<Duration>,
    ) -> Result<Self, SmartRagError> {
        let mut builder = reqwest::Client::builder().connect_timeout(connect_timeout);
        if let Some(timeout) = read_timeout {
            builder = builder.read_timeout(timeout);
        }

        let client = builder.build().map_err(|e| SmartRagError::Transport {
            message: format!("failed to build HTTP client: {e}"),
            retryable: false,
            source: Some(Box::new(e)),
        })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ServerConfig) -> Result<Self, SmartRagError> {
        Self::new(
            config.base_url.clone(),
            config.connect_timeout(),
            config.read_timeout(),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// POSTs the turn and returns the response if its status is a success.
    async fn post(
        &self,
        path: &str,
        request: &ChatTurnRequest,
        credential: &SecretString,
        accept: &'static str,
    ) -> Result<reqwest::Response, SmartRagError> {
        let response = self
            .client
            .post(self.url(path))
            .bearer_auth(credential.expose_secret())
            .header(ACCEPT, HeaderValue::from_static(accept))
            .json(request)
            .send()
            .await
            .map_err(|e| SmartRagError::Transport {
                message: format!("HTTP request failed: {e}"),
                retryable: true,
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        debug!(status = %status, path, "chat response received");

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, &body))
    }
}

#[async_trait]
impl PluginAdapter for HttpConnector {
    fn name(&self) -> &str {
        "http"
    }

    async fn health_check(&self) -> Result<HealthStatus, SmartRagError> {
        let response = match self.client.get(self.url(HEALTH_PATH)).send().await {
            Ok(response) => response,
            Err(e) => return Ok(HealthStatus::Unhealthy(format!("unreachable: {e}"))),
        };

        let status = response.status();
        if !status.is_success() {
            return Ok(HealthStatus::Unhealthy(format!("health endpoint returned {status}")));
        }

        let body: HealthResponse = response.json().await.map_err(|e| SmartRagError::Protocol {
            message: format!("failed to parse health response: {e}"),
            source: Some(Box::new(e)),
        })?;

        Ok(if body.status == "healthy" {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded(body.status)
        })
    }
}

#[async_trait]
impl ChatConnector for HttpConnector {
    async fn open_stream(
        &self,
        request: &ChatTurnRequest,
        credential: &SecretString,
    ) -> Result<ByteStream, SmartRagError> {
        let response = self
            .post(STREAM_PATH, request, credential, "text/event-stream")
            .await?;

        let body = response.bytes_stream().map(|chunk| {
            chunk
                .map(|bytes| bytes.to_vec())
                .map_err(|e| SmartRagError::Transport {
                    message: format!("failed to read stream body: {e}"),
                    retryable: true,
                    source: Some(Box::new(e)),
                })
        });
        Ok(Box::pin(body))
    }

    async fn complete(
        &self,
        request: &ChatTurnRequest,
        credential: &SecretString,
    ) -> Result<String, SmartRagError> {
        let response = self
            .post(SIMPLE_MESSAGE_PATH, request, credential, "application/json")
            .await?;

        let body = response.text().await.map_err(|e| SmartRagError::Transport {
            message: format!("failed to read response body: {e}"),
            retryable: true,
            source: Some(Box::new(e)),
        })?;
        let parsed: SimpleMessageResponse =
            serde_json::from_str(&body).map_err(|e| SmartRagError::Protocol {
                message: format!("failed to parse chat response: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(parsed.response)
    }
}

/// Maps a non-success response to the error taxonomy.
fn status_error(status: StatusCode, body: &str) -> SmartRagError {
    let detail = match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(ApiErrorBody {
            detail: serde_json::Value::String(detail),
        }) => detail,
        Ok(ApiErrorBody { detail }) => detail.to_string(),
        Err(_) => body.to_string(),
    };

    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        return SmartRagError::Auth {
            message: format!("server rejected credential ({status}): {detail}"),
        };
    }

    SmartRagError::Transport {
        message: format!("server returned {status}: {detail}"),
        retryable: is_transient_status(status),
        source: None,
    }
}

/// Returns true for HTTP status codes that indicate transient errors worth retrying.
fn is_transient_status(status: StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503 | 504)
}
