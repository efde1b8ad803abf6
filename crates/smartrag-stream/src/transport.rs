// SPDX-FileCopyrightText: 2026 SmartRAG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stream transport: one chat turn from request to terminal outcome.
//!
//! Opens the connection through a [`ChatConnector`], frames the body into
//! lines, decodes events, and delivers non-terminal events in arrival order.
//! Connection-level failures are retried while nothing has reached the caller.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use secrecy::SecretString;
use smartrag_config::model::{SmartRagConfig, StreamConfig};
use smartrag_core::{ChatConnector, ChatTurnRequest, CredentialProvider, SmartRagError, StreamEvent};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::auth::StaticCredentials;
use crate::decode::decode_line;
use crate::framing::LineFramer;
use crate::http::HttpConnector;

/// Fixed-delay retry policy for connection-level failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts is `max_retries + 1`.
    pub max_retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &StreamConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            delay: config.retry_delay(),
        }
    }
}

/// How a turn ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// A `done` event arrived, or the body ended cleanly.
    Completed,
    /// The cancellation token fired. Callers treat this as silent.
    Cancelled,
}

/// Runs chat turns against the streaming endpoint.
#[derive(Clone)]
pub struct StreamTransport {
    connector: Arc<dyn ChatConnector>,
    credentials: Arc<dyn CredentialProvider>,
    policy: RetryPolicy,
}

impl std::fmt::Debug for StreamTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamTransport")
            .field("connector", &self.connector.name())
            .field("policy", &self.policy)
            .finish()
    }
}

impl StreamTransport {
    pub fn new(
        connector: Arc<dyn ChatConnector>,
        credentials: Arc<dyn CredentialProvider>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            connector,
            credentials,
            policy,
        }
    }

    /// Builds the HTTP connector and static credentials from configuration.
    pub fn from_config(config: &SmartRagConfig) -> Result<Self, SmartRagError> {
        let connector = HttpConnector::from_config(&config.server)?;
        debug!(base_url = connector.base_url(), "chat transport configured");
        Ok(Self::new(
            Arc::new(connector),
            Arc::new(StaticCredentials::from_config(&config.auth)),
            RetryPolicy::from_config(&config.stream),
        ))
    }

    pub fn connector(&self) -> &Arc<dyn ChatConnector> {
        &self.connector
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialProvider> {
        &self.credentials
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Streams one turn, passing `Content` and `UrlMapping` events to `on_event`.
    ///
    /// Returns `Ok(Completed)` on `done` or a clean end of body, `Ok(Cancelled)`
    /// once `cancel` fires, and `Err` for everything else. `Done` and `Error`
    /// events are never passed to `on_event`.
    pub async fn open<F>(
        &self,
        request: &ChatTurnRequest,
        cancel: &CancellationToken,
        mut on_event: F,
    ) -> Result<StreamOutcome, SmartRagError>
    where
        F: FnMut(StreamEvent) + Send,
    {
        validate_request(request)?;
        if cancel.is_cancelled() {
            return Ok(StreamOutcome::Cancelled);
        }

        let credential = self.credentials.bearer_token().await?;
        let mut delivered = 0usize;

        for attempt in 0..=self.policy.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying chat stream after transient error");
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Ok(StreamOutcome::Cancelled),
                    _ = tokio::time::sleep(self.policy.delay) => {}
                }
            }

            let result = self
                .attempt(request, &credential, cancel, &mut on_event, &mut delivered)
                .await;

            match result {
                Err(err)
                    if err.is_retryable() && delivered == 0 && attempt < self.policy.max_retries =>
                {
                    warn!(attempt, error = %err, "chat stream attempt failed, will retry");
                }
                other => return other,
            }
        }

        Err(SmartRagError::Internal(
            "retry loop exited without result".into(),
        ))
    }

    async fn attempt<F>(
        &self,
        request: &ChatTurnRequest,
        credential: &SecretString,
        cancel: &CancellationToken,
        on_event: &mut F,
        delivered: &mut usize,
    ) -> Result<StreamOutcome, SmartRagError>
    where
        F: FnMut(StreamEvent) + Send,
    {
        let mut body = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(StreamOutcome::Cancelled),
            opened = self.connector.open_stream(request, credential) => opened?,
        };
        debug!(connector = self.connector.name(), "chat stream opened");

        let mut framer = LineFramer::new();
        loop {
            let chunk = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(StreamOutcome::Cancelled),
                chunk = body.next() => chunk,
            };
            let Some(chunk) = chunk else {
                break;
            };

            for line in framer.push(&chunk?) {
                if let Some(outcome) = dispatch(&line, cancel, on_event, delivered)? {
                    return Ok(outcome);
                }
            }
        }

        if let Some(line) = framer.finish() {
            if let Some(outcome) = dispatch(&line, cancel, on_event, delivered)? {
                return Ok(outcome);
            }
        }

        debug!(delivered = *delivered, "chat stream ended without done event");
        Ok(StreamOutcome::Completed)
    }
}

pub(crate) fn validate_request(request: &ChatTurnRequest) -> Result<(), SmartRagError> {
    if request.message.trim().is_empty() {
        return Err(SmartRagError::InvalidRequest(
            "message must not be empty".into(),
        ));
    }
    Ok(())
}

/// Decodes one line and routes the event. `Some` ends the attempt.
fn dispatch<F>(
    line: &str,
    cancel: &CancellationToken,
    on_event: &mut F,
    delivered: &mut usize,
) -> Result<Option<StreamOutcome>, SmartRagError>
where
    F: FnMut(StreamEvent),
{
    if cancel.is_cancelled() {
        return Ok(Some(StreamOutcome::Cancelled));
    }

    match decode_line(line) {
        Ok(None) => Ok(None),
        Ok(Some(event)) if !event.is_terminal() => {
            *delivered += 1;
            on_event(event);
            Ok(None)
        }
        Ok(Some(StreamEvent::Error { message })) => Err(SmartRagError::Stream { message }),
        Ok(Some(_)) => {
            debug!(delivered = *delivered, "chat stream done");
            Ok(Some(StreamOutcome::Completed))
        }
        Err(err) => {
            warn!(error = %err, "skipping malformed stream line");
            Ok(None)
        }
    }
}
