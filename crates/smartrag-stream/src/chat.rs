// SPDX-FileCopyrightText: 2026 SmartRAG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Non-streaming chat and backend health.

use std::sync::Arc;

use smartrag_config::model::SmartRagConfig;
use smartrag_core::{
    ChatConnector, ChatTurnRequest, CredentialProvider, HealthStatus, SmartRagError,
};
use tracing::{debug, warn};

use crate::transport::{RetryPolicy, StreamTransport, validate_request};

/// Client for the one-shot chat endpoint.
///
/// Shares the credential, retry policy, and error taxonomy of the streaming
/// transport. The reply carries no placeholder table, so no substitution is
/// applied.
#[derive(Clone)]
pub struct ChatClient {
    connector: Arc<dyn ChatConnector>,
    credentials: Arc<dyn CredentialProvider>,
    policy: RetryPolicy,
}

impl ChatClient {
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

    /// Reuses the connector and credentials of an existing transport.
    pub fn from_transport(transport: &StreamTransport) -> Self {
        Self::new(
            Arc::clone(transport.connector()),
            Arc::clone(transport.credentials()),
            transport.policy(),
        )
    }

    pub fn from_config(config: &SmartRagConfig) -> Result<Self, SmartRagError> {
        Ok(Self::from_transport(&StreamTransport::from_config(config)?))
    }

    /// Sends one turn and returns the full reply.
    pub async fn ask(&self, request: &ChatTurnRequest) -> Result<String, SmartRagError> {
        validate_request(request)?;
        let credential = self.credentials.bearer_token().await?;

        for attempt in 0..=self.policy.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying chat request after transient error");
                tokio::time::sleep(self.policy.delay).await;
            }

            match self.connector.complete(request, &credential).await {
                Err(err) if err.is_retryable() && attempt < self.policy.max_retries => {
                    warn!(attempt, error = %err, "chat request failed, will retry");
                }
                Ok(reply) => {
                    debug!(attempt, chars = reply.chars().count(), "chat reply received");
                    return Ok(reply);
                }
                Err(err) => return Err(err),
            }
        }

        Err(SmartRagError::Internal(
            "retry loop exited without result".into(),
        ))
    }

    /// Queries the backend health endpoint.
    pub async fn health(&self) -> Result<HealthStatus, SmartRagError> {
        self.connector.health_check().await
    }
}
