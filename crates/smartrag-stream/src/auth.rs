// SPDX-FileCopyrightText: 2026 SmartRAG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bearer credential held in memory, as issued by the backend's login flow.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use smartrag_config::model::AuthConfig;
use smartrag_core::{CredentialProvider, SmartRagError};

/// A fixed access token with an optional expiry.
///
/// Logging in and refreshing happen elsewhere; this only reports whether the
/// token it was given is still usable.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    token: Option<SecretString>,
    expires_at: Option<DateTime<Utc>>,
}

impl StaticCredentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(SecretString::from(token.into())),
            expires_at: None,
        }
    }

    /// Credentials with no token; every request fails with an auth error.
    pub fn missing() -> Self {
        Self::default()
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            token: config.token.clone().map(SecretString::from),
            expires_at: config.expires_at,
        }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn bearer_token(&self) -> Result<SecretString, SmartRagError> {
        let token = self.token.as_ref().ok_or_else(|| SmartRagError::Auth {
            message: "no access token configured; set auth.token or SMARTRAG_AUTH_TOKEN".into(),
        })?;

        if let Some(expires_at) = self.expires_at {
            if expires_at <= Utc::now() {
                return Err(SmartRagError::Auth {
                    message: format!("access token expired at {}", expires_at.to_rfc3339()),
                });
            }
        }

        Ok(token.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use secrecy::ExposeSecret;

    #[tokio::test]
    async fn returns_configured_token() {
        let creds = StaticCredentials::new("tok").with_expiry(Utc::now() + TimeDelta::hours(1));
        let token = creds.bearer_token().await.unwrap();
        assert_eq!(token.expose_secret(), "tok");
    }

    #[tokio::test]
    async fn missing_token_is_auth_error() {
        let err = StaticCredentials::missing().bearer_token().await.unwrap_err();
        assert!(matches!(err, SmartRagError::Auth { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn expired_token_is_auth_error() {
        let creds = StaticCredentials::new("tok").with_expiry(Utc::now() - TimeDelta::seconds(1));
        let err = creds.bearer_token().await.unwrap_err();
        assert!(err.to_string().contains("expired"), "got {err}");
    }

    #[tokio::test]
    async fn from_config_reads_token_and_expiry() {
        let config = AuthConfig {
            token: Some("cfg".into()),
            expires_at: None,
        };
        let token = StaticCredentials::from_config(&config)
            .bearer_token()
            .await
            .unwrap();
        assert_eq!(token.expose_secret(), "cfg");
    }
}
