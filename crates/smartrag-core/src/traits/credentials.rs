// SPDX-FileCopyrightText: 2026 SmartRAG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential source for bearer authentication.

use async_trait::async_trait;
use secrecy::SecretString;

use crate::error::SmartRagError;

/// Supplies the bearer credential attached to every chat request.
///
/// Implementations return [`SmartRagError::Auth`] when no credential is
/// available or the one they hold has expired. Re-authentication is the
/// caller's concern.
#[async_trait]
pub trait CredentialProvider: Send + Sync + 'static {
    async fn bearer_token(&self) -> Result<SecretString, SmartRagError>;
}
