// SPDX-FileCopyrightText: 2026 SmartRAG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connector trait for the chat backend's HTTP surface.

use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;
use secrecy::SecretString;

use crate::error::SmartRagError;
use crate::traits::adapter::PluginAdapter;
use crate::types::ChatTurnRequest;

/// Raw response body chunks, in the order they were read from the network.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, SmartRagError>> + Send>>;

/// Opens connections to the chat backend.
///
/// A connector performs exactly one attempt per call. Retry, framing, and
/// decoding live above it in the transport.
#[async_trait]
pub trait ChatConnector: PluginAdapter {
    /// Sends the turn to the streaming endpoint and returns the body as raw chunks.
    ///
    /// Fails with [`SmartRagError::Transport`] when the connection cannot be
    /// established or the server answers with a non-success status.
    async fn open_stream(
        &self,
        request: &ChatTurnRequest,
        credential: &SecretString,
    ) -> Result<ByteStream, SmartRagError>;

    /// Sends the turn to the non-streaming endpoint and returns the reply text.
    async fn complete(
        &self,
        request: &ChatTurnRequest,
        credential: &SecretString,
    ) -> Result<String, SmartRagError>;
}
