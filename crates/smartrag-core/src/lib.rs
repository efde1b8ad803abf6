// SPDX-FileCopyrightText: 2026 SmartRAG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the SmartRAG chat client.
//!
//! This crate provides the error type, the request/event/message types that
//! travel through the streaming pipeline, and the traits at its seams:
//! connectors, credential sources, and turn observers.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::SmartRagError;
pub use types::{
    ChatTurnRequest, ConversationId, FinishedMessage, HealthStatus, HistoryTurn, MessageId, Role,
    StreamEvent, UrlMapping,
};

pub use traits::{ByteStream, ChatConnector, CredentialProvider, PluginAdapter, TurnObserver};
