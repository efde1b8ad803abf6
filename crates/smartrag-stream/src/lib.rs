// SPDX-FileCopyrightText: 2026 SmartRAG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Streaming chat pipeline for the SmartRAG chat client.
//!
//! The [`StreamTransport`] turns one [`ChatTurnRequest`](smartrag_core::ChatTurnRequest)
//! into an ordered sequence of stream events and a terminal outcome. The
//! [`SessionController`] owns the per-turn session state on top of it and
//! produces the final assistant message with placeholders resolved.

pub mod auth;
pub mod chat;
pub mod decode;
pub mod framing;
pub mod http;
pub mod placeholder;
pub mod session;
pub mod transport;

pub use auth::StaticCredentials;
pub use chat::ChatClient;
pub use http::HttpConnector;
pub use placeholder::resolve_placeholders;
pub use session::{SessionController, SessionSnapshot, SessionState, StreamSession, TurnId};
pub use transport::{RetryPolicy, StreamOutcome, StreamTransport};
