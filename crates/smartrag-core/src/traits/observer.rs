// SPDX-FileCopyrightText: 2026 SmartRAG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Callbacks delivered by the session controller for a single turn.

use crate::error::SmartRagError;
use crate::types::FinishedMessage;

/// Receives the outcome of a chat turn.
///
/// For one turn the controller calls `on_chunk` zero or more times and then
/// at most one of `on_complete` or `on_error`. Nothing is called after the
/// turn is stopped or superseded.
///
/// Methods run outside the controller's session lock, so an observer may read
/// snapshots or start the next turn from inside a callback.
pub trait TurnObserver: Send + Sync {
    /// A content fragment was appended to the session text.
    fn on_chunk(&self, _text: &str) {}

    /// The turn completed and placeholders were resolved.
    fn on_complete(&self, _message: FinishedMessage) {}

    /// The turn failed.
    fn on_error(&self, _error: &SmartRagError) {}
}

/// An observer that ignores every callback.
impl TurnObserver for () {}
