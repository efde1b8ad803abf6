// SPDX-FileCopyrightText: 2026 SmartRAG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turn observer that records every callback for later assertions.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;

use smartrag_core::{FinishedMessage, SmartRagError, TurnObserver};

/// Captures chunks, finished messages, and error descriptions.
///
/// Errors are stored as their display strings since `SmartRagError` is not
/// `Clone`.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    chunks: Mutex<Vec<String>>,
    completed: Mutex<Vec<FinishedMessage>>,
    errors: Mutex<Vec<String>>,
    changed: Notify,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chunks(&self) -> Vec<String> {
        self.chunks.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn completed(&self) -> Vec<FinishedMessage> {
        self.completed.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Total number of callbacks received.
    pub fn callback_count(&self) -> usize {
        self.chunks().len() + self.completed().len() + self.errors().len()
    }

    /// True once `on_complete` or `on_error` has fired.
    pub fn is_settled(&self) -> bool {
        !self.completed().is_empty() || !self.errors().is_empty()
    }

    /// Waits until `on_complete` or `on_error` fires. Returns false on timeout.
    pub async fn wait_settled(&self, timeout: Duration) -> bool {
        self.wait_until(timeout, |observer| observer.is_settled()).await
    }

    /// Waits until at least `count` chunks have arrived. Returns false on timeout.
    pub async fn wait_for_chunks(&self, count: usize, timeout: Duration) -> bool {
        self.wait_until(timeout, |observer| observer.chunks().len() >= count)
            .await
    }

    async fn wait_until(&self, timeout: Duration, done: impl Fn(&Self) -> bool) -> bool {
        tokio::time::timeout(timeout, async {
            while !done(self) {
                self.changed.notified().await;
            }
        })
        .await
        .is_ok()
    }
}

impl TurnObserver for RecordingObserver {
    fn on_chunk(&self, text: &str) {
        self.chunks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(text.to_string());
        self.changed.notify_one();
    }

    fn on_complete(&self, message: FinishedMessage) {
        self.completed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message);
        self.changed.notify_one();
    }

    fn on_error(&self, error: &SmartRagError) {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(error.to_string());
        self.changed.notify_one();
    }
}
