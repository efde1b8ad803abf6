// SPDX-FileCopyrightText: 2026 SmartRAG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted chat connector for deterministic transport and session tests.
//!
//! `ScriptedConnector` implements `ChatConnector` by replaying a queue of
//! connection attempts. Each attempt either refuses, answers with an HTTP
//! status, or yields a body built from [`ScriptStep`]s.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream;
use secrecy::SecretString;
use tokio::sync::Notify;

use smartrag_core::{
    ByteStream, ChatConnector, ChatTurnRequest, HealthStatus, PluginAdapter, SmartRagError,
};

/// One step of a scripted response body.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Yield these bytes as one read.
    Chunk(Vec<u8>),
    /// Fail the read with a retryable transport error and end the body.
    Fail(String),
    /// Block until the notify fires. A notify that never fires holds the
    /// stream open forever.
    Wait(Arc<Notify>),
}

impl ScriptStep {
    pub fn chunk(bytes: impl Into<Vec<u8>>) -> Self {
        ScriptStep::Chunk(bytes.into())
    }

    pub fn fail(message: &str) -> Self {
        ScriptStep::Fail(message.to_string())
    }

    pub fn wait(notify: &Arc<Notify>) -> Self {
        ScriptStep::Wait(Arc::clone(notify))
    }

    /// A step that never completes.
    pub fn hang() -> Self {
        ScriptStep::Wait(Arc::new(Notify::new()))
    }
}

#[derive(Debug)]
enum Attempt {
    Refuse(String),
    Status { code: u16, detail: String },
    Respond(Vec<ScriptStep>),
}

/// Shared count of connection attempts, readable after the connector moves.
#[derive(Debug, Clone, Default)]
pub struct AttemptCounter(Arc<AtomicUsize>);

impl AttemptCounter {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn increment(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Shared count of response bodies that have ended or been dropped.
///
/// Once a body is closed its turn can produce no further stream events.
#[derive(Debug, Clone, Default)]
pub struct BodyTracker {
    closed: Arc<AtomicUsize>,
    notify: Arc<Notify>,
}

impl BodyTracker {
    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Waits until at least `count` bodies are closed. Returns false on timeout.
    pub async fn wait_closed(&self, count: usize, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, async {
            loop {
                let notified = self.notify.notified();
                if self.closed() >= count {
                    return;
                }
                notified.await;
            }
        })
        .await
        .is_ok()
    }
}

/// Marks its body closed when dropped.
#[derive(Debug)]
struct BodyGuard(BodyTracker);

impl Drop for BodyGuard {
    fn drop(&mut self) {
        self.0.closed.fetch_add(1, Ordering::SeqCst);
        self.0.notify.notify_waiters();
    }
}

/// A connector that replays scripted attempts.
///
/// Attempts are popped from a FIFO queue. When the queue is empty, the
/// connection is refused with a retryable transport error.
#[derive(Debug, Default)]
pub struct ScriptedConnector {
    attempts: Mutex<VecDeque<Attempt>>,
    completions: Mutex<VecDeque<Result<String, SmartRagError>>>,
    requests: Arc<Mutex<Vec<ChatTurnRequest>>>,
    counter: AttemptCounter,
    bodies: BodyTracker,
    health: Option<HealthStatus>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an attempt that yields the given body steps.
    pub fn respond(self, steps: Vec<ScriptStep>) -> Self {
        self.push(Attempt::Respond(steps))
    }

    /// Queue an attempt that fails to connect.
    pub fn refuse(self, message: &str) -> Self {
        self.push(Attempt::Refuse(message.to_string()))
    }

    /// Queue an attempt that answers with a non-success HTTP status.
    pub fn status(self, code: u16, detail: &str) -> Self {
        self.push(Attempt::Status {
            code,
            detail: detail.to_string(),
        })
    }

    /// Queue a result for the non-streaming endpoint.
    pub fn complete_with(self, result: Result<String, SmartRagError>) -> Self {
        lock(&self.completions).push_back(result);
        self
    }

    pub fn with_health(mut self, status: HealthStatus) -> Self {
        self.health = Some(status);
        self
    }

    /// Counter of attempts made on either endpoint.
    pub fn attempts_handle(&self) -> AttemptCounter {
        self.counter.clone()
    }

    /// Tracker of response bodies that have ended or been dropped.
    pub fn bodies_handle(&self) -> BodyTracker {
        self.bodies.clone()
    }

    /// Shared log of every request received.
    pub fn requests_handle(&self) -> Arc<Mutex<Vec<ChatTurnRequest>>> {
        Arc::clone(&self.requests)
    }

    fn push(self, attempt: Attempt) -> Self {
        lock(&self.attempts).push_back(attempt);
        self
    }

    fn record(&self, request: &ChatTurnRequest) {
        self.counter.increment();
        lock(&self.requests).push(request.clone());
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn transport_error(message: String) -> SmartRagError {
    SmartRagError::Transport {
        message,
        retryable: true,
        source: None,
    }
}

fn status_error(code: u16, detail: String) -> SmartRagError {
    match code {
        401 | 403 => SmartRagError::Auth {
            message: format!("server rejected credential ({code}): {detail}"),
        },
        _ => SmartRagError::Transport {
            message: format!("server returned {code}: {detail}"),
            retryable: matches!(code, 429 | 500 | 502 | 503 | 504),
            source: None,
        },
    }
}

#[async_trait]
impl PluginAdapter for ScriptedConnector {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn health_check(&self) -> Result<HealthStatus, SmartRagError> {
        Ok(self.health.clone().unwrap_or(HealthStatus::Healthy))
    }
}

#[async_trait]
impl ChatConnector for ScriptedConnector {
    async fn open_stream(
        &self,
        request: &ChatTurnRequest,
        _credential: &SecretString,
    ) -> Result<ByteStream, SmartRagError> {
        self.record(request);
        let attempt = lock(&self.attempts).pop_front();

        let steps = match attempt {
            Some(Attempt::Respond(steps)) => steps,
            Some(Attempt::Status { code, detail }) => return Err(status_error(code, detail)),
            Some(Attempt::Refuse(message)) => return Err(transport_error(message)),
            None => return Err(transport_error("connection refused".into())),
        };

        let state = (VecDeque::from(steps), BodyGuard(self.bodies.clone()));
        let body = stream::unfold(state, |(mut steps, guard)| async move {
            loop {
                match steps.pop_front()? {
                    ScriptStep::Chunk(bytes) => return Some((Ok(bytes), (steps, guard))),
                    ScriptStep::Fail(message) => {
                        steps.clear();
                        return Some((Err(transport_error(message)), (steps, guard)));
                    }
                    ScriptStep::Wait(notify) => notify.notified().await,
                }
            }
        });
        Ok(Box::pin(body))
    }

    async fn complete(
        &self,
        request: &ChatTurnRequest,
        _credential: &SecretString,
    ) -> Result<String, SmartRagError> {
        self.record(request);
        if let Some(result) = lock(&self.completions).pop_front() {
            return result;
        }
        match lock(&self.attempts).pop_front() {
            Some(Attempt::Status { code, detail }) => Err(status_error(code, detail)),
            Some(Attempt::Refuse(message)) => Err(transport_error(message)),
            Some(Attempt::Respond(_)) | None => Err(transport_error("connection refused".into())),
        }
    }
}
