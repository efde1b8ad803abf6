// SPDX-FileCopyrightText: 2026 SmartRAG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Streaming session controller.
//!
//! Owns the one [`StreamSession`] for a conversation view, runs each turn as a
//! spawned task over the [`StreamTransport`], and reports to a
//! [`TurnObserver`]. Every turn gets a generation number; anything arriving
//! from a generation that is no longer active is dropped under the lock.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use smartrag_config::model::SmartRagConfig;
use smartrag_core::{
    ChatTurnRequest, FinishedMessage, MessageId, Role, SmartRagError, StreamEvent, TurnObserver,
    UrlMapping,
};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::placeholder::resolve_placeholders;
use crate::transport::{StreamOutcome, StreamTransport};

/// Identifies one turn started by [`SessionController::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TurnId(pub u64);

impl std::fmt::Display for TurnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "turn-{}", self.0)
    }
}

/// Whether a turn is currently running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No turn in flight.
    Idle,
    /// A turn is streaming.
    Streaming,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Streaming => write!(f, "streaming"),
        }
    }
}

/// Per-turn state owned by the controller.
#[derive(Debug, Clone, Default)]
pub struct StreamSession {
    /// Content received so far. Only grows while the turn runs.
    pub accumulated_text: String,
    /// Latest placeholder table; replaced wholesale by each mapping event.
    pub url_mapping: UrlMapping,
    pub in_flight: bool,
    /// Error of the last failed turn, kept until `reset` or the next `start`.
    pub last_error: Option<Arc<SmartRagError>>,
}

/// Read-only copy of the session handed to callers and subscribers.
pub type SessionSnapshot = StreamSession;

struct ActiveTurn {
    id: TurnId,
    cancel: CancellationToken,
}

struct Inner {
    session: StreamSession,
    generation: u64,
    active: Option<ActiveTurn>,
}

impl Inner {
    fn is_active(&self, id: TurnId) -> bool {
        self.active.as_ref().is_some_and(|active| active.id == id)
    }
}

/// State shared between the controller and its turn tasks.
///
/// `inner` guards the session and is never held while an observer runs.
/// `delivery` is held from the generation check through the callback, so a
/// caller that bumps the generation and then passes through `delivery` knows
/// no callback of the old turn is running or will run.
struct Shared {
    inner: Mutex<Inner>,
    delivery: Mutex<()>,
    delivering_on: Mutex<Option<ThreadId>>,
    updates: watch::Sender<SessionSnapshot>,
}

/// Held while a callback may run. Re-entrant per thread, so an observer may
/// call `start` or `stop` on its own controller.
struct DeliveryGuard<'a> {
    shared: &'a Shared,
    lock: Option<MutexGuard<'a, ()>>,
}

impl Drop for DeliveryGuard<'_> {
    fn drop(&mut self) {
        if self.lock.is_some() {
            *relock(&self.shared.delivering_on) = None;
        }
    }
}

enum Outcome {
    Complete(FinishedMessage),
    Failed(Arc<SmartRagError>),
}

fn relock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        relock(&self.inner)
    }

    fn publish(&self, inner: &Inner) {
        self.updates.send_replace(inner.session.clone());
    }

    fn begin_delivery(&self) -> DeliveryGuard<'_> {
        let current = thread::current().id();
        if *relock(&self.delivering_on) == Some(current) {
            return DeliveryGuard {
                shared: self,
                lock: None,
            };
        }

        let lock = relock(&self.delivery);
        *relock(&self.delivering_on) = Some(current);
        DeliveryGuard {
            shared: self,
            lock: Some(lock),
        }
    }

    /// Waits until no callback is running on another thread.
    fn quiesce(&self) {
        drop(self.begin_delivery());
    }

    fn apply_event(&self, id: TurnId, event: StreamEvent, observer: &dyn TurnObserver) {
        let _delivery = self.begin_delivery();
        let chunk = {
            let mut inner = self.lock();
            if !inner.is_active(id) {
                return;
            }

            let chunk = match event {
                StreamEvent::Content { text } => {
                    inner.session.accumulated_text.push_str(&text);
                    Some(text)
                }
                StreamEvent::UrlMapping { table } => {
                    debug!(turn = %id, entries = table.len(), "url mapping replaced");
                    inner.session.url_mapping = table;
                    None
                }
                StreamEvent::Done | StreamEvent::Error { .. } => return,
            };
            self.publish(&inner);
            chunk
        };

        if let Some(text) = chunk {
            observer.on_chunk(&text);
        }
    }

    fn finish(
        &self,
        id: TurnId,
        result: Result<StreamOutcome, SmartRagError>,
        sent_at: DateTime<Utc>,
        offset: Duration,
        observer: &dyn TurnObserver,
    ) {
        let _delivery = self.begin_delivery();
        let outcome = {
            let mut inner = self.lock();
            if !inner.is_active(id) {
                debug!(turn = %id, "discarding outcome of inactive turn");
                return;
            }
            inner.active = None;

            match result {
                Ok(StreamOutcome::Completed) => {
                    let session = std::mem::take(&mut inner.session);
                    let message = finished_message(&session, sent_at, offset);
                    self.publish(&inner);
                    info!(turn = %id, message_id = %message.id.0, "chat turn completed");
                    Outcome::Complete(message)
                }
                Ok(StreamOutcome::Cancelled) => {
                    inner.session.in_flight = false;
                    self.publish(&inner);
                    debug!(turn = %id, "chat turn cancelled");
                    return;
                }
                Err(err) => {
                    warn!(turn = %id, error = %err, "chat turn failed");
                    let err = Arc::new(err);
                    inner.session = StreamSession {
                        last_error: Some(Arc::clone(&err)),
                        ..StreamSession::default()
                    };
                    self.publish(&inner);
                    Outcome::Failed(err)
                }
            }
        };

        match outcome {
            Outcome::Complete(message) => observer.on_complete(message),
            Outcome::Failed(err) => observer.on_error(&err),
        }
    }
}

/// Builds the assistant message for a completed turn.
///
/// The timestamp is strictly later than `sent_at` even when the local clock
/// lags behind it.
fn finished_message(
    session: &StreamSession,
    sent_at: DateTime<Utc>,
    offset: Duration,
) -> FinishedMessage {
    let min_offset = TimeDelta::milliseconds(1);
    let offset = TimeDelta::from_std(offset)
        .unwrap_or(min_offset)
        .max(min_offset);

    FinishedMessage {
        id: MessageId(Uuid::new_v4().to_string()),
        role: Role::Model,
        text: resolve_placeholders(&session.accumulated_text, &session.url_mapping),
        timestamp: Utc::now().max(sent_at) + offset,
    }
}

/// Drives chat turns for one conversation view.
///
/// At most one turn is active. Starting a new turn cancels the previous one,
/// and after [`stop`](Self::stop) or a superseding [`start`](Self::start)
/// returns, the old turn's observer receives nothing further.
pub struct SessionController {
    shared: Arc<Shared>,
    transport: StreamTransport,
    finished_offset: Duration,
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("state", &self.state())
            .field("transport", &self.transport)
            .field("finished_offset", &self.finished_offset)
            .finish()
    }
}

impl SessionController {
    pub fn new(transport: StreamTransport, finished_offset: Duration) -> Self {
        let (updates, _) = watch::channel(SessionSnapshot::default());
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    session: StreamSession::default(),
                    generation: 0,
                    active: None,
                }),
                delivery: Mutex::new(()),
                delivering_on: Mutex::new(None),
                updates,
            }),
            transport,
            finished_offset,
        }
    }

    pub fn from_config(config: &SmartRagConfig) -> Result<Self, SmartRagError> {
        Ok(Self::new(
            StreamTransport::from_config(config)?,
            config.stream.finished_offset(),
        ))
    }

    /// Starts a turn, cancelling any turn already in flight.
    ///
    /// Never fails directly; every failure reaches `observer.on_error`. Must
    /// be called from within a tokio runtime, otherwise the turn fails with
    /// an internal error.
    pub fn start(&self, request: ChatTurnRequest, observer: Arc<dyn TurnObserver>) -> TurnId {
        let (id, cancel) = {
            let mut inner = self.shared.lock();
            if let Some(previous) = inner.active.take() {
                previous.cancel.cancel();
                debug!(turn = %previous.id, "superseding active turn");
            }

            inner.generation += 1;
            let id = TurnId(inner.generation);
            let cancel = CancellationToken::new();
            inner.active = Some(ActiveTurn {
                id,
                cancel: cancel.clone(),
            });
            inner.session = StreamSession {
                in_flight: true,
                ..StreamSession::default()
            };
            self.shared.publish(&inner);
            (id, cancel)
        };
        self.shared.quiesce();

        let sent_at = request.sent_at;
        let offset = self.finished_offset;

        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                let err = SmartRagError::Internal(format!("no tokio runtime to run turn: {e}"));
                self.shared
                    .finish(id, Err(err), sent_at, offset, observer.as_ref());
                return id;
            }
        };

        info!(turn = %id, history = request.history.len(), "chat turn started");
        let shared = Arc::clone(&self.shared);
        let transport = self.transport.clone();
        handle.spawn(async move {
            let events = Arc::clone(&shared);
            let sink = Arc::clone(&observer);
            let result = transport
                .open(&request, &cancel, move |event| {
                    events.apply_event(id, event, sink.as_ref())
                })
                .await;
            shared.finish(id, result, sent_at, offset, observer.as_ref());
        });

        id
    }

    /// Cancels the active turn without any further callbacks.
    pub fn stop(&self) {
        {
            let mut inner = self.shared.lock();
            if let Some(active) = inner.active.take() {
                active.cancel.cancel();
                info!(turn = %active.id, "chat turn stopped");
            }
            inner.session.in_flight = false;
            self.shared.publish(&inner);
        }
        self.shared.quiesce();
    }

    /// Clears text, mapping, and the last error. Leaves the active turn running.
    pub fn reset(&self) {
        let mut inner = self.shared.lock();
        inner.session.accumulated_text.clear();
        inner.session.url_mapping.clear();
        inner.session.last_error = None;
        self.shared.publish(&inner);
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.shared.lock().session.clone()
    }

    /// Receives a snapshot after every change.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.shared.updates.subscribe()
    }

    pub fn state(&self) -> SessionState {
        if self.shared.lock().active.is_some() {
            SessionState::Streaming
        } else {
            SessionState::Idle
        }
    }

    pub fn active_turn(&self) -> Option<TurnId> {
        self.shared.lock().active.as_ref().map(|active| active.id)
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        let active = self.shared.lock().active.take();
        if let Some(active) = active {
            active.cancel.cancel();
            self.shared.quiesce();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticCredentials;
    use crate::transport::RetryPolicy;
    use smartrag_test_utils::{
        RecordingObserver, ScriptStep, ScriptedConnector, content, done, sse_line, url_mapping,
    };

    const WAIT: Duration = Duration::from_secs(5);

    fn controller(connector: ScriptedConnector) -> SessionController {
        let transport = StreamTransport::new(
            Arc::new(connector),
            Arc::new(StaticCredentials::new("tok")),
            RetryPolicy {
                max_retries: 0,
                delay: Duration::ZERO,
            },
        );
        SessionController::new(transport, Duration::from_millis(1000))
    }

    #[test]
    fn session_state_display() {
        assert_eq!(SessionState::Idle.to_string(), "idle");
        assert_eq!(SessionState::Streaming.to_string(), "streaming");
        assert_eq!(TurnId(3).to_string(), "turn-3");
    }

    #[test]
    fn finished_message_resolves_placeholders() {
        let session = StreamSession {
            accumulated_text: "see __U0__".into(),
            url_mapping: [("__U0__".to_string(), "https://x.test".to_string())].into(),
            in_flight: true,
            last_error: None,
        };
        let message = finished_message(&session, Utc::now(), Duration::from_millis(1000));
        assert_eq!(message.text, "see https://x.test");
        assert_eq!(message.role, Role::Model);
        assert!(Uuid::parse_str(&message.id.0).is_ok());
    }

    #[test]
    fn finished_timestamp_follows_future_sent_at() {
        let sent_at = Utc::now() + TimeDelta::hours(1);
        let message = finished_message(&StreamSession::default(), sent_at, Duration::ZERO);
        assert!(message.timestamp > sent_at);
    }

    #[test]
    fn start_without_runtime_reports_error() {
        let controller = controller(ScriptedConnector::new());
        let observer = Arc::new(RecordingObserver::new());

        controller.start(ChatTurnRequest::new("hi"), observer.clone());

        assert_eq!(observer.errors().len(), 1);
        assert!(observer.errors()[0].contains("no tokio runtime"));
        assert_eq!(controller.state(), SessionState::Idle);
        assert!(controller.snapshot().last_error.is_some());
    }

    #[tokio::test]
    async fn start_publishes_in_flight_snapshot() {
        let controller = controller(ScriptedConnector::new().respond(vec![ScriptStep::hang()]));
        let mut updates = controller.subscribe();

        controller.start(ChatTurnRequest::new("hi"), Arc::new(()));

        assert!(updates.has_changed().unwrap());
        assert!(updates.borrow_and_update().in_flight);
        assert_eq!(controller.state(), SessionState::Streaming);
        controller.stop();
        assert!(!controller.snapshot().in_flight);
    }

    #[tokio::test]
    async fn completion_clears_session() {
        let connector = ScriptedConnector::new().respond(vec![
            ScriptStep::chunk(sse_line(&url_mapping(&[("__U0__", "https://x.test")]))),
            ScriptStep::chunk(sse_line(&content("__U0__"))),
            ScriptStep::chunk(sse_line(&done())),
        ]);
        let controller = controller(connector);
        let observer = Arc::new(RecordingObserver::new());

        controller.start(ChatTurnRequest::new("hi"), observer.clone());
        assert!(observer.wait_settled(WAIT).await);

        let snapshot = controller.snapshot();
        assert!(snapshot.accumulated_text.is_empty());
        assert!(snapshot.url_mapping.is_empty());
        assert!(!snapshot.in_flight);
        assert_eq!(controller.state(), SessionState::Idle);
        assert_eq!(observer.completed()[0].text, "https://x.test");
    }

    #[tokio::test]
    async fn reset_clears_last_error() {
        let controller = controller(ScriptedConnector::new().status(500, "boom"));
        let observer = Arc::new(RecordingObserver::new());

        controller.start(ChatTurnRequest::new("hi"), observer.clone());
        assert!(observer.wait_settled(WAIT).await);
        assert!(controller.snapshot().last_error.is_some());

        controller.reset();
        assert!(controller.snapshot().last_error.is_none());
    }

    #[tokio::test]
    async fn reset_keeps_active_turn_running() {
        let gate = Arc::new(tokio::sync::Notify::new());
        let connector = ScriptedConnector::new().respond(vec![
            ScriptStep::chunk(sse_line(&content("old "))),
            ScriptStep::wait(&gate),
            ScriptStep::chunk(sse_line(&content("new"))),
            ScriptStep::chunk(sse_line(&done())),
        ]);
        let controller = controller(connector);
        let observer = Arc::new(RecordingObserver::new());

        controller.start(ChatTurnRequest::new("hi"), observer.clone());
        assert!(observer.wait_for_chunks(1, WAIT).await);
        controller.reset();
        assert_eq!(controller.state(), SessionState::Streaming);
        gate.notify_one();

        assert!(observer.wait_settled(WAIT).await);
        assert_eq!(observer.completed()[0].text, "new");
    }
}
