// SPDX-FileCopyrightText: 2026 SmartRAG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire and domain types shared by the transport, the session controller,
//! and the command-line front end.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Unique identifier for a conversation on the backend. Passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(pub String);

/// Unique identifier for a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub String);

/// Health status reported by the backend health endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Backend is fully operational.
    Healthy,
    /// Backend answered but reported a non-healthy status.
    Degraded(String),
    /// Backend is not reachable or returned an error.
    Unhealthy(String),
}

/// Author of a chat turn. The backend calls the assistant side `model`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// A single text part of a history turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextPart {
    pub text: String,
}

/// One prior turn of the conversation, sent oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub role: Role,
    pub parts: Vec<TextPart>,
}

impl HistoryTurn {
    /// A user turn with a single text part.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![TextPart { text: text.into() }],
        }
    }

    /// A model turn with a single text part.
    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            parts: vec![TextPart { text: text.into() }],
        }
    }

    /// Concatenated text of all parts.
    pub fn text(&self) -> String {
        self.parts.iter().map(|p| p.text.as_str()).collect()
    }
}

/// Outbound request for one chat turn.
///
/// Serializes to the backend's request body. `sent_at` is the timestamp of
/// the user message that triggered the turn and never goes on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurnRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<HistoryTurn>,
    #[serde(default = "default_user_role")]
    pub user_role: String,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub conversation_id: Option<ConversationId>,
    #[serde(default)]
    pub knowledge_retrieval: bool,
    #[serde(default)]
    pub knowledge_name: Option<String>,
    #[serde(skip, default = "Utc::now")]
    pub sent_at: DateTime<Utc>,
}

fn default_user_role() -> String {
    "admin".to_string()
}

impl ChatTurnRequest {
    /// Creates a request with backend defaults and `sent_at` set to now.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            history: Vec::new(),
            user_role: default_user_role(),
            user_id: None,
            conversation_id: None,
            knowledge_retrieval: false,
            knowledge_name: None,
            sent_at: Utc::now(),
        }
    }

    pub fn with_history(mut self, history: Vec<HistoryTurn>) -> Self {
        self.history = history;
        self
    }

    pub fn with_user(mut self, role: impl Into<String>, user_id: Option<i64>) -> Self {
        self.user_role = role.into();
        self.user_id = user_id;
        self
    }

    pub fn with_conversation(mut self, id: ConversationId) -> Self {
        self.conversation_id = Some(id);
        self
    }

    /// Enables knowledge retrieval against the named knowledge source.
    pub fn with_knowledge(mut self, name: impl Into<String>) -> Self {
        self.knowledge_retrieval = true;
        self.knowledge_name = Some(name.into());
        self
    }

    pub fn with_sent_at(mut self, sent_at: DateTime<Utc>) -> Self {
        self.sent_at = sent_at;
        self
    }
}

/// Placeholder token to URL table carried by a `url_mapping` event.
pub type UrlMapping = BTreeMap<String, String>;

/// A single event decoded from the chat stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Incremental text fragment to append.
    Content { text: String },
    /// Complete replacement placeholder table.
    UrlMapping { table: UrlMapping },
    /// No further events follow.
    Done,
    /// The server failed the turn.
    Error { message: String },
}

impl StreamEvent {
    /// Returns true for `Done` and `Error`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done | StreamEvent::Error { .. })
    }
}

/// The assistant message produced once per successful turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinishedMessage {
    pub id: MessageId,
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}
