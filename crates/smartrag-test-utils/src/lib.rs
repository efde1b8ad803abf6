// SPDX-FileCopyrightText: 2026 SmartRAG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for SmartRAG chat client tests.
//!
//! Provides scripted adapters for fast, deterministic tests that never touch
//! the network.
//!
//! # Components
//!
//! - [`ScriptedConnector`] - Connector that replays scripted attempts and body chunks
//! - [`RecordingObserver`] - Turn observer that captures every callback
//! - [`wire`] - Builders for stream event payloads and `data:` lines

pub mod recording_observer;
pub mod scripted_connector;
pub mod wire;

pub use recording_observer::RecordingObserver;
pub use scripted_connector::{AttemptCounter, BodyTracker, ScriptStep, ScriptedConnector};
pub use wire::{content, done, error, sse_line, url_mapping};
