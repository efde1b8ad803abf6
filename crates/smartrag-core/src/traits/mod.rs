// SPDX-FileCopyrightText: 2026 SmartRAG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the seams of the streaming pipeline.
//!
//! Connectors and credential sources are external collaborators; the
//! pipeline only talks to them through these traits.

pub mod adapter;
pub mod connector;
pub mod credentials;
pub mod observer;

pub use adapter::PluginAdapter;
pub use connector::{ByteStream, ChatConnector};
pub use credentials::CredentialProvider;
pub use observer::TurnObserver;
