// SPDX-FileCopyrightText: 2026 SmartRAG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Decoding of framed lines into typed [`StreamEvent`]s.
//!
//! Each meaningful line is `data: ` followed by a JSON object carrying one of
//! `content`, `url_mapping`, `done`, or `error`. Lines without the prefix are
//! not events. Unknown fields are ignored so the server can add new ones.

use serde::Deserialize;
use smartrag_core::{SmartRagError, StreamEvent, UrlMapping};

const DATA_FIELD: &str = "data:";

/// JSON payload of a `data:` line. Every field is optional on the wire.
#[derive(Debug, Default, Deserialize)]
struct WirePayload {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    url_mapping: Option<UrlMapping>,
    #[serde(default)]
    done: Option<bool>,
    #[serde(default)]
    error: Option<String>,
}

/// Decodes a single framed line.
///
/// Returns `Ok(None)` for lines that carry no event: blank lines, SSE
/// comments and other fields, and JSON objects without any known key.
/// Returns [`SmartRagError::Protocol`] when a `data:` payload is not a
/// JSON object of the expected shape.
///
/// When one payload carries several keys, terminal keys win:
/// `error`, then `done`, then `url_mapping`, then `content`.
pub fn decode_line(line: &str) -> Result<Option<StreamEvent>, SmartRagError> {
    let Some(data) = line.strip_prefix(DATA_FIELD) else {
        return Ok(None);
    };
    let data = data.strip_prefix(' ').unwrap_or(data).trim_end();

    let payload: WirePayload =
        serde_json::from_str(data).map_err(|e| SmartRagError::Protocol {
            message: format!("malformed event payload: {e}"),
            source: Some(Box::new(e)),
        })?;

    let event = if let Some(message) = payload.error {
        Some(StreamEvent::Error { message })
    } else if payload.done == Some(true) {
        Some(StreamEvent::Done)
    } else if let Some(table) = payload.url_mapping {
        Some(StreamEvent::UrlMapping { table })
    } else {
        payload.content.map(|text| StreamEvent::Content { text })
    };
    Ok(event)
}
