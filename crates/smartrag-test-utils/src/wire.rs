// SPDX-FileCopyrightText: 2026 SmartRAG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builders for the chat stream wire format.

use serde_json::{Map, Value, json};

pub fn content(text: &str) -> Value {
    json!({ "content": text })
}

pub fn url_mapping(pairs: &[(&str, &str)]) -> Value {
    let table: Map<String, Value> = pairs
        .iter()
        .map(|(token, url)| (token.to_string(), Value::String(url.to_string())))
        .collect();
    json!({ "url_mapping": table })
}

pub fn done() -> Value {
    json!({ "done": true })
}

pub fn error(message: &str) -> Value {
    json!({ "error": message })
}

/// Encodes a payload as one event: `data: {json}` followed by a blank line.
pub fn sse_line(payload: &Value) -> Vec<u8> {
    format!("data: {payload}\n\n").into_bytes()
}

/// Concatenates several events into one body.
pub fn sse_body(payloads: &[Value]) -> Vec<u8> {
    payloads.iter().flat_map(sse_line).collect()
}
