// SPDX-FileCopyrightText: 2026 SmartRAG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Newline framing for the chat event stream.
//!
//! Network reads split the body at arbitrary byte offsets, including inside a
//! JSON payload or a multi-byte UTF-8 character. [`LineFramer`] buffers raw
//! bytes and only hands out lines once their terminating `\n` has arrived.

/// Accumulates response bytes and yields complete lines.
#[derive(Debug, Default)]
pub struct LineFramer {
    buffer: Vec<u8>,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk and returns every line it completed, in order.
    ///
    /// The trailing fragment after the last `\n` stays buffered for the next call.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut consumed = 0;
        while let Some(pos) = self.buffer[consumed..].iter().position(|&b| b == b'\n') {
            let end = consumed + pos;
            lines.push(decode_line(&self.buffer[consumed..end]));
            consumed = end + 1;
        }
        self.buffer.drain(..consumed);
        lines
    }

    /// Flushes the retained fragment at end of input.
    ///
    /// Servers that close the connection right after their last event without
    /// a trailing newline leave that event here.
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.buffer);
        Some(decode_line(&rest))
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode_line as decode_event;
    use proptest::prelude::*;
    use smartrag_core::StreamEvent;

    #[test]
    fn yields_complete_lines_and_keeps_fragment() {
        let mut framer = LineFramer::new();
        let lines = framer.push(b"data: one\ndata: tw");
        assert_eq!(lines, vec!["data: one"]);

        let lines = framer.push(b"o\n\n");
        assert_eq!(lines, vec!["data: two", ""]);
        assert_eq!(framer.finish(), None);
    }

    #[test]
    fn line_split_across_reads_is_rejoined() {
        let mut framer = LineFramer::new();
        assert!(framer.push(br#"data: {"don"#).is_empty());
        let lines = framer.push(b"e\":true}\n");
        assert_eq!(lines, vec![r#"data: {"done":true}"#]);
        assert_eq!(decode_event(&lines[0]).unwrap(), Some(StreamEvent::Done));
    }

    #[test]
    fn strips_carriage_returns() {
        let mut framer = LineFramer::new();
        let lines = framer.push(b"data: a\r\ndata: b\r\n");
        assert_eq!(lines, vec!["data: a", "data: b"]);
    }

    #[test]
    fn multibyte_character_split_across_reads() {
        let text = "data: {\"content\":\"知识库\"}\n".as_bytes();
        // Split inside the first three-byte character.
        let split = text.iter().position(|&b| b >= 0x80).unwrap() + 1;
        let mut framer = LineFramer::new();
        assert!(framer.push(&text[..split]).is_empty());
        let lines = framer.push(&text[split..]);
        assert_eq!(
            decode_event(&lines[0]).unwrap(),
            Some(StreamEvent::Content {
                text: "知识库".into()
            })
        );
    }

    #[test]
    fn finish_flushes_unterminated_event() {
        let mut framer = LineFramer::new();
        assert!(framer.push(br#"data: {"done":true}"#).is_empty());
        assert_eq!(framer.finish().as_deref(), Some(r#"data: {"done":true}"#));
        assert_eq!(framer.finish(), None);
    }

    fn wire(fragments: &[String]) -> Vec<u8> {
        let mut body = String::new();
        for fragment in fragments {
            let payload = serde_json::json!({ "content": fragment });
            body.push_str(&format!("data: {payload}\n\n"));
        }
        body.push_str("data: {\"done\":true}\n\n");
        body.into_bytes()
    }

    proptest! {
        #[test]
        fn content_is_independent_of_chunk_boundaries(
            fragments in proptest::collection::vec("[a-z \\u{4e00}-\\u{4e20}\"\\\\]{0,12}", 1..8),
            cuts in proptest::collection::vec(any::<prop::sample::Index>(), 0..10),
        ) {
            let body = wire(&fragments);
            let mut offsets: Vec<usize> = cuts.iter().map(|i| i.index(body.len() + 1)).collect();
            offsets.sort_unstable();
            offsets.dedup();

            let mut framer = LineFramer::new();
            let mut lines = Vec::new();
            let mut start = 0;
            for offset in offsets.into_iter().chain(std::iter::once(body.len())) {
                lines.extend(framer.push(&body[start..offset]));
                start = offset;
            }
            lines.extend(framer.finish());

            let mut text = String::new();
            let mut done = false;
            for line in &lines {
                match decode_event(line).unwrap() {
                    Some(StreamEvent::Content { text: fragment }) => text.push_str(&fragment),
                    Some(StreamEvent::Done) => done = true,
                    _ => {}
                }
            }
            prop_assert!(done);
            prop_assert_eq!(text, fragments.concat());
        }
    }
}
