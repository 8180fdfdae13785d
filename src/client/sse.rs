//! Server-Sent Events reassembly.
//!
//! An SSE stream delivers logical events as runs of `data:` lines
//! terminated by a blank line. One logical event's payload may be split
//! across multiple consecutive `data:` lines; those must be concatenated
//! before JSON parsing. A payload that still fails to parse as JSON is
//! wrapped as a single text content block rather than discarded.

use serde_json::{json, Value};

/// Incremental decoder for one SSE stream.
#[derive(Debug, Default)]
pub struct SseDecoder {
    data_lines: Vec<String>,
}

impl SseDecoder {
    /// Creates an empty decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one line from the stream.
    ///
    /// Returns the decoded payload when the line completes an event
    /// (a blank line following at least one `data:` line).
    pub fn push_line(&mut self, line: &str) -> Option<Value> {
        let line = line.strip_suffix('\n').unwrap_or(line);
        let line = line.strip_suffix('\r').unwrap_or(line);

        if line.is_empty() {
            if self.data_lines.is_empty() {
                return None;
            }
            let payload = self.data_lines.join("\n");
            self.data_lines.clear();
            return Some(Self::decode(&payload));
        }

        if let Some(data) = line.strip_prefix("data:") {
            self.data_lines.push(data.strip_prefix(' ').unwrap_or(data).to_string());
        }
        // Other fields (event:, id:, retry:, comments) carry no payload.
        None
    }

    /// Parses a reassembled payload, falling back to a text content block.
    fn decode(payload: &str) -> Value {
        serde_json::from_str(payload)
            .unwrap_or_else(|_| json!({"type": "text", "text": payload}))
    }
}
