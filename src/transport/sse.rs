//! Incremental server-sent-events frame parser.
//!
//! Bytes are buffered until a blank line closes a frame. `data:` lines of a frame are
//! joined with `\n`; `event:`, `id:`, `retry:` and comment lines are ignored, and
//! frames without data produce nothing. Works on raw bytes so multi-byte UTF-8
//! sequences split across chunks decode correctly.

use crate::{Error, Result};
use serde_json::Value;
use std::collections::VecDeque;

#[derive(Debug, Default)]
pub(crate) struct SseParser {
    buf: Vec<u8>,
    ready: VecDeque<String>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of the response body.
    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
        while let Some((end, delim_len)) = find_frame_end(&self.buf) {
            let frame: Vec<u8> = self.buf.drain(..end + delim_len).take(end).collect();
            if let Some(data) = frame_data(&frame) {
                self.ready.push_back(data);
            }
        }
    }

    /// Flush whatever is left once the body has ended.
    pub fn finish(&mut self) {
        let rest = std::mem::take(&mut self.buf);
        if let Some(data) = frame_data(&rest) {
            self.ready.push_back(data);
        }
    }

    /// Next complete `data` payload, if any.
    pub fn next_data(&mut self) -> Option<String> {
        self.ready.pop_front()
    }
}

fn find_frame_end(buf: &[u8]) -> Option<(usize, usize)> {
    let lf = find(buf, b"\n\n").map(|i| (i, 2));
    let crlf = find(buf, b"\r\n\r\n").map(|i| (i, 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn frame_data(frame: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(frame);
    let mut data: Option<String> = None;
    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        let (field, value) = match line.split_once(':') {
            Some((f, v)) => (f, v.strip_prefix(' ').unwrap_or(v)),
            None => (line, ""),
        };
        if field == "data" {
            match data.as_mut() {
                Some(d) => {
                    d.push('\n');
                    d.push_str(value);
                }
                None => data = Some(value.to_string()),
            }
        }
    }
    data
}

/// Decode one event payload as JSON.
pub(crate) fn decode_event(data: &str) -> Result<Value> {
    serde_json::from_str(data).map_err(Error::from)
}
