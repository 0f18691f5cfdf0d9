//! Line framing of the generator's event stream.
//!
//! The upstream stream is newline-delimited. Each line is either the
//! termination sentinel or `data: ` followed by a JSON chunk whose
//! `choices[0].delta.content` carries the next token delta. Anything else is
//! skipped without error.

use serde::Deserialize;

/// Length of the `data: ` prefix stripped from every event line.
const PREFIX_LEN: usize = 6;

/// Payload marking the end of the stream.
const DONE: &str = "[DONE]";

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Option<Delta>,
}

#[derive(Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

/// Reassembles lines from raw stream bytes and decodes their token deltas.
///
/// Lines are split on raw bytes, so a multi-byte character divided between
/// transport chunks is decoded intact.
#[derive(Debug, Default)]
pub struct EventDecoder {
    pending: Vec<u8>,
}

impl EventDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Push transport bytes and return the deltas of every completed line.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);
        let mut deltas = Vec::new();
        let mut consumed = 0;
        while let Some(offset) = self.pending[consumed..].iter().position(|&b| b == b'\n') {
            let end = consumed + offset;
            if let Some(delta) = decode_line(&self.pending[consumed..end]) {
                deltas.push(delta);
            }
            consumed = end + 1;
        }
        self.pending.drain(..consumed);
        deltas
    }

    /// Decode a final line left without a trailing newline.
    pub fn finish(&mut self) -> Option<String> {
        let line = std::mem::take(&mut self.pending);
        decode_line(&line)
    }
}

fn decode_line(line: &[u8]) -> Option<String> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    if line.len() < PREFIX_LEN {
        return None;
    }
    let text = std::str::from_utf8(line).ok()?;
    let payload = text.get(PREFIX_LEN..)?;
    if payload == DONE {
        return None;
    }
    let chunk: StreamChunk = serde_json::from_str(payload).ok()?;
    chunk
        .choices
        .into_iter()
        .next()?
        .delta?
        .content
        .filter(|content| !content.is_empty())
}
