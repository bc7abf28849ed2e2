use tracing::debug;

use crate::decode::Utf8Decoder;

pub(crate) const DATA_PREFIX: &str = "data:";
pub(crate) const DONE_SENTINEL: &str = "[DONE]";

/// One meaningful record extracted from the upstream event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Frame {
    Delta(String),
    Done,
}

/// Line-oriented decoder for chat-completions event streams.
///
/// Bytes are decoded into a single text buffer; only complete lines are
/// interpreted and the trailing fragment waits for the next chunk. Once the
/// sentinel is seen the decoder is closed and ignores further input.
#[derive(Default)]
pub(crate) struct EventStreamDecoder {
    utf8: Utf8Decoder,
    buf: String,
    done: bool,
}

impl EventStreamDecoder {
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<Frame> {
        if self.done {
            return Vec::new();
        }
        self.buf.push_str(&self.utf8.decode(chunk));

        let mut frames = Vec::new();
        while let Some(idx) = self.buf.find('\n') {
            let line: String = self.buf.drain(..=idx).collect();
            match classify_line(&line) {
                Some(Frame::Done) => {
                    self.done = true;
                    self.buf.clear();
                    frames.push(Frame::Done);
                    return frames;
                }
                Some(frame) => frames.push(frame),
                None => {}
            }
        }
        frames
    }

    #[cfg(test)]
    pub fn is_done(&self) -> bool {
        self.done
    }
}

fn classify_line(raw_line: &str) -> Option<Frame> {
    let line = raw_line.trim();
    let payload = line.strip_prefix(DATA_PREFIX)?.trim();
    if payload == DONE_SENTINEL {
        return Some(Frame::Done);
    }
    extract_delta(payload).map(Frame::Delta)
}

#[derive(serde::Deserialize)]
struct ChunkPayload {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(serde::Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Option<ChunkDelta>,
}

#[derive(serde::Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Extracts `choices[0].delta.content` when present and non-empty.
///
/// A payload that is not valid JSON or has an unexpected shape yields `None`.
pub(crate) fn extract_delta(payload: &str) -> Option<String> {
    let chunk: ChunkPayload = match serde_json::from_str(payload) {
        Ok(chunk) => chunk,
        Err(e) => {
            debug!(error = %e, "skipping malformed upstream payload");
            return None;
        }
    };
    chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta)
        .and_then(|delta| delta.content)
        .filter(|content| !content.is_empty())
}
