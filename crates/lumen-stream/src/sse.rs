//! Line-buffered Server-Sent-Events parsing for model streams.
//!
//! The model endpoint streams completions as SSE. TCP gives no alignment
//! between network chunks and SSE event boundaries, so two correctness
//! issues have to be handled once, here:
//!
//! 1. **Multiple events per chunk** — all complete lines in a chunk are
//!    processed, not just the first.
//! 2. **Partial lines across chunks** — an incomplete trailing line stays
//!    buffered until its newline arrives.
//!
//! [`SseLineBuffer`] is the synchronous core (feed bytes, get data
//! payloads); [`sse_data_stream`] adapts it over an async byte stream.

use bytes::{Bytes, BytesMut};
use futures::Stream;
use tokio_stream::StreamExt;
use tracing::warn;

/// Options for the SSE parser.
#[derive(Clone, Debug)]
pub struct SseParserOptions {
    /// Whether to attempt parsing leftover buffer content when the byte
    /// stream ends without a trailing newline. Default: `true`.
    pub process_remaining_buffer: bool,
}

impl Default for SseParserOptions {
    fn default() -> Self {
        Self {
            process_remaining_buffer: true,
        }
    }
}

/// Synchronous SSE line buffer.
///
/// Accumulates raw bytes and yields the payload of each complete `data:`
/// line. Comments, non-data fields, empty payloads, and the `[DONE]`
/// terminator are filtered out.
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    buffer: BytesMut,
}

impl SseLineBuffer {
    /// Create an empty line buffer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(8192),
        }
    }

    /// Feed raw bytes, returning the data payloads of every complete line.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);
        let mut out = Vec::new();

        while let Some(newline_pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let mut line_bytes = self.buffer.split_to(newline_pos + 1);
            line_bytes.truncate(line_bytes.len() - 1);
            if line_bytes.last() == Some(&b'\r') {
                line_bytes.truncate(line_bytes.len() - 1);
            }

            let Ok(line) = std::str::from_utf8(&line_bytes) else {
                continue; // skip invalid UTF-8 lines
            };
            if let Some(data) = extract_sse_data(line) {
                out.push(data);
            }
        }

        out
    }

    /// Parse any leftover partial line at end of stream.
    pub fn flush(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let remaining = self.buffer.split();
        let line = std::str::from_utf8(&remaining).ok()?;
        extract_sse_data(line.trim())
    }
}

/// Extract the payload from an SSE line.
///
/// Returns `None` for comments, empty lines, non-data fields, empty data,
/// and the `[DONE]` terminator.
fn extract_sse_data(line: &str) -> Option<String> {
    let trimmed = line.trim();

    if trimmed.is_empty() || trimmed.starts_with(':') {
        return None;
    }

    let data = trimmed
        .strip_prefix("data: ")
        .or_else(|| trimmed.strip_prefix("data:"))?;
    let data = data.trim();

    if data.is_empty() || data == "[DONE]" {
        return None;
    }

    Some(data.to_owned())
}

/// Adapt an async byte stream into a stream of SSE data payloads.
///
/// A read error is yielded once and ends the stream; the caller decides
/// whether it is fatal for the turn.
pub fn sse_data_stream<S, E>(
    byte_stream: S,
    options: SseParserOptions,
) -> impl Stream<Item = Result<String, E>> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send + Unpin + 'static,
    E: Send + 'static,
{
    let process_remaining = options.process_remaining_buffer;

    futures::stream::unfold(
        (byte_stream, SseLineBuffer::new(), Vec::new(), false),
        move |(mut stream, mut parser, mut pending, done)| async move {
            loop {
                if let Some(data) = pending_pop(&mut pending) {
                    return Some((Ok(data), (stream, parser, pending, done)));
                }
                if done {
                    return None;
                }

                match stream.next().await {
                    Some(Ok(chunk)) => {
                        pending = parser.feed(&chunk);
                    }
                    Some(Err(e)) => {
                        return Some((Err(e), (stream, parser, Vec::new(), true)));
                    }
                    None => {
                        if process_remaining {
                            if let Some(data) = parser.flush() {
                                return Some((Ok(data), (stream, parser, Vec::new(), true)));
                            }
                        }
                        return None;
                    }
                }
            }
        },
    )
}

/// Pop the next pending payload, preserving arrival order.
fn pending_pop(pending: &mut Vec<String>) -> Option<String> {
    if pending.is_empty() {
        None
    } else {
        Some(pending.remove(0))
    }
}

/// Parse JSON from an SSE data payload, logging on failure.
pub fn parse_sse_data<T: serde::de::DeserializeOwned>(data: &str, context: &str) -> Option<T> {
    match serde_json::from_str(data) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!(
                context,
                error = %e,
                preview = lumen_core::text::truncate_str(data, 100),
                "failed to parse SSE data payload"
            );
            None
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
