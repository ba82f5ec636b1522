//! # lumen-stream
//!
//! Streaming text plumbing for the conversation core.
//!
//! Two layers, composed by the engine:
//!
//! 1. [`sse`] — line-buffered Server-Sent-Events parsing of the raw byte
//!    stream from the model endpoint. Handles partial lines across TCP
//!    chunk boundaries and multiple events per chunk.
//! 2. [`filter`] — the [`MarkerFilter`] state machine that elides the
//!    paired coach-notes marker region from the decoded text deltas, no
//!    matter how the region is split across deltas, and tracks the running
//!    total of text actually delivered to the client.

#![deny(unsafe_code)]

pub mod filter;
pub mod sse;

pub use filter::MarkerFilter;
pub use sse::{parse_sse_data, sse_data_stream, SseLineBuffer, SseParserOptions};
