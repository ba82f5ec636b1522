//! # lumen-signals
//!
//! Signal learning from user messages: emotional triggers, communication
//! preferences, and explicit feedback, matched against pattern tables and
//! accumulated into per-user aggregates.
//!
//! Extraction is pure and infallible; recording is advisory and fail-open.
//! Nothing in this crate can fail a turn.

#![deny(unsafe_code)]

pub mod extractor;
pub mod patterns;
pub mod recorder;

pub use extractor::{ExtractedSignals, Feedback, extract};
pub use recorder::{RecorderConfig, SignalRecorder};
