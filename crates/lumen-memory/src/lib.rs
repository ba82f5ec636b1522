//! # lumen-memory
//!
//! Conversation continuity: verbatim recent history (the active window)
//! plus rolling summarization of everything older. The summary carries
//! themes, unresolved topics, an emotional arc, and breakthroughs so the
//! prompt composer can keep long-running context cheap.

#![deny(unsafe_code)]

pub mod errors;
pub mod manager;
pub mod summarizer;
pub mod types;

pub use errors::{MemoryError, Result};
pub use manager::{MemoryConfig, MemoryManager};
pub use summarizer::Summarizer;
pub use types::{EmotionalArc, MemoryContext, Summary, Trajectory};
