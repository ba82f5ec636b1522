//! # lumen-engine
//!
//! The conversation turn pipeline: everything between an inbound user
//! message and a settled, billed, remembered assistant reply.
//!
//! [`TurnPipeline`] composes the other crates — safety classification,
//! the usage ledger, conversation memory, signal learning — around a
//! streamed model call. The model endpoint sits behind the
//! [`ModelProvider`] seam; [`HttpProvider`] is the production
//! implementation over an OpenAI-compatible chat-completions API.

#![deny(unsafe_code)]

pub mod composer;
pub mod errors;
pub mod http;
pub mod pipeline;
pub mod provider;
pub mod summarizer;

pub use composer::{CoachComposer, PromptComposer};
pub use errors::{Result, TurnError};
pub use http::{HttpProvider, ProviderConfig, RetryConfig};
pub use pipeline::{PipelineConfig, TurnOutcome, TurnPipeline};
pub use provider::{ChatRequest, DeltaStream, ModelProvider, ProviderError};
pub use summarizer::ModelSummarizer;
