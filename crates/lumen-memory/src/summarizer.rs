//! The summarizer seam.
//!
//! The manager does not talk to the model endpoint itself; it hands the
//! span to be compressed to a [`Summarizer`] and parses whatever comes
//! back. The model-backed implementation lives with the engine's provider;
//! tests script this trait directly.

use async_trait::async_trait;
use lumen_core::messages::ChatMessage;

use crate::errors::Result;

/// Produces raw summary JSON for a span of conversation history.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarize the given messages (oldest first). Returns the model's raw
    /// output; the caller parses and validates it.
    async fn summarize(&self, messages: &[ChatMessage]) -> Result<String>;
}

#[async_trait]
impl<T: Summarizer> Summarizer for std::sync::Arc<T> {
    async fn summarize(&self, messages: &[ChatMessage]) -> Result<String> {
        (**self).summarize(messages).await
    }
}
