//! The model-provider seam.
//!
//! The pipeline talks to the model endpoint through [`ModelProvider`], which
//! returns a stream of plain text deltas. The HTTP implementation lives in
//! [`crate::http`]; tests script this trait directly.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use lumen_core::messages::ChatMessage;
use thiserror::Error;

/// Boxed stream of text deltas from one completion.
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<String, ProviderError>> + Send>>;

/// Errors from the model endpoint.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Transport-level failure talking to the endpoint.
    #[error("model request failed: {0}")]
    Http(reqwest::Error),
    /// The endpoint answered with a non-success status.
    #[error("model endpoint returned {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        message: String,
    },
    /// The call exceeded its wall-clock deadline.
    #[error("model call exceeded its deadline")]
    Timeout,
}

impl ProviderError {
    /// Classify a transport error, routing timeouts to [`Self::Timeout`].
    #[must_use]
    pub fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Http(e)
        }
    }

    /// Whether this error is the wall-clock deadline firing.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Whether a fresh attempt could plausibly succeed.
    ///
    /// Connection failures, deadline expiry, rate limiting, and server
    /// errors are retryable; everything else is not.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout => true,
            Self::Http(e) => e.is_connect(),
            Self::Api { status, .. } => *status == 429 || (500..=599).contains(status),
        }
    }
}

/// One completion request: a composed system prompt plus the conversation
/// history, oldest first, ending with the new user message.
#[derive(Clone, Debug)]
pub struct ChatRequest {
    /// Composed system prompt.
    pub system_prompt: String,
    /// Conversation messages, oldest first.
    pub messages: Vec<ChatMessage>,
}

/// Streams completions for chat requests.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Start one streamed completion.
    ///
    /// Errors returned here happened before any output was produced and are
    /// safe to retry; errors yielded inside the stream are not.
    async fn stream_completion(&self, request: &ChatRequest) -> Result<DeltaStream, ProviderError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
