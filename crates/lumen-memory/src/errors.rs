//! Error types for conversation memory.

use thiserror::Error;

/// Errors that can occur during memory operations.
#[derive(Debug, Error)]
pub enum MemoryError {
    /// Underlying store failure.
    #[error("store error: {0}")]
    Store(#[from] lumen_store::StoreError),

    /// Summarization call failed.
    #[error("summarization failed: {0}")]
    Summarization(String),

    /// Summary JSON could not be serialized or parsed.
    #[error("summary serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Convenience type alias for memory results.
pub type Result<T> = std::result::Result<T, MemoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summarization_display() {
        let err = MemoryError::Summarization("model returned 500".into());
        assert_eq!(err.to_string(), "summarization failed: model returned 500");
    }

    #[test]
    fn store_error_wraps() {
        let err: MemoryError = lumen_store::StoreError::ConversationNotFound("c1".into()).into();
        assert!(err.to_string().contains("conversation not found"));
    }
}
