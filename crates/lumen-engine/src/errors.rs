//! Turn-level error taxonomy.
//!
//! Validation and access failures happen before the model call and cost the
//! user nothing. Upstream failures abort the turn without a deduction.
//! Ledger and memory failures after a delivered completion are surfaced,
//! never swallowed.

use lumen_ledger::LedgerError;
use lumen_memory::MemoryError;
use thiserror::Error;

use crate::provider::ProviderError;

/// Errors that can end a conversation turn.
#[derive(Debug, Error)]
pub enum TurnError {
    /// The inbound message was rejected before any work happened.
    #[error("invalid message: {0}")]
    Validation(String),
    /// The user's spendable balance is exhausted.
    #[error("access denied: spendable balance is {balance}")]
    AccessDenied {
        /// Balance at check time.
        balance: i64,
    },
    /// The model call exceeded its wall-clock deadline.
    #[error("model call timed out")]
    UpstreamTimeout,
    /// The model call failed for a non-timeout reason.
    #[error("model call failed: {0}")]
    Upstream(ProviderError),
    /// Billing failed after the completion was delivered.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    /// Conversation persistence failed.
    #[error(transparent)]
    Memory(#[from] MemoryError),
}

impl From<ProviderError> for TurnError {
    fn from(e: ProviderError) -> Self {
        if e.is_timeout() {
            Self::UpstreamTimeout
        } else {
            Self::Upstream(e)
        }
    }
}

/// Result type for turn operations.
pub type Result<T> = std::result::Result<T, TurnError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_timeout_maps_to_upstream_timeout() {
        let err = TurnError::from(ProviderError::Timeout);
        assert!(matches!(err, TurnError::UpstreamTimeout));

        let err = TurnError::from(ProviderError::Api {
            status: 502,
            message: "bad gateway".into(),
        });
        assert!(matches!(err, TurnError::Upstream(_)));
    }
}
