//! Error types for the usage ledger.

use thiserror::Error;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Underlying store failure.
    #[error("store error: {0}")]
    Store(#[from] lumen_store::StoreError),

    /// Lock contention persisted through every retry attempt.
    #[error("persistence conflict after {attempts} attempts")]
    Conflict {
        /// How many attempts were made before giving up.
        attempts: u32,
    },
}

/// Convenience type alias for ledger results.
pub type Result<T> = std::result::Result<T, LedgerError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
