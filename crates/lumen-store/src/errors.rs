//! Error types for the persistence layer.
//!
//! [`StoreError`] is returned by every store operation. Variants stay
//! specific enough for exhaustive matching at the service layer — in
//! particular [`StoreError::is_busy`] lets the ledger's retry policy
//! distinguish lock contention from real failures.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// `SQLite` database error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Connection pool error.
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// JSON serialization/deserialization error.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Schema migration failed.
    #[error("migration error: {message}")]
    Migration {
        /// Describes which migration failed and why.
        message: String,
    },

    /// No usage account exists for the given user.
    #[error("account not found: {0}")]
    AccountNotFound(String),

    /// Requested conversation was not found.
    #[error("conversation not found: {0}")]
    ConversationNotFound(String),
}

impl StoreError {
    /// Whether this error is `SQLite` lock contention (`SQLITE_BUSY` /
    /// `SQLITE_LOCKED`), i.e. worth retrying.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        match self {
            Self::Sqlite(rusqlite::Error::SqliteFailure(e, _)) => matches!(
                e.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }
}

/// Convenience type alias for store results.
pub type Result<T> = std::result::Result<T, StoreError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_error_display() {
        let err = StoreError::Sqlite(rusqlite::Error::QueryReturnedNoRows);
        assert!(err.to_string().contains("sqlite error"));
    }

    #[test]
    fn migration_error_display() {
        let err = StoreError::Migration {
            message: "v001 failed: syntax error".into(),
        };
        assert_eq!(err.to_string(), "migration error: v001 failed: syntax error");
    }

    #[test]
    fn account_not_found_display() {
        let err = StoreError::AccountNotFound("user-1".into());
        assert_eq!(err.to_string(), "account not found: user-1");
    }

    #[test]
    fn conversation_not_found_display() {
        let err = StoreError::ConversationNotFound("conv-9".into());
        assert_eq!(err.to_string(), "conversation not found: conv-9");
    }

    #[test]
    fn busy_detection() {
        let busy = StoreError::Sqlite(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        ));
        assert!(busy.is_busy());
        assert!(!StoreError::AccountNotFound("u".into()).is_busy());
    }

    #[test]
    fn from_rusqlite_error() {
        let err: StoreError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, StoreError::Sqlite(_)));
    }
}
