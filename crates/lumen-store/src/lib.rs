//! # lumen-store
//!
//! `SQLite` persistence for the conversation core: pooled connections with
//! WAL pragmas, embedded versioned migrations, and stateless repositories
//! for accounts, usage, conversations, and learned signals.
//!
//! Invariant held throughout: balance and counter mutations are single SQL
//! statements computed from pre-update row values, never read-modify-write
//! in Rust, so concurrent writers compose correctly.

#![deny(unsafe_code)]

pub mod connection;
pub mod errors;
pub mod migrations;
pub mod repositories;
pub mod row_types;

pub use connection::{ConnectionConfig, ConnectionPool, PooledConnection, new_file, new_in_memory};
pub use errors::{Result, StoreError};
pub use migrations::run_migrations;
pub use repositories::{AccountRepo, ConversationRepo, SignalRepo, UsageRepo};
pub use row_types::{
    ConversationRow, MessageRow, PreferenceSignalRow, PurchaseRow, TriggerSignalRow,
    UsageAccountRow, UsageLogRow,
};
