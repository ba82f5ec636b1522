//! # lumen-ledger
//!
//! Per-user token accounting: a recurring allowance pool plus a purchased
//! pool, an append-only usage log, and idempotent purchase/refund handling.
//!
//! The ledger is the only component whose state is mutated from multiple
//! flows at once (turn completion, retried requests, payment webhooks), so
//! every mutation is a row-level atomic statement in `lumen-store` and the
//! deduct transaction retries on contention rather than dropping.

#![deny(unsafe_code)]

pub mod errors;
pub mod ledger;
pub mod pricing;

pub use errors::{LedgerError, Result};
pub use ledger::{AccessDecision, LedgerConfig, UsageLedger};
pub use pricing::cost_for_tokens;
