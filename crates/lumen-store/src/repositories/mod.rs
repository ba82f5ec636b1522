//! Stateless repositories over the schema.
//!
//! Every method takes `&Connection` so callers control pooling and
//! transactions. Counter mutations are SQL-side increments.

pub mod account;
pub mod conversation;
pub mod signal;
pub mod usage;

pub use account::AccountRepo;
pub use conversation::ConversationRepo;
pub use signal::SignalRepo;
pub use usage::UsageRepo;
