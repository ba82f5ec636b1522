//! Shared defaults for the conversation core.
//!
//! These are compiled defaults; runtime values come from `lumen-settings`
//! where behavior depends on them.

/// Number of recent verbatim messages kept outside the compressed summary.
pub const ACTIVE_WINDOW_SIZE: usize = 10;

/// Unsummarized-message count that triggers re-summarization.
pub const SUMMARIZATION_THRESHOLD: usize = 20;

/// Trailing window (seconds) within which feedback signals adjust
/// recently-updated preference rows.
pub const FEEDBACK_WINDOW_SECS: i64 = 600;

/// Opening marker of the internal coach-notes region in raw model output.
pub const COACH_NOTES_OPEN: &str = "<coach-notes>";

/// Closing marker of the internal coach-notes region in raw model output.
pub const COACH_NOTES_CLOSE: &str = "</coach-notes>";

/// Tokens granted per purchased credit.
pub const TOKENS_PER_CREDIT: i64 = 1000;

/// Tokens granted by the subscription plan each billing period.
pub const MONTHLY_ALLOWANCE_TOKENS: i64 = 50_000;

/// Flat price per 1000 tokens (USD), used for the ledger's cost column.
pub const PRICE_PER_1K_TOKENS: f64 = 0.002;

/// Maximum accepted inbound message length (characters).
pub const MAX_MESSAGE_CHARS: usize = 8000;

/// Wall-clock timeout for a model-endpoint call (milliseconds).
pub const MODEL_TIMEOUT_MS: u64 = 60_000;
