//! Row structs mapping 1:1 onto the database schema.
//!
//! These are storage-shaped types; domain types live in the service crates
//! that sit on top of the repositories.

/// One `usage_accounts` row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UsageAccountRow {
    /// Owning user.
    pub user_id: String,
    /// Tokens granted by the current billing period.
    pub allowance_total: i64,
    /// Tokens consumed from the current allowance.
    pub allowance_used: i64,
    /// Tokens bought with credits, carried across periods.
    pub purchased_balance: i64,
    /// Authoritative spendable total, maintained by every mutation.
    pub total_balance: i64,
    /// RFC 3339 timestamp of the last mutation.
    pub updated_at: String,
}

/// One `purchases` row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PurchaseRow {
    /// External payment reference; unique, the idempotency key.
    pub payment_ref: String,
    /// Owning user.
    pub user_id: String,
    /// Credits bought.
    pub credits: i64,
    /// Tokens those credits granted.
    pub tokens_granted: i64,
    /// Whether this purchase has been refunded.
    pub refunded: bool,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
}

/// One `usage_log` row.
#[derive(Clone, Debug, PartialEq)]
pub struct UsageLogRow {
    /// Rowid.
    pub id: i64,
    /// Owning user.
    pub user_id: String,
    /// Conversation the turn belonged to, if any.
    pub conversation_id: Option<String>,
    /// Estimated prompt tokens.
    pub input_tokens: i64,
    /// Tokens actually delivered to the client.
    pub output_tokens: i64,
    /// Flat-rate cost of the turn (USD).
    pub cost: f64,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
}

/// One `conversations` row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConversationRow {
    /// Conversation id.
    pub id: String,
    /// Owning user.
    pub user_id: String,
    /// Serialized summary, if one has been produced.
    pub summary_json: Option<String>,
    /// Index of the first message not covered by the summary.
    pub summary_up_to_index: i64,
    /// Total messages appended so far.
    pub message_count: i64,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    /// RFC 3339 timestamp of the last append or summary swap.
    pub updated_at: String,
}

/// One `messages` row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageRow {
    /// Message id.
    pub id: String,
    /// Owning conversation.
    pub conversation_id: String,
    /// Zero-based position within the conversation.
    pub seq: i64,
    /// `"user"` or `"assistant"`.
    pub role: String,
    /// Message text.
    pub content: String,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
}

/// One `trigger_signals` row.
#[derive(Clone, Debug, PartialEq)]
pub struct TriggerSignalRow {
    /// Owning user.
    pub user_id: String,
    /// Trigger label, e.g. `"work stress"`.
    pub trigger_label: String,
    /// Times this trigger has been observed.
    pub occurrences: i64,
    /// Accumulated intensity in `[0, 1]`.
    pub intensity: f64,
    /// RFC 3339 timestamp of the last observation.
    pub updated_at: String,
}

/// One `preference_signals` row.
#[derive(Clone, Debug, PartialEq)]
pub struct PreferenceSignalRow {
    /// Owning user.
    pub user_id: String,
    /// Preference label, e.g. `"direct advice"`.
    pub preference_label: String,
    /// Accumulated confidence in `[0, 1]`.
    pub confidence: f64,
    /// RFC 3339 timestamp of the last direct observation.
    pub updated_at: String,
}
