//! Text utilities: safe truncation and token estimation.

/// Truncate a string to at most `max_chars` characters, appending an
/// ellipsis when truncation occurs. Always cuts on a char boundary.
#[must_use]
pub fn truncate_str(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_owned();
    }
    let truncated: String = s.chars().take(max_chars).collect();
    format!("{truncated}…")
}

/// Estimate the token count of a piece of text.
///
/// Uses the ~4 characters per token heuristic. Good enough for ledger
/// estimation of streamed output where the endpoint reports no usage;
/// never used for billing-grade reconciliation.
#[must_use]
pub fn estimate_tokens(s: &str) -> i64 {
    let chars = s.chars().count();
    i64::try_from(chars.div_ceil(4)).unwrap_or(i64::MAX)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
