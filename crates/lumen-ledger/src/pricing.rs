//! Flat-rate pricing for the ledger's cost column.

use lumen_core::constants::PRICE_PER_1K_TOKENS;

/// Cost in USD for a token count at the flat per-1K rate.
#[must_use]
pub fn cost_for_tokens(tokens: i64) -> f64 {
    // Negative counts cannot occur from the pipeline; clamp anyway.
    (tokens.max(0) as f64 / 1000.0) * PRICE_PER_1K_TOKENS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cost_scales_linearly() {
        assert!((cost_for_tokens(1000) - PRICE_PER_1K_TOKENS).abs() < 1e-12);
        assert!((cost_for_tokens(500) - PRICE_PER_1K_TOKENS / 2.0).abs() < 1e-12);
        assert!((cost_for_tokens(0)).abs() < 1e-12);
    }

    #[test]
    fn negative_counts_clamp_to_zero() {
        assert!((cost_for_tokens(-10)).abs() < 1e-12);
    }
}
