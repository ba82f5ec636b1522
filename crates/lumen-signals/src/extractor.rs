//! Pure signal extraction.
//!
//! Deterministic over the input text, no I/O, never fails. Recording the
//! extracted signals is a separate step.

use crate::patterns::{
    negative_feedback_patterns, positive_feedback_patterns, preference_patterns, trigger_patterns,
};

/// Direction of explicit feedback in a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Feedback {
    /// The user found the previous response helpful.
    Positive,
    /// The user pushed back on the previous response.
    Negative,
}

/// Everything learnable from one user message.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtractedSignals {
    /// Matched emotional-trigger labels, in table order, deduplicated.
    pub triggers: Vec<&'static str>,
    /// Matched communication-preference labels, in table order, deduplicated.
    pub preferences: Vec<&'static str>,
    /// Net feedback direction, if any.
    pub feedback: Option<Feedback>,
}

impl ExtractedSignals {
    /// Whether the message produced no signals at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty() && self.preferences.is_empty() && self.feedback.is_none()
    }
}

/// Extract signals from one user message.
///
/// Matching is case-insensitive via lower-casing. When a message carries
/// both positive and negative feedback, negative wins: pushback is the
/// stronger steering signal.
#[must_use]
pub fn extract(text: &str) -> ExtractedSignals {
    let lowered = text.to_lowercase();

    let mut triggers = Vec::new();
    for pattern in trigger_patterns() {
        if pattern.pattern.is_match(&lowered) && !triggers.contains(&pattern.label) {
            triggers.push(pattern.label);
        }
    }

    let mut preferences = Vec::new();
    for pattern in preference_patterns() {
        if pattern.pattern.is_match(&lowered) && !preferences.contains(&pattern.label) {
            preferences.push(pattern.label);
        }
    }

    let negative = negative_feedback_patterns()
        .iter()
        .any(|p| p.pattern.is_match(&lowered));
    let positive = positive_feedback_patterns()
        .iter()
        .any(|p| p.pattern.is_match(&lowered));
    let feedback = if negative {
        Some(Feedback::Negative)
    } else if positive {
        Some(Feedback::Positive)
    } else {
        None
    };

    ExtractedSignals {
        triggers,
        preferences,
        feedback,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_message_yields_nothing() {
        let signals = extract("I went for a walk this morning");
        assert!(signals.is_empty());
    }

    #[test]
    fn trigger_and_preference_in_one_message() {
        let signals = extract("My boss is impossible. Just tell me what to do.");
        assert_eq!(signals.triggers, vec!["work stress"]);
        assert_eq!(signals.preferences, vec!["direct advice"]);
        assert!(signals.feedback.is_none());
    }

    #[test]
    fn matching_is_case_insensitive() {
        let signals = extract("DEADLINE after DEADLINE");
        assert_eq!(signals.triggers, vec!["work stress"]);
    }

    #[test]
    fn repeated_matches_dedupe() {
        let signals = extract("deadline stress, my boss, more overtime");
        assert_eq!(signals.triggers, vec!["work stress"]);
    }

    #[test]
    fn multiple_triggers_keep_table_order() {
        let signals = extract("Got rejected for the loan and now I can't afford rent");
        assert_eq!(signals.triggers, vec!["rejection", "financial pressure"]);
    }

    #[test]
    fn positive_feedback_detected() {
        let signals = extract("that really helped, thanks");
        assert_eq!(signals.feedback, Some(Feedback::Positive));
    }

    #[test]
    fn negative_feedback_wins_over_positive() {
        let signals = extract("thanks, but that's not what i meant");
        assert_eq!(signals.feedback, Some(Feedback::Negative));
    }

    #[test]
    fn extraction_is_deterministic() {
        let text = "fight with my mom again. be gentle with me. not helpful last time";
        assert_eq!(extract(text), extract(text));
    }
}
