//! Built-in signal patterns.
//!
//! Three tables, same shape as the crisis rules: a pattern matched against
//! the lower-cased message and the label recorded when it hits. Patterns
//! that fail to compile are dropped at table build with a warning.

use std::sync::OnceLock;

use regex::Regex;
use tracing::warn;

/// A compiled signal pattern.
#[derive(Debug)]
pub struct SignalPattern {
    /// Compiled pattern, matched against lower-cased input.
    pub pattern: Regex,
    /// Label recorded when the pattern matches.
    pub label: &'static str,
}

/// Emotional-trigger patterns: `(pattern, label)`.
const TRIGGER_TABLE: &[(&str, &str)] = &[
    (
        r"\b(deadline|my boss|overtime|workload|work (is|has been) (stressful|crushing)|job stress)\b",
        "work stress",
    ),
    (
        r"\b(fight with my (mom|dad|mother|father|sister|brother)|family (drama|conflict|argument)|my parents (don'?t|never))\b",
        "family conflict",
    ),
    (
        r"\b(rejected|turned me down|didn'?t get the (job|role|offer)|ghosted( me)?)\b",
        "rejection",
    ),
    (
        r"\b(can'?t afford|money (stress|worries|problems)|debt|rent is due|paycheck to paycheck)\b",
        "financial pressure",
    ),
    (
        r"\b(health scare|test results|waiting on the doctor|something (is|might be) wrong with me)\b",
        "health anxiety",
    ),
];

/// Communication-style preference patterns: `(pattern, label)`.
const PREFERENCE_TABLE: &[(&str, &str)] = &[
    (
        r"\b(just tell me|be direct|give it to me straight|stop sugarcoating|cut to the chase)\b",
        "direct advice",
    ),
    (
        r"\b(be gentle|go easy|that (felt|was) harsh|softer tone)\b",
        "gentle tone",
    ),
    (
        r"\b(give me an example|for example\?|show me what you mean|concrete example)\b",
        "concrete examples",
    ),
    (
        r"\b(step[- ]by[- ]step|break (it|this) down|one thing at a time|walk me through)\b",
        "step-by-step guidance",
    ),
];

/// Positive-feedback patterns.
const POSITIVE_FEEDBACK_TABLE: &[&str] = &[
    r"\b(that (really )?help(s|ed)|exactly what i needed|great (advice|point)|that makes (so much )?sense)\b",
    r"\b(thank(s| you)( so much)?)\b",
];

/// Negative-feedback patterns.
const NEGATIVE_FEEDBACK_TABLE: &[&str] = &[
    r"\b(not helpful|didn'?t help|that'?s not (it|what i meant)|missing the point)\b",
    r"\b(you'?re not listening|that doesn'?t apply to me)\b",
];

fn compile(table: &[(&str, &'static str)]) -> Vec<SignalPattern> {
    table
        .iter()
        .filter_map(|&(pattern, label)| match Regex::new(pattern) {
            Ok(re) => Some(SignalPattern { pattern: re, label }),
            Err(e) => {
                warn!(label, error = %e, "dropping signal pattern with invalid regex");
                None
            }
        })
        .collect()
}

fn compile_plain(table: &[&str], label: &'static str) -> Vec<SignalPattern> {
    table
        .iter()
        .filter_map(|&pattern| match Regex::new(pattern) {
            Ok(re) => Some(SignalPattern { pattern: re, label }),
            Err(e) => {
                warn!(label, error = %e, "dropping signal pattern with invalid regex");
                None
            }
        })
        .collect()
}

/// Compiled trigger patterns, built once on first use.
pub fn trigger_patterns() -> &'static [SignalPattern] {
    static PATTERNS: OnceLock<Vec<SignalPattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| compile(TRIGGER_TABLE))
}

/// Compiled preference patterns, built once on first use.
pub fn preference_patterns() -> &'static [SignalPattern] {
    static PATTERNS: OnceLock<Vec<SignalPattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| compile(PREFERENCE_TABLE))
}

/// Compiled positive-feedback patterns, built once on first use.
pub fn positive_feedback_patterns() -> &'static [SignalPattern] {
    static PATTERNS: OnceLock<Vec<SignalPattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| compile_plain(POSITIVE_FEEDBACK_TABLE, "positive feedback"))
}

/// Compiled negative-feedback patterns, built once on first use.
pub fn negative_feedback_patterns() -> &'static [SignalPattern] {
    static PATTERNS: OnceLock<Vec<SignalPattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| compile_plain(NEGATIVE_FEEDBACK_TABLE, "negative feedback"))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
