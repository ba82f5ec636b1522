//! Built-in crisis rules.
//!
//! Each rule pairs a case-insensitive-by-construction pattern (input is
//! lower-cased before matching) with a severity and an indicator label.
//! Rules are evaluated exhaustively; a message may trigger rules at several
//! severities and the classifier keeps every matched label.
//!
//! Patterns that fail to compile are dropped at table build with a warning
//! rather than panicking — a broken rule must degrade coverage, not chat.

use std::sync::OnceLock;

use regex::Regex;
use tracing::warn;

use crate::severity::Severity;

/// A single crisis rule: pattern, severity, and the indicator label recorded
/// when it matches.
#[derive(Debug)]
pub struct CrisisRule {
    /// Compiled pattern, matched against lower-cased input.
    pub pattern: Regex,
    /// Severity contributed when the pattern matches.
    pub severity: Severity,
    /// Label collected into `CrisisSignal::indicators`.
    pub indicator: &'static str,
}

/// Raw rule table: `(pattern, severity, indicator)`.
///
/// Ordered highest severity first so indicator collection lists the most
/// serious labels first; evaluation itself is exhaustive regardless.
const RULE_TABLE: &[(&str, Severity, &str)] = &[
    // Critical — imminent risk
    (
        r"\b(end(ing)? (my|this) life|kill(ing)? myself|suicidal|suicide)\b",
        Severity::Critical,
        "suicidal ideation",
    ),
    (
        r"\b(don'?t want to (live|be alive|exist)|better off dead|no reason to live)\b",
        Severity::Critical,
        "suicidal ideation",
    ),
    (
        r"\b(goodbye letter|final note|saying goodbye forever)\b",
        Severity::Critical,
        "farewell language",
    ),
    // High — acute distress / self-harm
    (
        r"\b(hurt(ing)? myself|self[- ]harm|cut(ting)? myself|burn(ing)? myself)\b",
        Severity::High,
        "self-harm",
    ),
    (
        r"\b(can'?t (go on|take (this|it) anymore)|want (it|everything) to stop)\b",
        Severity::High,
        "acute distress",
    ),
    (
        r"\b(no way out|completely hopeless|nothing left)\b",
        Severity::High,
        "hopelessness",
    ),
    // Medium — sustained distress
    (
        r"\b(panic attacks?|can'?t breathe|heart (is )?racing)\b",
        Severity::Medium,
        "panic",
    ),
    (
        r"\b(hopeless|worthless|empty inside|numb)\b",
        Severity::Medium,
        "depressive language",
    ),
    (
        r"\b(nobody (cares|would notice)|all alone|no one understands)\b",
        Severity::Medium,
        "isolation",
    ),
    // Low — mild distress
    (
        r"\b(overwhelmed|burn(ed|t)[- ]?out|exhausted|can'?t cope)\b",
        Severity::Low,
        "overwhelm",
    ),
    (
        r"\b(really struggling|having a hard time|falling apart)\b",
        Severity::Low,
        "struggling",
    ),
];

/// Compiled rule table, built once on first use.
pub fn crisis_rules() -> &'static [CrisisRule] {
    static RULES: OnceLock<Vec<CrisisRule>> = OnceLock::new();
    RULES.get_or_init(|| {
        RULE_TABLE
            .iter()
            .filter_map(|&(pattern, severity, indicator)| match Regex::new(pattern) {
                Ok(re) => Some(CrisisRule {
                    pattern: re,
                    severity,
                    indicator,
                }),
                Err(e) => {
                    warn!(indicator, error = %e, "dropping crisis rule with invalid pattern");
                    None
                }
            })
            .collect()
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
