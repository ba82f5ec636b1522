//! The classifier itself: text in, [`CrisisSignal`] out.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::resources::{directive_for, resources_for, Resource};
use crate::rules::crisis_rules;
use crate::severity::Severity;

/// Result of classifying one message.
///
/// Transient: computed fresh per message and never cached across turns, so
/// severity always reflects the current utterance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrisisSignal {
    /// Maximum severity among all matched rules.
    pub severity: Severity,
    /// Every distinct matched indicator label, in rule-table order.
    pub indicators: Vec<String>,
    /// Resources for the resulting severity.
    pub resources: Vec<Resource>,
    /// Directive spliced verbatim into the system prompt.
    pub prompt_directive: String,
}

impl CrisisSignal {
    /// A clean signal: no matches.
    #[must_use]
    pub fn none() -> Self {
        Self {
            severity: Severity::None,
            indicators: Vec::new(),
            resources: Vec::new(),
            prompt_directive: String::new(),
        }
    }

    /// Whether the directive should replace the normal coaching stance
    /// rather than augment it.
    #[must_use]
    pub fn overrides_prompt(&self) -> bool {
        self.severity >= Severity::High
    }
}

/// Classify a single user message.
///
/// Deterministic, side-effect-free, bounded by the (fixed) rule-table size.
/// Evaluates every rule — no short-circuit on first match — folding the max
/// severity and collecting each distinct indicator label. Empty or
/// whitespace-only input classifies as `None`. Never errors.
#[must_use]
pub fn classify(text: &str) -> CrisisSignal {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return CrisisSignal::none();
    }

    let lowered = trimmed.to_lowercase();
    let mut severity = Severity::None;
    let mut indicators: Vec<String> = Vec::new();

    for rule in crisis_rules() {
        if rule.pattern.is_match(&lowered) {
            severity = severity.max(rule.severity);
            if !indicators.iter().any(|i| i == rule.indicator) {
                indicators.push(rule.indicator.to_owned());
            }
        }
    }

    if severity == Severity::None {
        return CrisisSignal::none();
    }

    debug!(%severity, indicators = ?indicators, "crisis indicators matched");

    CrisisSignal {
        severity,
        indicators,
        resources: resources_for(severity).to_vec(),
        prompt_directive: directive_for(severity).to_owned(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
