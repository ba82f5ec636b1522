//! Per-severity support resources and prompt directives.
//!
//! Every severity above `None` maps to a fixed, non-empty ordered resource
//! list and a canned directive string. The directive is spliced verbatim
//! into the system prompt by the composer; at `High` and above it overrides
//! the normal coaching stance entirely.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::severity::Severity;

/// Kind of support resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// 24/7 phone hotline.
    Hotline,
    /// SMS-based crisis line.
    Text,
    /// Emergency services.
    Emergency,
    /// Self-guided grounding or coping guidance.
    Grounding,
}

/// A single support resource surfaced alongside a crisis response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    /// Display name.
    pub name: Cow<'static, str>,
    /// How to reach it (number, shortcode, or instruction).
    pub contact: Cow<'static, str>,
    /// Resource kind.
    pub kind: ResourceKind,
}

const HOTLINE: Resource = Resource {
    name: Cow::Borrowed("988 Suicide & Crisis Lifeline"),
    contact: Cow::Borrowed("Call or text 988"),
    kind: ResourceKind::Hotline,
};

const CRISIS_TEXT: Resource = Resource {
    name: Cow::Borrowed("Crisis Text Line"),
    contact: Cow::Borrowed("Text HOME to 741741"),
    kind: ResourceKind::Text,
};

const EMERGENCY: Resource = Resource {
    name: Cow::Borrowed("Emergency Services"),
    contact: Cow::Borrowed("Call 911 (or your local emergency number)"),
    kind: ResourceKind::Emergency,
};

const GROUNDING: Resource = Resource {
    name: Cow::Borrowed("Grounding exercise"),
    contact: Cow::Borrowed("5-4-3-2-1 senses check-in"),
    kind: ResourceKind::Grounding,
};

/// Ordered resource list for a severity. Empty only for `None`.
#[must_use]
pub fn resources_for(severity: Severity) -> &'static [Resource] {
    match severity {
        Severity::None => &[],
        Severity::Low => &[GROUNDING],
        Severity::Medium => &[GROUNDING, CRISIS_TEXT],
        Severity::High => &[HOTLINE, CRISIS_TEXT, GROUNDING],
        Severity::Critical => &[HOTLINE, CRISIS_TEXT, EMERGENCY],
    }
}

/// Canned prompt directive for a severity. Empty only for `None`.
///
/// Downstream prompt composition must splice this verbatim.
#[must_use]
pub fn directive_for(severity: Severity) -> &'static str {
    match severity {
        Severity::None => "",
        Severity::Low => {
            "The user sounds stretched thin. Acknowledge the strain before anything else, \
             keep suggestions small, and do not push goal work this turn."
        }
        Severity::Medium => {
            "The user is showing sustained distress. Respond with warmth first, reflect what \
             you heard, gently mention the support resources provided, and avoid challenges \
             or homework this turn."
        }
        Severity::High => {
            "PRIORITY: the user is in acute distress. Drop the normal coaching agenda. \
             Validate their feelings, stay present, share the crisis resources provided, and \
             encourage reaching out to a trusted person or professional."
        }
        Severity::Critical => {
            "OVERRIDE: the user may be at imminent risk. Respond only with calm, direct \
             support. State clearly that help is available right now, present the hotline and \
             emergency resources provided, and urge them to contact one immediately. Do not \
             discuss anything else."
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
