//! Totally-ordered crisis severity levels.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Safety-risk level assigned to a single message.
///
/// Totally ordered: `None < Low < Medium < High < Critical`. The classifier
/// folds a max over this ordering when multiple rules match.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// No crisis indicators.
    #[default]
    None,
    /// Mild distress (overwhelm, low mood).
    Low,
    /// Sustained distress warranting gentle check-in.
    Medium,
    /// Acute distress or self-harm signals.
    High,
    /// Imminent-risk signals (suicidal ideation, danger to self).
    Critical,
}

impl Severity {
    /// Stable string form used in logs and persistence.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
