//! Summary and context types.
//!
//! A [`Summary`] compresses everything before the active window. Its list
//! fields are bounded on parse so a rambling model response cannot inflate
//! the stored summary without limit.

use lumen_core::messages::ChatMessage;
use serde::{Deserialize, Serialize};

/// Maximum key themes retained in a summary.
pub const MAX_KEY_THEMES: usize = 6;
/// Maximum unresolved topics retained in a summary.
pub const MAX_UNRESOLVED_TOPICS: usize = 5;
/// Maximum breakthroughs retained in a summary.
pub const MAX_BREAKTHROUGHS: usize = 5;

/// Direction of the user's mood across the summarized span.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trajectory {
    /// Mood trending upward.
    Improving,
    /// No clear movement.
    #[default]
    Stable,
    /// Mood trending downward.
    Declining,
    /// Swinging without a direction.
    Fluctuating,
}

/// Start/current mood plus the trajectory between them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmotionalArc {
    /// Mood at the start of the summarized span.
    pub start_mood: String,
    /// Mood at the end of the summarized span.
    pub current_mood: String,
    /// Overall direction.
    pub trajectory: Trajectory,
}

/// Compressed representation of conversation history before the active
/// window.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    /// Short prose synopsis.
    pub text: String,
    /// Recurring themes, at most [`MAX_KEY_THEMES`].
    #[serde(default)]
    pub key_themes: Vec<String>,
    /// Topics raised but not resolved, at most [`MAX_UNRESOLVED_TOPICS`].
    #[serde(default)]
    pub unresolved_topics: Vec<String>,
    /// Mood over the summarized span.
    #[serde(default)]
    pub emotional_arc: EmotionalArc,
    /// Moments of insight worth carrying forward, at most
    /// [`MAX_BREAKTHROUGHS`].
    #[serde(default)]
    pub breakthroughs: Vec<String>,
}

impl Summary {
    /// Parse a summary from model output, enforcing the list bounds.
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        let mut summary: Self = serde_json::from_str(raw)?;
        summary.key_themes.truncate(MAX_KEY_THEMES);
        summary.unresolved_topics.truncate(MAX_UNRESOLVED_TOPICS);
        summary.breakthroughs.truncate(MAX_BREAKTHROUGHS);
        Ok(summary)
    }

    /// Serialize for storage.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// What the prompt composer sees: the summary (if any) plus the verbatim
/// active window.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MemoryContext {
    /// Compressed prior history, absent until the first summarization pass.
    pub summary: Option<Summary>,
    /// Most recent messages kept verbatim, oldest first.
    pub active_messages: Vec<ChatMessage>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_enforces_bounds() {
        let raw = serde_json::json!({
            "text": "long conversation",
            "keyThemes": (0..10).map(|i| format!("t{i}")).collect::<Vec<_>>(),
            "unresolvedTopics": (0..8).map(|i| format!("u{i}")).collect::<Vec<_>>(),
            "emotionalArc": {
                "startMood": "anxious",
                "currentMood": "calmer",
                "trajectory": "improving"
            },
            "breakthroughs": (0..9).map(|i| format!("b{i}")).collect::<Vec<_>>(),
        })
        .to_string();

        let summary = Summary::from_json(&raw).unwrap();
        assert_eq!(summary.key_themes.len(), MAX_KEY_THEMES);
        assert_eq!(summary.unresolved_topics.len(), MAX_UNRESOLVED_TOPICS);
        assert_eq!(summary.breakthroughs.len(), MAX_BREAKTHROUGHS);
        assert_eq!(summary.emotional_arc.trajectory, Trajectory::Improving);
    }

    #[test]
    fn parse_fills_missing_lists() {
        let summary = Summary::from_json(r#"{"text":"short"}"#).unwrap();
        assert_eq!(summary.text, "short");
        assert!(summary.key_themes.is_empty());
        assert_eq!(summary.emotional_arc.trajectory, Trajectory::Stable);
    }

    #[test]
    fn parse_rejects_non_json() {
        assert!(Summary::from_json("Sure! Here's a summary:").is_err());
    }

    #[test]
    fn storage_round_trip() {
        let summary = Summary {
            text: "working through a career change".into(),
            key_themes: vec!["career".into(), "self-doubt".into()],
            unresolved_topics: vec!["timeline".into()],
            emotional_arc: EmotionalArc {
                start_mood: "stuck".into(),
                current_mood: "hopeful".into(),
                trajectory: Trajectory::Improving,
            },
            breakthroughs: vec!["named the fear".into()],
        };
        let json = summary.to_json().unwrap();
        assert_eq!(Summary::from_json(&json).unwrap(), summary);
    }

    #[test]
    fn trajectory_serializes_lowercase() {
        let json = serde_json::to_string(&Trajectory::Fluctuating).unwrap();
        assert_eq!(json, "\"fluctuating\"");
    }
}
