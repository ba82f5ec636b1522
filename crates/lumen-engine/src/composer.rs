//! System-prompt composition.
//!
//! The composer turns the coaching stance, the safety directive for this
//! turn, and the conversation's memory context into one system prompt.
//! [`CoachComposer`] is the production implementation; tests swap in a
//! recording stub through the [`PromptComposer`] seam.

use lumen_memory::MemoryContext;
use lumen_safety::CrisisSignal;

/// Builds the system prompt for one turn.
pub trait PromptComposer: Send + Sync {
    /// Compose the system prompt from this turn's safety signal and the
    /// conversation's memory context.
    fn compose(&self, signal: &CrisisSignal, context: &MemoryContext) -> String;
}

const DEFAULT_STANCE: &str = "You are Lumen, a personal-growth coach. Be warm, \
concrete, and honest. Ask at most one question per reply. You may record \
private observations between <coach-notes> and </coach-notes> markers; the \
user never sees them.";

/// Production composer: stance, safety directive, then memory context.
#[derive(Clone, Debug)]
pub struct CoachComposer {
    /// Base coaching stance.
    pub stance: String,
}

impl Default for CoachComposer {
    fn default() -> Self {
        Self {
            stance: DEFAULT_STANCE.to_owned(),
        }
    }
}

impl PromptComposer for CoachComposer {
    fn compose(&self, signal: &CrisisSignal, context: &MemoryContext) -> String {
        let mut prompt = String::new();

        // A high or critical signal replaces the coaching stance outright;
        // lower severities augment it.
        if signal.overrides_prompt() {
            prompt.push_str(&signal.prompt_directive);
        } else {
            prompt.push_str(&self.stance);
            if !signal.prompt_directive.is_empty() {
                prompt.push_str("\n\n");
                prompt.push_str(&signal.prompt_directive);
            }
        }

        if let Some(summary) = &context.summary {
            prompt.push_str("\n\nWhat has happened so far: ");
            prompt.push_str(&summary.text);
            if !summary.key_themes.is_empty() {
                prompt.push_str("\nRecurring themes: ");
                prompt.push_str(&summary.key_themes.join(", "));
            }
            if !summary.unresolved_topics.is_empty() {
                prompt.push_str("\nStill unresolved: ");
                prompt.push_str(&summary.unresolved_topics.join(", "));
            }
            if !summary.breakthroughs.is_empty() {
                prompt.push_str("\nBreakthroughs to build on: ");
                prompt.push_str(&summary.breakthroughs.join(", "));
            }
        }

        prompt
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
