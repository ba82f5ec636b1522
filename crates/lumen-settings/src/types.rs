//! Settings types with compiled defaults.
//!
//! Every field has a serde default so a partial settings file only
//! overrides what it names. Defaults come from `lumen_core::constants`.

use lumen_core::constants;
use serde::{Deserialize, Serialize};

/// Root settings for the conversation core.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LumenSettings {
    /// Model endpoint configuration.
    pub model: ModelSettings,
    /// Ledger and billing configuration.
    pub ledger: LedgerSettings,
    /// Conversation memory windowing.
    pub memory: MemorySettings,
    /// Signal learning configuration.
    pub signals: SignalSettings,
}

/// Model endpoint configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelSettings {
    /// Base URL of the model-serving endpoint.
    pub endpoint: String,
    /// Model identifier sent with each request.
    pub model: String,
    /// Wall-clock timeout for one streamed completion (milliseconds).
    pub timeout_ms: u64,
    /// Maximum accepted inbound message length (characters).
    pub max_message_chars: usize,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8080/v1/chat/completions".to_owned(),
            model: "lumen-coach-1".to_owned(),
            timeout_ms: constants::MODEL_TIMEOUT_MS,
            max_message_chars: constants::MAX_MESSAGE_CHARS,
        }
    }
}

/// Ledger and billing configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LedgerSettings {
    /// Tokens granted by the plan each billing period.
    pub monthly_allowance: i64,
    /// Tokens granted per purchased credit.
    pub tokens_per_credit: i64,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            monthly_allowance: constants::MONTHLY_ALLOWANCE_TOKENS,
            tokens_per_credit: constants::TOKENS_PER_CREDIT,
        }
    }
}

/// Conversation memory windowing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MemorySettings {
    /// Recent messages kept verbatim outside the summary.
    pub active_window_size: usize,
    /// Unsummarized-message count that triggers re-summarization.
    pub summarization_threshold: usize,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            active_window_size: constants::ACTIVE_WINDOW_SIZE,
            summarization_threshold: constants::SUMMARIZATION_THRESHOLD,
        }
    }
}

/// Signal learning configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SignalSettings {
    /// Trailing window within which feedback adjusts preference rows
    /// (seconds).
    pub feedback_window_secs: i64,
}

impl Default for SignalSettings {
    fn default() -> Self {
        Self {
            feedback_window_secs: constants::FEEDBACK_WINDOW_SECS,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
