//! Persisting extracted signals.
//!
//! Signal learning is advisory: a store failure here must never fail the
//! turn, so `record` logs and swallows errors. Score arithmetic lives in
//! the store's SQL upserts; this layer only supplies the steps and the
//! feedback window.

use lumen_core::constants::FEEDBACK_WINDOW_SECS;
use lumen_core::ids::UserId;
use lumen_store::{ConnectionPool, SignalRepo};
use tracing::warn;

use crate::extractor::{ExtractedSignals, Feedback};

/// Learning-rate knobs.
#[derive(Clone, Copy, Debug)]
pub struct RecorderConfig {
    /// Intensity added per trigger observation.
    pub intensity_step: f64,
    /// Confidence added per direct preference observation.
    pub confidence_step: f64,
    /// Confidence delta applied by one feedback signal.
    pub feedback_step: f64,
    /// Trailing window within which feedback adjusts preference rows.
    pub feedback_window_secs: i64,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            intensity_step: 0.1,
            confidence_step: 0.1,
            feedback_step: 0.05,
            feedback_window_secs: FEEDBACK_WINDOW_SECS,
        }
    }
}

/// Writes signal aggregates for extracted signals.
#[derive(Clone)]
pub struct SignalRecorder {
    pool: ConnectionPool,
    config: RecorderConfig,
}

impl SignalRecorder {
    /// Create a recorder over an already-migrated pool.
    #[must_use]
    pub fn new(pool: ConnectionPool, config: RecorderConfig) -> Self {
        Self { pool, config }
    }

    /// Persist one message's signals. Never fails the caller.
    ///
    /// Feedback deliberately adjusts every preference row the user touched
    /// within the trailing window, not just the preference behind the
    /// praised or criticized response.
    pub fn record(&self, user: &UserId, signals: &ExtractedSignals) {
        if signals.is_empty() {
            return;
        }
        if let Err(e) = self.try_record(user, signals) {
            warn!(user = %user, error = %e, "failed to record signals, dropping");
        }
    }

    fn try_record(&self, user: &UserId, signals: &ExtractedSignals) -> lumen_store::Result<()> {
        let conn = self.pool.get()?;

        for label in &signals.triggers {
            SignalRepo::bump_trigger(&conn, user.as_str(), label, self.config.intensity_step)?;
        }
        for label in &signals.preferences {
            SignalRepo::bump_preference(&conn, user.as_str(), label, self.config.confidence_step)?;
        }

        if let Some(feedback) = signals.feedback {
            let delta = match feedback {
                Feedback::Positive => self.config.feedback_step,
                Feedback::Negative => -self.config.feedback_step,
            };
            let _ = SignalRepo::adjust_recent_preferences(
                &conn,
                user.as_str(),
                delta,
                self.config.feedback_window_secs,
            )?;
        }

        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
