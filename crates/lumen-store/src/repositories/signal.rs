//! Signal repository — learned trigger and preference aggregates.
//!
//! Counters and scores are mutated with SQL upserts; clamping to `[0, 1]`
//! happens in the statement itself so concurrent writers cannot push a
//! score out of range.

use rusqlite::{Connection, params};

use crate::errors::Result;
use crate::row_types::{PreferenceSignalRow, TriggerSignalRow};

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Signal repository — stateless, every method takes `&Connection`.
pub struct SignalRepo;

impl SignalRepo {
    /// Record one observation of a trigger: occurrence count up by one,
    /// intensity up by `step`, capped at 1.0.
    pub fn bump_trigger(conn: &Connection, user_id: &str, label: &str, step: f64) -> Result<()> {
        let _ = conn.execute(
            "INSERT INTO trigger_signals (user_id, trigger_label, occurrences, intensity, updated_at)
             VALUES (?1, ?2, 1, MIN(1.0, ?3), ?4)
             ON CONFLICT (user_id, trigger_label) DO UPDATE SET
               occurrences = occurrences + 1,
               intensity   = MIN(1.0, intensity + ?3),
               updated_at  = ?4",
            params![user_id, label, step, now_rfc3339()],
        )?;
        Ok(())
    }

    /// Record one observation of a preference: confidence up by `step`,
    /// capped at 1.0.
    pub fn bump_preference(conn: &Connection, user_id: &str, label: &str, step: f64) -> Result<()> {
        let _ = conn.execute(
            "INSERT INTO preference_signals (user_id, preference_label, confidence, updated_at)
             VALUES (?1, ?2, MIN(1.0, ?3), ?4)
             ON CONFLICT (user_id, preference_label) DO UPDATE SET
               confidence = MIN(1.0, confidence + ?3),
               updated_at = ?4",
            params![user_id, label, step, now_rfc3339()],
        )?;
        Ok(())
    }

    /// Apply a feedback adjustment to every preference row for the user
    /// updated within the trailing `window_secs`. `delta` may be negative;
    /// results are clamped to `[0, 1]`. Returns the number of rows adjusted.
    ///
    /// `updated_at` is deliberately left untouched so repeated feedback
    /// cannot keep extending the window.
    pub fn adjust_recent_preferences(
        conn: &Connection,
        user_id: &str,
        delta: f64,
        window_secs: i64,
    ) -> Result<usize> {
        let cutoff = (chrono::Utc::now() - chrono::Duration::seconds(window_secs)).to_rfc3339();
        let changed = conn.execute(
            "UPDATE preference_signals
             SET confidence = MIN(1.0, MAX(0.0, confidence + ?2))
             WHERE user_id = ?1 AND updated_at >= ?3",
            params![user_id, delta, cutoff],
        )?;
        Ok(changed)
    }

    /// A user's trigger aggregates, strongest first.
    pub fn triggers_for(conn: &Connection, user_id: &str) -> Result<Vec<TriggerSignalRow>> {
        let mut stmt = conn.prepare(
            "SELECT user_id, trigger_label, occurrences, intensity, updated_at
             FROM trigger_signals WHERE user_id = ?1
             ORDER BY intensity DESC, trigger_label ASC",
        )?;
        let rows = stmt
            .query_map(params![user_id], |row| {
                Ok(TriggerSignalRow {
                    user_id: row.get(0)?,
                    trigger_label: row.get(1)?,
                    occurrences: row.get(2)?,
                    intensity: row.get(3)?,
                    updated_at: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// A user's preference aggregates, most confident first.
    pub fn preferences_for(conn: &Connection, user_id: &str) -> Result<Vec<PreferenceSignalRow>> {
        let mut stmt = conn.prepare(
            "SELECT user_id, preference_label, confidence, updated_at
             FROM preference_signals WHERE user_id = ?1
             ORDER BY confidence DESC, preference_label ASC",
        )?;
        let rows = stmt
            .query_map(params![user_id], |row| {
                Ok(PreferenceSignalRow {
                    user_id: row.get(0)?,
                    preference_label: row.get(1)?,
                    confidence: row.get(2)?,
                    updated_at: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
