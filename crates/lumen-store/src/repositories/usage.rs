//! Usage log repository — append-only per-turn records.

use rusqlite::{Connection, params};

use crate::errors::Result;
use crate::row_types::UsageLogRow;

/// Usage log repository — stateless, every method takes `&Connection`.
pub struct UsageRepo;

impl UsageRepo {
    /// Append one usage record. Returns the new rowid.
    pub fn append(
        conn: &Connection,
        user_id: &str,
        conversation_id: Option<&str>,
        input_tokens: i64,
        output_tokens: i64,
        cost: f64,
    ) -> Result<i64> {
        let _ = conn.execute(
            "INSERT INTO usage_log
               (user_id, conversation_id, input_tokens, output_tokens, cost, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user_id,
                conversation_id,
                input_tokens,
                output_tokens,
                cost,
                chrono::Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// List a user's usage records, newest first.
    pub fn list_for_user(conn: &Connection, user_id: &str, limit: i64) -> Result<Vec<UsageLogRow>> {
        let mut stmt = conn.prepare(
            "SELECT id, user_id, conversation_id, input_tokens, output_tokens, cost, created_at
             FROM usage_log WHERE user_id = ?1
             ORDER BY id DESC LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![user_id, limit], |row| {
                Ok(UsageLogRow {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    conversation_id: row.get(2)?,
                    input_tokens: row.get(3)?,
                    output_tokens: row.get(4)?,
                    cost: row.get(5)?,
                    created_at: row.get(6)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Sum of tokens (input + output) logged for a user.
    pub fn total_tokens_for_user(conn: &Connection, user_id: &str) -> Result<i64> {
        let total: i64 = conn.query_row(
            "SELECT COALESCE(SUM(input_tokens + output_tokens), 0)
             FROM usage_log WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(total)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::run_migrations;

    fn open() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        let _ = run_migrations(&conn).unwrap();
        conn
    }

    #[test]
    fn append_and_list() {
        let conn = open();
        let id1 = UsageRepo::append(&conn, "u1", Some("c1"), 100, 250, 0.0007).unwrap();
        let id2 = UsageRepo::append(&conn, "u1", None, 40, 60, 0.0002).unwrap();
        assert!(id2 > id1);

        let rows = UsageRepo::list_for_user(&conn, "u1", 10).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, id2); // newest first
        assert_eq!(rows[1].conversation_id.as_deref(), Some("c1"));
        assert_eq!(rows[1].output_tokens, 250);
    }

    #[test]
    fn totals_are_per_user() {
        let conn = open();
        let _ = UsageRepo::append(&conn, "u1", None, 10, 20, 0.0).unwrap();
        let _ = UsageRepo::append(&conn, "u1", None, 5, 5, 0.0).unwrap();
        let _ = UsageRepo::append(&conn, "u2", None, 100, 100, 0.0).unwrap();

        assert_eq!(UsageRepo::total_tokens_for_user(&conn, "u1").unwrap(), 40);
        assert_eq!(UsageRepo::total_tokens_for_user(&conn, "u2").unwrap(), 200);
        assert_eq!(UsageRepo::total_tokens_for_user(&conn, "u3").unwrap(), 0);
    }
}
