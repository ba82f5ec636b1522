//! Conversation repository — messages, counters, and the summary swap.
//!
//! Message positions are assigned from the conversation's `message_count`
//! counter inside the append transaction, so `seq` is dense and gap-free
//! per conversation. The summary swap writes `summary_json` and
//! `summary_up_to_index` in one statement; readers never observe a summary
//! without its matching index.

use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

use crate::errors::{Result, StoreError};
use crate::row_types::{ConversationRow, MessageRow};

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Conversation repository — stateless, every method takes `&Connection`.
pub struct ConversationRepo;

impl ConversationRepo {
    /// Create the conversation row if it does not exist.
    pub fn ensure(conn: &Connection, conversation_id: &str, user_id: &str) -> Result<()> {
        let now = now_rfc3339();
        let _ = conn.execute(
            "INSERT OR IGNORE INTO conversations (id, user_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)",
            params![conversation_id, user_id, now],
        )?;
        Ok(())
    }

    /// Fetch a conversation by id.
    pub fn get(conn: &Connection, conversation_id: &str) -> Result<Option<ConversationRow>> {
        let row = conn
            .query_row(
                "SELECT id, user_id, summary_json, summary_up_to_index, message_count,
                        created_at, updated_at
                 FROM conversations WHERE id = ?1",
                params![conversation_id],
                |row| {
                    Ok(ConversationRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        summary_json: row.get(2)?,
                        summary_up_to_index: row.get(3)?,
                        message_count: row.get(4)?,
                        created_at: row.get(5)?,
                        updated_at: row.get(6)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    /// Append a message at the next position.
    ///
    /// # Errors
    ///
    /// [`StoreError::ConversationNotFound`] if the conversation row is
    /// missing.
    pub fn append_message(
        conn: &Connection,
        conversation_id: &str,
        role: &str,
        content: &str,
    ) -> Result<MessageRow> {
        let tx = conn.unchecked_transaction()?;
        let now = now_rfc3339();

        let seq: i64 = tx
            .query_row(
                "SELECT message_count FROM conversations WHERE id = ?1",
                params![conversation_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| StoreError::ConversationNotFound(conversation_id.to_owned()))?;

        let id = format!("msg_{}", Uuid::now_v7());
        let _ = tx.execute(
            "INSERT INTO messages (id, conversation_id, seq, role, content, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![id, conversation_id, seq, role, content, now],
        )?;
        let _ = tx.execute(
            "UPDATE conversations SET message_count = message_count + 1, updated_at = ?2
             WHERE id = ?1",
            params![conversation_id, now],
        )?;

        tx.commit()?;
        Ok(MessageRow {
            id,
            conversation_id: conversation_id.to_owned(),
            seq,
            role: role.to_owned(),
            content: content.to_owned(),
            created_at: now,
        })
    }

    /// Messages at positions `[from_seq, ..)` in order.
    pub fn messages_from(
        conn: &Connection,
        conversation_id: &str,
        from_seq: i64,
    ) -> Result<Vec<MessageRow>> {
        Self::messages_in_range(conn, conversation_id, from_seq, i64::MAX)
    }

    /// Messages at positions `[from_seq, to_seq)` in order.
    pub fn messages_in_range(
        conn: &Connection,
        conversation_id: &str,
        from_seq: i64,
        to_seq: i64,
    ) -> Result<Vec<MessageRow>> {
        let mut stmt = conn.prepare(
            "SELECT id, conversation_id, seq, role, content, created_at
             FROM messages
             WHERE conversation_id = ?1 AND seq >= ?2 AND seq < ?3
             ORDER BY seq ASC",
        )?;
        let rows = stmt
            .query_map(params![conversation_id, from_seq, to_seq], |row| {
                Ok(MessageRow {
                    id: row.get(0)?,
                    conversation_id: row.get(1)?,
                    seq: row.get(2)?,
                    role: row.get(3)?,
                    content: row.get(4)?,
                    created_at: row.get(5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Replace the stored summary wholesale and advance the coverage index.
    ///
    /// # Errors
    ///
    /// [`StoreError::ConversationNotFound`] if the conversation row is
    /// missing.
    pub fn replace_summary(
        conn: &Connection,
        conversation_id: &str,
        summary_json: &str,
        up_to_index: i64,
    ) -> Result<()> {
        let changed = conn.execute(
            "UPDATE conversations SET
               summary_json = ?2, summary_up_to_index = ?3, updated_at = ?4
             WHERE id = ?1",
            params![conversation_id, summary_json, up_to_index, now_rfc3339()],
        )?;
        if changed == 0 {
            return Err(StoreError::ConversationNotFound(conversation_id.to_owned()));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
