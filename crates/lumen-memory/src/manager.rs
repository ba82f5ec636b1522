//! Conversation memory manager.
//!
//! Keeps the most recent messages verbatim (the active window) and
//! compresses everything older into a [`Summary`] once enough unsummarized
//! messages pile up.
//!
//! Failure policy: `append` surfaces store errors because losing a message
//! breaks continuity, but summarization is fail-silent — a failed or
//! unparseable summarization leaves the previous summary and coverage index
//! untouched, logs, and retries at the next threshold crossing. A turn is
//! never failed by its summary.

use chrono::{DateTime, Utc};
use lumen_core::ids::{ConversationId, UserId};
use lumen_core::messages::{ChatMessage, Role};
use lumen_store::{ConnectionPool, ConversationRepo, MessageRow};
use tracing::{debug, warn};

use crate::errors::Result;
use crate::summarizer::Summarizer;
use crate::types::{MemoryContext, Summary};

/// Windowing knobs.
#[derive(Clone, Copy, Debug)]
pub struct MemoryConfig {
    /// Recent messages kept verbatim outside the summary.
    pub active_window_size: i64,
    /// Unsummarized-message count that triggers a summarization pass.
    pub summarization_threshold: i64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            active_window_size: lumen_core::constants::ACTIVE_WINDOW_SIZE as i64,
            summarization_threshold: lumen_core::constants::SUMMARIZATION_THRESHOLD as i64,
        }
    }
}

/// Message history plus rolling summarization for one store.
pub struct MemoryManager<S: Summarizer> {
    pool: ConnectionPool,
    summarizer: S,
    config: MemoryConfig,
}

impl<S: Summarizer> MemoryManager<S> {
    /// Create a manager over an already-migrated pool.
    pub fn new(pool: ConnectionPool, summarizer: S, config: MemoryConfig) -> Self {
        Self {
            pool,
            summarizer,
            config,
        }
    }

    /// Append one message, creating the conversation on first use.
    pub fn append(
        &self,
        conversation: &ConversationId,
        user: &UserId,
        message: &ChatMessage,
    ) -> Result<()> {
        let conn = self.pool.get().map_err(lumen_store::StoreError::from)?;
        ConversationRepo::ensure(&conn, conversation.as_str(), user.as_str())?;
        let _ = ConversationRepo::append_message(
            &conn,
            conversation.as_str(),
            message.role.as_str(),
            &message.content,
        )?;
        Ok(())
    }

    /// Context for prompt composition: the stored summary (if any) plus the
    /// verbatim tail of unsummarized messages, capped at the active window.
    ///
    /// An unknown conversation yields an empty context; the first `append`
    /// will create it.
    pub fn get_context(&self, conversation: &ConversationId) -> Result<MemoryContext> {
        let conn = self.pool.get().map_err(lumen_store::StoreError::from)?;
        let Some(row) = ConversationRepo::get(&conn, conversation.as_str())? else {
            return Ok(MemoryContext::default());
        };

        let summary = row.summary_json.as_deref().and_then(|json| {
            Summary::from_json(json)
                .map_err(|e| {
                    warn!(conversation = %conversation, error = %e,
                        "stored summary failed to parse, ignoring");
                })
                .ok()
        });

        let mut rows =
            ConversationRepo::messages_from(&conn, conversation.as_str(), row.summary_up_to_index)?;
        let window = usize::try_from(self.config.active_window_size).unwrap_or(0);
        if rows.len() > window {
            rows.drain(..rows.len() - window);
        }

        Ok(MemoryContext {
            summary,
            active_messages: rows.iter().filter_map(row_to_message).collect(),
        })
    }

    /// Run a summarization pass if enough unsummarized messages have
    /// accumulated. Returns whether a new summary was stored.
    ///
    /// Fail-silent: every failure path logs and leaves the previous
    /// summary/index untouched.
    pub async fn maybe_summarize(&self, conversation: &ConversationId) -> bool {
        match self.try_summarize(conversation).await {
            Ok(stored) => stored,
            Err(e) => {
                warn!(conversation = %conversation, error = %e,
                    "summarization pass failed, keeping previous summary");
                false
            }
        }
    }

    async fn try_summarize(&self, conversation: &ConversationId) -> Result<bool> {
        let (cut, history) = {
            let conn = self.pool.get().map_err(lumen_store::StoreError::from)?;
            let Some(row) = ConversationRepo::get(&conn, conversation.as_str())? else {
                return Ok(false);
            };

            let unsummarized = row.message_count - row.summary_up_to_index;
            if unsummarized <= self.config.summarization_threshold {
                return Ok(false);
            }

            // Everything before the active window, regenerated from scratch.
            let cut = row.message_count - self.config.active_window_size;
            if cut <= row.summary_up_to_index {
                return Ok(false);
            }
            let rows = ConversationRepo::messages_in_range(&conn, conversation.as_str(), 0, cut)?;
            (cut, rows)
        };

        let messages: Vec<ChatMessage> = history.iter().filter_map(row_to_message).collect();
        let raw = self.summarizer.summarize(&messages).await?;
        let summary = Summary::from_json(&raw)?;

        let conn = self.pool.get().map_err(lumen_store::StoreError::from)?;
        ConversationRepo::replace_summary(&conn, conversation.as_str(), &summary.to_json()?, cut)?;
        debug!(conversation = %conversation, up_to = cut, "summary replaced");
        Ok(true)
    }
}

impl<S: Summarizer> std::fmt::Debug for MemoryManager<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryManager")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn row_to_message(row: &MessageRow) -> Option<ChatMessage> {
    let Some(role) = Role::parse(&row.role) else {
        warn!(message = %row.id, role = %row.role, "skipping message with unknown role");
        return None;
    };
    let timestamp = DateTime::parse_from_rfc3339(&row.created_at)
        .map_or_else(|_| Utc::now(), |t| t.with_timezone(&Utc));
    Some(ChatMessage {
        role,
        content: row.content.clone(),
        timestamp,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
