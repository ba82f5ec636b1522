//! Usage account repository — balances, purchases, refunds, rollover.
//!
//! Every balance mutation is a single SQL `UPDATE` whose `SET` expressions
//! all read the pre-update row, so the allowance-first pool split commits
//! atomically even under concurrent writers. Nothing here does
//! read-modify-write in Rust.

use rusqlite::{Connection, OptionalExtension, params};

use crate::errors::{Result, StoreError};
use crate::row_types::{PurchaseRow, UsageAccountRow};

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Account repository — stateless, every method takes `&Connection`.
pub struct AccountRepo;

impl AccountRepo {
    /// Fetch a user's account, if one exists.
    pub fn get(conn: &Connection, user_id: &str) -> Result<Option<UsageAccountRow>> {
        let row = conn
            .query_row(
                "SELECT user_id, allowance_total, allowance_used, purchased_balance,
                        total_balance, updated_at
                 FROM usage_accounts WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok(UsageAccountRow {
                        user_id: row.get(0)?,
                        allowance_total: row.get(1)?,
                        allowance_used: row.get(2)?,
                        purchased_balance: row.get(3)?,
                        total_balance: row.get(4)?,
                        updated_at: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    /// Create an empty account row if none exists.
    pub fn ensure(conn: &Connection, user_id: &str) -> Result<()> {
        let _ = conn.execute(
            "INSERT OR IGNORE INTO usage_accounts (user_id, updated_at) VALUES (?1, ?2)",
            params![user_id, now_rfc3339()],
        )?;
        Ok(())
    }

    /// Deduct `total_tokens` from the account: allowance first, spill to the
    /// purchased pool, `total_balance` always decremented by the full amount.
    ///
    /// One statement; the split is computed from the pre-update row.
    ///
    /// # Errors
    ///
    /// [`StoreError::AccountNotFound`] if the user has no account row.
    pub fn deduct(conn: &Connection, user_id: &str, total_tokens: i64) -> Result<()> {
        let changed = conn.execute(
            "UPDATE usage_accounts SET
               allowance_used    = allowance_used
                                   + MIN(MAX(allowance_total - allowance_used, 0), ?2),
               purchased_balance = purchased_balance
                                   - MAX(?2 - MAX(allowance_total - allowance_used, 0), 0),
               total_balance     = total_balance - ?2,
               updated_at        = ?3
             WHERE user_id = ?1",
            params![user_id, total_tokens, now_rfc3339()],
        )?;
        if changed == 0 {
            return Err(StoreError::AccountNotFound(user_id.to_owned()));
        }
        Ok(())
    }

    /// Record a purchase and credit the purchased pool.
    ///
    /// Idempotent on `payment_ref`: a duplicate delivery inserts nothing and
    /// credits nothing. Returns `true` if the grant was applied, `false` if
    /// it was a duplicate.
    pub fn grant_purchase(
        conn: &Connection,
        user_id: &str,
        payment_ref: &str,
        credits: i64,
        tokens_granted: i64,
    ) -> Result<bool> {
        let tx = conn.unchecked_transaction()?;
        let now = now_rfc3339();

        let _ = tx.execute(
            "INSERT OR IGNORE INTO usage_accounts (user_id, updated_at) VALUES (?1, ?2)",
            params![user_id, now],
        )?;
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO purchases
               (payment_ref, user_id, credits, tokens_granted, refunded, created_at)
             VALUES (?1, ?2, ?3, ?4, 0, ?5)",
            params![payment_ref, user_id, credits, tokens_granted, now],
        )?;

        if inserted == 1 {
            let _ = tx.execute(
                "UPDATE usage_accounts SET
                   purchased_balance = purchased_balance + ?2,
                   total_balance     = total_balance + ?2,
                   updated_at        = ?3
                 WHERE user_id = ?1",
                params![user_id, tokens_granted, now],
            )?;
        }

        tx.commit()?;
        Ok(inserted == 1)
    }

    /// Reverse a purchase after an upstream refund.
    ///
    /// Idempotent: the `refunded` flag is flipped in the same statement that
    /// guards it, so a second delivery matches zero rows. The debit is
    /// clamped to `min(tokens_granted, max(purchased_balance, 0))` so a
    /// refund alone never drives the purchased pool negative. Returns `true`
    /// if the reversal was applied.
    pub fn reverse_refund(conn: &Connection, user_id: &str, payment_ref: &str) -> Result<bool> {
        let tx = conn.unchecked_transaction()?;

        let flipped = tx.execute(
            "UPDATE purchases SET refunded = 1
             WHERE payment_ref = ?1 AND user_id = ?2 AND refunded = 0",
            params![payment_ref, user_id],
        )?;
        if flipped == 0 {
            tx.commit()?;
            return Ok(false);
        }

        let tokens_granted: i64 = tx.query_row(
            "SELECT tokens_granted FROM purchases WHERE payment_ref = ?1",
            params![payment_ref],
            |row| row.get(0),
        )?;

        let _ = tx.execute(
            "UPDATE usage_accounts SET
               purchased_balance = purchased_balance
                                   - MIN(?2, MAX(purchased_balance, 0)),
               total_balance     = total_balance
                                   - MIN(?2, MAX(purchased_balance, 0)),
               updated_at        = ?3
             WHERE user_id = ?1",
            params![user_id, tokens_granted, now_rfc3339()],
        )?;

        tx.commit()?;
        Ok(true)
    }

    /// Start a new billing period: reset the allowance, leave the purchased
    /// pool alone, recompute `total_balance`.
    pub fn rollover(conn: &Connection, user_id: &str, monthly_grant: i64) -> Result<()> {
        let now = now_rfc3339();
        let _ = conn.execute(
            "INSERT OR IGNORE INTO usage_accounts (user_id, updated_at) VALUES (?1, ?2)",
            params![user_id, now],
        )?;
        let _ = conn.execute(
            "UPDATE usage_accounts SET
               allowance_total = ?2,
               allowance_used  = 0,
               total_balance   = ?2 + purchased_balance,
               updated_at      = ?3
             WHERE user_id = ?1",
            params![user_id, monthly_grant, now],
        )?;
        Ok(())
    }

    /// Fetch a purchase by payment reference.
    pub fn get_purchase(conn: &Connection, payment_ref: &str) -> Result<Option<PurchaseRow>> {
        let row = conn
            .query_row(
                "SELECT payment_ref, user_id, credits, tokens_granted, refunded, created_at
                 FROM purchases WHERE payment_ref = ?1",
                params![payment_ref],
                |row| {
                    Ok(PurchaseRow {
                        payment_ref: row.get(0)?,
                        user_id: row.get(1)?,
                        credits: row.get(2)?,
                        tokens_granted: row.get(3)?,
                        refunded: row.get::<_, i64>(4)? != 0,
                        created_at: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
