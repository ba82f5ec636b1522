//! The usage ledger service.
//!
//! Sits on the store's account/usage repositories and adds policy: the
//! pre-flight access check, retry-on-contention for the deduct transaction,
//! credit-to-token conversion, and billing-period rollover.
//!
//! All methods are synchronous; the SQLite work behind them is short enough
//! to run inline on the turn task.

use lumen_core::constants::{MONTHLY_ALLOWANCE_TOKENS, TOKENS_PER_CREDIT};
use lumen_core::ids::{ConversationId, UserId};
use lumen_store::{AccountRepo, ConnectionPool, UsageAccountRow, UsageRepo};
use rand::Rng as _;
use tracing::{debug, warn};

use crate::errors::{LedgerError, Result};
use crate::pricing::cost_for_tokens;

/// Ledger policy knobs.
#[derive(Clone, Debug)]
pub struct LedgerConfig {
    /// Tokens granted by the plan each billing period.
    pub monthly_allowance: i64,
    /// Tokens granted per purchased credit.
    pub tokens_per_credit: i64,
    /// Attempts for a contended deduct before surfacing a conflict.
    pub max_attempts: u32,
    /// Base backoff between attempts (milliseconds), doubled each retry.
    pub retry_base_delay_ms: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            monthly_allowance: MONTHLY_ALLOWANCE_TOKENS,
            tokens_per_credit: TOKENS_PER_CREDIT,
            max_attempts: 4,
            retry_base_delay_ms: 25,
        }
    }
}

/// Result of a pre-flight access check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccessDecision {
    /// Whether the user may start a paid turn.
    pub allowed: bool,
    /// Spendable balance at check time.
    pub balance: i64,
}

/// Per-user token accounting over the shared pool.
#[derive(Clone)]
pub struct UsageLedger {
    pool: ConnectionPool,
    config: LedgerConfig,
}

impl UsageLedger {
    /// Create a ledger over an already-migrated pool.
    #[must_use]
    pub fn new(pool: ConnectionPool, config: LedgerConfig) -> Self {
        Self { pool, config }
    }

    /// Pre-flight check: denied when the spendable balance is zero or below.
    ///
    /// Callers must check this before issuing any paid model call; the cost
    /// of an unbillable call cannot be recovered afterwards. A user with no
    /// account row has no balance.
    pub fn check_access(&self, user: &UserId) -> Result<AccessDecision> {
        let conn = self.pool.get().map_err(lumen_store::StoreError::from)?;
        let balance = AccountRepo::get(&conn, user.as_str())?
            .map_or(0, |acct| acct.total_balance);
        Ok(AccessDecision {
            allowed: balance > 0,
            balance,
        })
    }

    /// Charge a completed turn: one transaction appending the usage record
    /// and splitting the deduction across the allowance and purchased pools.
    ///
    /// Retried on lock contention with exponential backoff and jitter;
    /// surfaced as [`LedgerError::Conflict`] only after every attempt fails.
    pub fn deduct(
        &self,
        user: &UserId,
        conversation: Option<&ConversationId>,
        input_tokens: i64,
        output_tokens: i64,
    ) -> Result<()> {
        let total = input_tokens + output_tokens;
        let cost = cost_for_tokens(total);

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_deduct(user, conversation, input_tokens, output_tokens, cost) {
                Ok(()) => {
                    debug!(user = %user, total, attempt, "deduct committed");
                    return Ok(());
                }
                Err(LedgerError::Store(e)) if e.is_busy() && attempt < self.config.max_attempts => {
                    let delay = self.backoff_delay(attempt);
                    warn!(user = %user, attempt, delay_ms = delay.as_millis() as u64,
                        "deduct hit lock contention, retrying");
                    std::thread::sleep(delay);
                }
                Err(LedgerError::Store(e)) if e.is_busy() => {
                    return Err(LedgerError::Conflict { attempts: attempt });
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn try_deduct(
        &self,
        user: &UserId,
        conversation: Option<&ConversationId>,
        input_tokens: i64,
        output_tokens: i64,
        cost: f64,
    ) -> Result<()> {
        let conn = self.pool.get().map_err(lumen_store::StoreError::from)?;
        let tx = conn
            .unchecked_transaction()
            .map_err(lumen_store::StoreError::from)?;

        let _ = UsageRepo::append(
            &tx,
            user.as_str(),
            conversation.map(ConversationId::as_str),
            input_tokens,
            output_tokens,
            cost,
        )?;
        AccountRepo::deduct(&tx, user.as_str(), input_tokens + output_tokens)?;

        tx.commit().map_err(lumen_store::StoreError::from)?;
        Ok(())
    }

    /// Credit a purchase. Idempotent on `payment_ref`; returns `true` when
    /// the grant was applied, `false` on duplicate delivery.
    pub fn grant_purchase(&self, user: &UserId, payment_ref: &str, credits: i64) -> Result<bool> {
        let tokens = credits * self.config.tokens_per_credit;
        let conn = self.pool.get().map_err(lumen_store::StoreError::from)?;
        let applied =
            AccountRepo::grant_purchase(&conn, user.as_str(), payment_ref, credits, tokens)?;
        if !applied {
            debug!(user = %user, payment_ref, "duplicate purchase delivery ignored");
        }
        Ok(applied)
    }

    /// Reverse a refunded purchase. Idempotent on the purchase's `refunded`
    /// flag; the debit never drives the purchased pool negative.
    pub fn reverse_refund(&self, user: &UserId, payment_ref: &str) -> Result<bool> {
        let conn = self.pool.get().map_err(lumen_store::StoreError::from)?;
        let applied = AccountRepo::reverse_refund(&conn, user.as_str(), payment_ref)?;
        Ok(applied)
    }

    /// Start a new billing period for the user.
    pub fn rollover(&self, user: &UserId) -> Result<()> {
        let conn = self.pool.get().map_err(lumen_store::StoreError::from)?;
        AccountRepo::rollover(&conn, user.as_str(), self.config.monthly_allowance)?;
        Ok(())
    }

    /// Snapshot of the user's account, if one exists.
    pub fn account(&self, user: &UserId) -> Result<Option<UsageAccountRow>> {
        let conn = self.pool.get().map_err(lumen_store::StoreError::from)?;
        Ok(AccountRepo::get(&conn, user.as_str())?)
    }

    fn backoff_delay(&self, attempt: u32) -> std::time::Duration {
        let base = self.config.retry_base_delay_ms.saturating_mul(1 << (attempt - 1));
        let jitter = rand::rng().random_range(0..=base / 2 + 1);
        std::time::Duration::from_millis(base + jitter)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_store::{ConnectionConfig, new_file, run_migrations};

    fn ledger() -> (UsageLedger, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");
        let pool = new_file(path.to_str().unwrap(), &ConnectionConfig::default()).unwrap();
        {
            let conn = pool.get().unwrap();
            let _ = run_migrations(&conn).unwrap();
        }
        (UsageLedger::new(pool, LedgerConfig::default()), dir)
    }

    // ── access check ─────────────────────────────────────────────────────

    #[test]
    fn unknown_user_is_denied() {
        let (ledger, _dir) = ledger();
        let decision = ledger.check_access(&UserId::from("u1")).unwrap();
        assert!(!decision.allowed);
        assert_eq!(decision.balance, 0);
    }

    #[test]
    fn positive_balance_is_allowed() {
        let (ledger, _dir) = ledger();
        let user = UserId::from("u1");
        ledger.rollover(&user).unwrap();
        let decision = ledger.check_access(&user).unwrap();
        assert!(decision.allowed);
        assert_eq!(decision.balance, MONTHLY_ALLOWANCE_TOKENS);
    }

    #[test]
    fn exhausted_balance_is_denied_before_any_model_call() {
        let (ledger, _dir) = ledger();
        let user = UserId::from("u1");
        ledger.rollover(&user).unwrap();
        ledger.deduct(&user, None, 0, MONTHLY_ALLOWANCE_TOKENS).unwrap();

        let decision = ledger.check_access(&user).unwrap();
        assert!(!decision.allowed);
        assert_eq!(decision.balance, 0);
    }

    // ── deduct ───────────────────────────────────────────────────────────

    #[test]
    fn deduct_writes_usage_record_and_balances_together() {
        let (ledger, _dir) = ledger();
        let user = UserId::from("u1");
        let conv = ConversationId::from("c1");
        ledger.rollover(&user).unwrap();

        ledger.deduct(&user, Some(&conv), 120, 380).unwrap();

        let acct = ledger.account(&user).unwrap().unwrap();
        assert_eq!(acct.total_balance, MONTHLY_ALLOWANCE_TOKENS - 500);
        assert_eq!(acct.allowance_used, 500);

        let conn = ledger.pool.get().unwrap();
        let rows = UsageRepo::list_for_user(&conn, "u1", 10).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].input_tokens, 120);
        assert_eq!(rows[0].output_tokens, 380);
        assert_eq!(rows[0].conversation_id.as_deref(), Some("c1"));
        assert!((rows[0].cost - cost_for_tokens(500)).abs() < 1e-12);
    }

    #[test]
    fn final_turn_may_overdraw_then_next_check_denies() {
        let (ledger, _dir) = ledger();
        let user = UserId::from("u1");
        assert!(ledger.grant_purchase(&user, "pay-1", 1).unwrap());
        ledger.deduct(&user, None, 0, 850).unwrap(); // 150 left
        assert!(ledger.check_access(&user).unwrap().allowed);

        // The in-flight turn finishes larger than the remaining balance;
        // the charge still lands in full.
        ledger.deduct(&user, None, 100, 200).unwrap();

        let acct = ledger.account(&user).unwrap().unwrap();
        assert_eq!(acct.total_balance, -150);
        assert!(!ledger.check_access(&user).unwrap().allowed);
    }

    #[test]
    fn deduct_missing_account_surfaces_error() {
        let (ledger, _dir) = ledger();
        let err = ledger.deduct(&UserId::from("nobody"), None, 10, 10).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Store(lumen_store::StoreError::AccountNotFound(_))
        ));
    }

    // ── purchases and refunds ────────────────────────────────────────────

    #[test]
    fn purchase_converts_credits_to_tokens() {
        let (ledger, _dir) = ledger();
        let user = UserId::from("u1");
        assert!(ledger.grant_purchase(&user, "pay-1", 5).unwrap());

        let acct = ledger.account(&user).unwrap().unwrap();
        assert_eq!(acct.purchased_balance, 5 * TOKENS_PER_CREDIT);
        assert_eq!(acct.total_balance, 5 * TOKENS_PER_CREDIT);
    }

    #[test]
    fn duplicate_purchase_changes_balance_once() {
        let (ledger, _dir) = ledger();
        let user = UserId::from("u1");
        assert!(ledger.grant_purchase(&user, "pay-1", 2).unwrap());
        assert!(!ledger.grant_purchase(&user, "pay-1", 2).unwrap());

        let acct = ledger.account(&user).unwrap().unwrap();
        assert_eq!(acct.total_balance, 2 * TOKENS_PER_CREDIT);
    }

    #[test]
    fn refund_after_partial_spend_clamps_at_zero() {
        let (ledger, _dir) = ledger();
        let user = UserId::from("u1");
        assert!(ledger.grant_purchase(&user, "pay-1", 1).unwrap());
        ledger.deduct(&user, None, 0, 600).unwrap(); // 400 left in the pool

        assert!(ledger.reverse_refund(&user, "pay-1").unwrap());
        assert!(!ledger.reverse_refund(&user, "pay-1").unwrap());

        let acct = ledger.account(&user).unwrap().unwrap();
        assert_eq!(acct.purchased_balance, 0);
    }

    // ── rollover ─────────────────────────────────────────────────────────

    #[test]
    fn rollover_restores_the_allowance_only() {
        let (ledger, _dir) = ledger();
        let user = UserId::from("u1");
        ledger.rollover(&user).unwrap();
        assert!(ledger.grant_purchase(&user, "pay-1", 1).unwrap());
        ledger.deduct(&user, None, 100, 900).unwrap();

        ledger.rollover(&user).unwrap();

        let acct = ledger.account(&user).unwrap().unwrap();
        assert_eq!(acct.allowance_used, 0);
        assert_eq!(acct.allowance_total, MONTHLY_ALLOWANCE_TOKENS);
        assert_eq!(acct.purchased_balance, TOKENS_PER_CREDIT);
        assert_eq!(
            acct.total_balance,
            MONTHLY_ALLOWANCE_TOKENS + TOKENS_PER_CREDIT
        );
    }
}
