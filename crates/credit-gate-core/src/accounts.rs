// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Per-account serialisation over a [`Storage`] backend.
//!
//! [`AccountBook`] is shared (behind an `Arc`) by the credit ledger, the
//! contact gate, and the usage log.  It owns two things:
//!
//! * the storage backend, behind a `parking_lot::RwLock` that is only ever
//!   held for a single get or set;
//! * one `parking_lot::Mutex` per account, kept in a `DashMap`, held for the
//!   whole reset-check / price / debit sequence of a transaction.
//!
//! Two calls on the same account therefore never observe the same pre-debit
//! balance, while calls on different accounts only contend on the brief
//! storage lock.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::error::GovernanceError;
use crate::schedule::ResetScheduler;
use crate::storage::Storage;
use crate::types::{Account, PlanTier, UsageEvent, UsageFilter};

/// Registry of account records and their locks.
///
/// # Examples
///
/// ```rust
/// use chrono::Utc;
/// use chrono_tz::Tz;
/// use credit_gate_core::accounts::AccountBook;
/// use credit_gate_core::schedule::ResetScheduler;
/// use credit_gate_core::storage::InMemoryStorage;
/// use credit_gate_core::types::PlanTier;
///
/// let book = AccountBook::new(InMemoryStorage::new(), ResetScheduler::new(7, Tz::UTC, 5));
/// let account = book.open_account("acct-1", PlanTier::Free, Utc::now());
/// assert_eq!(account.free_credits, 5);
///
/// book.grant_premium_credits("acct-1", 20).unwrap();
/// assert_eq!(book.account("acct-1").unwrap().premium_credits, 20);
/// ```
pub struct AccountBook<S: Storage> {
    storage: RwLock<S>,
    slots: DashMap<String, Arc<Mutex<()>>>,
    scheduler: ResetScheduler,
}

impl<S: Storage> AccountBook<S> {
    pub fn new(storage: S, scheduler: ResetScheduler) -> Self {
        Self {
            storage: RwLock::new(storage),
            slots: DashMap::new(),
            scheduler,
        }
    }

    pub fn scheduler(&self) -> &ResetScheduler {
        &self.scheduler
    }

    // -----------------------------------------------------------------------
    // Administration
    // -----------------------------------------------------------------------

    /// Provision an account, or return the existing one unchanged.
    ///
    /// A new record starts with the daily allotment, no premium credits, and
    /// both reset stamps at `now`.
    pub fn open_account(&self, account_id: &str, plan_tier: PlanTier, now: DateTime<Utc>) -> Account {
        let slot = self.slot(account_id);
        let _held = slot.lock();

        if let Some(existing) = self.storage.read().get_account(account_id) {
            return existing;
        }
        let account = Account {
            account_id: account_id.into(),
            plan_tier,
            free_credits: self.scheduler.daily_allotment(),
            premium_credits: 0,
            general_question_counter: 0,
            daily_reset_at: now,
            monthly_contacts_used: 0,
            monthly_reset_at: now,
        };
        self.storage.write().set_account(account.clone());
        debug!(account = account_id, plan = %plan_tier, "account opened");
        account
    }

    /// Snapshot of the stored record, without applying due resets.
    pub fn account(&self, account_id: &str) -> Option<Account> {
        self.storage.read().get_account(account_id)
    }

    /// Snapshot as of `now`, persisting any reset that is due.
    pub fn account_at(&self, account_id: &str, now: DateTime<Utc>) -> Result<Account, GovernanceError> {
        self.transact(account_id, now, |account| (account.clone(), false))
    }

    pub fn set_plan_tier(&self, account_id: &str, plan_tier: PlanTier) -> Result<Account, GovernanceError> {
        self.update(account_id, |account| account.plan_tier = plan_tier)
    }

    /// Credit a purchased top-up to the premium pool.
    pub fn grant_premium_credits(&self, account_id: &str, amount: u32) -> Result<Account, GovernanceError> {
        self.update(account_id, |account| {
            account.premium_credits = account.premium_credits.saturating_add(amount);
        })
    }

    // -----------------------------------------------------------------------
    // Transactions
    // -----------------------------------------------------------------------

    /// Run `apply` on the account while holding its lock.
    ///
    /// Due resets are applied before `apply` sees the record.  The closure
    /// returns its result and whether the record should be written back; a
    /// reset is written back either way.
    pub(crate) fn transact<R>(
        &self,
        account_id: &str,
        now: DateTime<Utc>,
        apply: impl FnOnce(&mut Account) -> (R, bool),
    ) -> Result<R, GovernanceError> {
        self.transact_then(account_id, now, apply, |_| {})
    }

    /// As [`transact`](Self::transact), then run `after` on the result before
    /// the account lock is released.
    pub(crate) fn transact_then<R>(
        &self,
        account_id: &str,
        now: DateTime<Utc>,
        apply: impl FnOnce(&mut Account) -> (R, bool),
        after: impl FnOnce(&R),
    ) -> Result<R, GovernanceError> {
        let slot = self.slot(account_id);
        let _held = slot.lock();

        let mut account = self
            .storage
            .read()
            .get_account(account_id)
            .ok_or_else(|| GovernanceError::UnknownAccount(account_id.into()))?;

        let reset = self.scheduler.apply_due_resets(&mut account, now);
        let (result, commit) = apply(&mut account);
        if reset || commit {
            self.storage.write().set_account(account);
        }
        after(&result);
        Ok(result)
    }

    /// Locked mutation that does not touch the metered pools.
    fn update(
        &self,
        account_id: &str,
        mutate: impl FnOnce(&mut Account),
    ) -> Result<Account, GovernanceError> {
        let slot = self.slot(account_id);
        let _held = slot.lock();

        let mut account = self
            .storage
            .read()
            .get_account(account_id)
            .ok_or_else(|| GovernanceError::UnknownAccount(account_id.into()))?;
        mutate(&mut account);
        self.storage.write().set_account(account.clone());
        Ok(account)
    }

    fn slot(&self, account_id: &str) -> Arc<Mutex<()>> {
        if let Some(slot) = self.slots.get(account_id) {
            return Arc::clone(&slot);
        }
        Arc::clone(&self.slots.entry(account_id.to_owned()).or_default())
    }

    // -----------------------------------------------------------------------
    // Usage log and storage access
    // -----------------------------------------------------------------------

    pub(crate) fn append_usage(&self, event: UsageEvent) {
        self.storage.write().append_usage(event);
    }

    pub(crate) fn query_usage(&self, filter: &UsageFilter) -> Vec<UsageEvent> {
        self.storage.read().query_usage(filter)
    }

    /// Run `inspect` against the backend under a shared lock.
    pub fn with_storage<R>(&self, inspect: impl FnOnce(&S) -> R) -> R {
        inspect(&self.storage.read())
    }
}
