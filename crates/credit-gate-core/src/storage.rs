// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Storage abstraction for the metering engine.
//!
//! The [`Storage`] trait is the single interface between the engine and any
//! persistence layer.  This crate ships [`InMemoryStorage`] for development
//! and testing; the file-backed implementation lives in `credit-gate-std`.
//!
//! Storage is deliberately dumb: it never locks, never validates, and never
//! resets.  The [`AccountBook`](crate::accounts::AccountBook) serialises
//! every read-modify-write per account before it reaches a backend.
//!
//! # Implementing `Storage`
//!
//! ```rust
//! use credit_gate_core::storage::Storage;
//! use credit_gate_core::types::{Account, UsageEvent, UsageFilter};
//!
//! struct MyStorage;
//!
//! impl Storage for MyStorage {
//!     fn get_account(&self, _account_id: &str) -> Option<Account> { None }
//!     fn set_account(&mut self, _account: Account) {}
//!     fn append_usage(&mut self, _event: UsageEvent) {}
//!     fn query_usage(&self, _filter: &UsageFilter) -> Vec<UsageEvent> { Vec::new() }
//! }
//! ```

use hashbrown::HashMap;

use crate::types::{Account, UsageEvent, UsageFilter};

// ---------------------------------------------------------------------------
// Storage trait
// ---------------------------------------------------------------------------

/// Pluggable persistence interface.
///
/// Implementations MUST be `Send + Sync` so the engine can be shared across
/// threads.
pub trait Storage: Send + Sync {
    // ------------------------------------------------------------------
    // Accounts
    // ------------------------------------------------------------------

    /// Retrieve the account record keyed by `account_id`, if any.
    fn get_account(&self, account_id: &str) -> Option<Account>;

    /// Persist or overwrite the record keyed by `account.account_id`.
    fn set_account(&mut self, account: Account);

    // ------------------------------------------------------------------
    // Usage log
    // ------------------------------------------------------------------

    /// Append an immutable usage event.
    fn append_usage(&mut self, event: UsageEvent);

    /// Return all usage events that satisfy `filter`, oldest first.
    fn query_usage(&self, filter: &UsageFilter) -> Vec<UsageEvent>;
}

// ---------------------------------------------------------------------------
// InMemoryStorage
// ---------------------------------------------------------------------------

/// A volatile [`Storage`] implementation backed by [`hashbrown::HashMap`].
///
/// # Examples
///
/// ```rust
/// use chrono::Utc;
/// use credit_gate_core::storage::{InMemoryStorage, Storage};
/// use credit_gate_core::types::{Account, PlanTier};
///
/// let mut store = InMemoryStorage::new();
/// let now = Utc::now();
/// store.set_account(Account {
///     account_id: "acct-1".into(),
///     plan_tier: PlanTier::Free,
///     free_credits: 5,
///     premium_credits: 0,
///     general_question_counter: 0,
///     daily_reset_at: now,
///     monthly_contacts_used: 0,
///     monthly_reset_at: now,
/// });
/// assert_eq!(store.get_account("acct-1").unwrap().free_credits, 5);
/// assert!(store.get_account("acct-2").is_none());
/// ```
#[derive(Debug, Default, Clone)]
pub struct InMemoryStorage {
    accounts: HashMap<String, Account>,
    usage: Vec<UsageEvent>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for InMemoryStorage {
    fn get_account(&self, account_id: &str) -> Option<Account> {
        self.accounts.get(account_id).cloned()
    }

    fn set_account(&mut self, account: Account) {
        self.accounts.insert(account.account_id.clone(), account);
    }

    fn append_usage(&mut self, event: UsageEvent) {
        self.usage.push(event);
    }

    fn query_usage(&self, filter: &UsageFilter) -> Vec<UsageEvent> {
        self.usage
            .iter()
            .filter(|event| filter.matches(event))
            .take(filter.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }
}
