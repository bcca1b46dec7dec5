// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Async enforcement facade backed by Tokio.
//!
//! This module is only compiled when the `async` feature flag is enabled:
//!
//! ```toml
//! [dependencies]
//! credit-gate-core = { version = "0.1", features = ["async"] }
//! ```
//!
//! # Design
//!
//! [`AsyncEnforcer`] shares one [`Enforcer`] behind an `Arc` and runs every
//! guard on Tokio's blocking pool.  The per-account locks are synchronous
//! `parking_lot` mutexes; keeping them off the async workers means a task
//! waiting on a busy account never stalls unrelated tasks.  Async and sync
//! callers of the same `Enforcer` are serialised by the same locks.
//!
//! # Example
//!
//! ```rust,no_run
//! # #[cfg(feature = "async")]
//! # {
//! use credit_gate_core::{
//!     async_engine::AsyncEnforcer,
//!     config::Config,
//!     storage::InMemoryStorage,
//!     types::{AuthState, FeatureContext, GuardRequest, PlanTier, Role},
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let enforcer = AsyncEnforcer::new(Config::default(), InMemoryStorage::new()).unwrap();
//!
//!     let request = GuardRequest::new(
//!         "brand-1",
//!         AuthState::authenticated(Role::Brand, PlanTier::Free),
//!         FeatureContext::AdvancedAnalytics,
//!     );
//!     let result = enforcer.guard(request).await.unwrap();
//!     assert!(result.is_allowed());
//! }
//! # }
//! ```

#![cfg(feature = "async")]

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::engine::Enforcer;
use crate::error::{ConfigError, GovernanceError};
use crate::storage::Storage;
use crate::types::{Account, GuardRequest, GuardResult, PlanTier, UsageEvent, UsageFilter};

/// Cloneable async handle over a shared [`Enforcer`].
pub struct AsyncEnforcer<S: Storage + 'static> {
    inner: Arc<Enforcer<S>>,
}

impl<S: Storage + 'static> Clone for AsyncEnforcer<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: Storage + 'static> AsyncEnforcer<S> {
    pub fn new(config: Config, storage: S) -> Result<Self, ConfigError> {
        Ok(Self::from_enforcer(Arc::new(Enforcer::new(config, storage)?)))
    }

    /// Wrap an enforcer that sync callers also hold.
    pub fn from_enforcer(inner: Arc<Enforcer<S>>) -> Self {
        Self { inner }
    }

    pub fn enforcer(&self) -> &Arc<Enforcer<S>> {
        &self.inner
    }

    // -----------------------------------------------------------------------
    // Core evaluation pipeline
    // -----------------------------------------------------------------------

    /// Evaluate `request` as of the current time.
    pub async fn guard(&self, request: GuardRequest) -> Result<GuardResult, GovernanceError> {
        self.guard_at(request, Utc::now()).await
    }

    /// Evaluate `request` as of `now` on the blocking pool.
    ///
    /// A panic inside the guard is resumed on the calling task.
    pub async fn guard_at(
        &self,
        request: GuardRequest,
        now: DateTime<Utc>,
    ) -> Result<GuardResult, GovernanceError> {
        let inner = Arc::clone(&self.inner);
        match tokio::task::spawn_blocking(move || inner.guard_at(&request, now)).await {
            Ok(result) => result,
            Err(join) if join.is_panic() => std::panic::resume_unwind(join.into_panic()),
            Err(_) => Err(GovernanceError::Cancelled),
        }
    }

    // -----------------------------------------------------------------------
    // Accounts and usage
    // -----------------------------------------------------------------------

    pub async fn open_account(&self, account_id: &str, plan_tier: PlanTier) -> Account {
        self.inner.accounts.open_account(account_id, plan_tier, Utc::now())
    }

    pub async fn account(&self, account_id: &str) -> Option<Account> {
        self.inner.accounts.account(account_id)
    }

    pub async fn set_plan_tier(&self, account_id: &str, plan_tier: PlanTier) -> Result<Account, GovernanceError> {
        self.inner.accounts.set_plan_tier(account_id, plan_tier)
    }

    pub async fn grant_premium_credits(&self, account_id: &str, amount: u32) -> Result<Account, GovernanceError> {
        self.inner.accounts.grant_premium_credits(account_id, amount)
    }

    pub async fn query_usage(&self, filter: &UsageFilter) -> Vec<UsageEvent> {
        self.inner.query_usage(filter)
    }
}
