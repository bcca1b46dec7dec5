// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Usage log.
//!
//! [`UsageLog`] exposes two operations only:
//!
//! * [`record`](UsageLog::record) - append one decision
//! * [`query`](UsageLog::query)   - filter past events
//!
//! The log is **recording only**.  Nothing in the engine reads it back to make
//! a decision, so a lossy or slow backend can never change an outcome.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::accounts::AccountBook;
use crate::storage::Storage;
use crate::types::{
    ClassificationResult, Decision, FeatureContext, Pool, UsageEvent, UsageFilter, UsageOutcome,
};

/// Append-only record of metered decisions.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use chrono::Utc;
/// use chrono_tz::Tz;
/// use credit_gate_core::{
///     accounts::AccountBook,
///     schedule::ResetScheduler,
///     storage::InMemoryStorage,
///     types::{ClassificationResult, Decision, FeatureContext, Pool, UsageFilter},
///     usage::UsageLog,
/// };
///
/// let book = Arc::new(AccountBook::new(
///     InMemoryStorage::new(),
///     ResetScheduler::new(7, Tz::UTC, 5),
/// ));
/// let log = UsageLog::new(book);
///
/// log.record(
///     "acct-1",
///     FeatureContext::KolSearch,
///     &ClassificationResult::unclassified(),
///     &Decision::charged(Pool::Free, 1),
///     Utc::now(),
/// );
///
/// let events = log.query(&UsageFilter::for_account("acct-1"));
/// assert_eq!(events.len(), 1);
/// assert_eq!(events[0].cost_charged, 1);
/// ```
pub struct UsageLog<S: Storage> {
    book: Arc<AccountBook<S>>,
}

impl<S: Storage> UsageLog<S> {
    pub fn new(book: Arc<AccountBook<S>>) -> Self {
        Self { book }
    }

    /// Append the outcome of one metered action and return the stored event.
    ///
    /// Denials are recorded too; they carry no cost and `Pool::None`.
    pub fn record(
        &self,
        account_id: &str,
        feature: FeatureContext,
        classification: &ClassificationResult,
        decision: &Decision,
        now: DateTime<Utc>,
    ) -> UsageEvent {
        let (cost_charged, pool_debited) = match *decision {
            Decision::Charged { pool, amount } => (amount, pool),
            Decision::AmortizedNoCharge { .. } | Decision::Denied { .. } => (0, Pool::None),
        };
        let event = UsageEvent {
            account_id: account_id.into(),
            timestamp: now,
            feature_context: feature,
            category: classification.category,
            confidence_score: classification.confidence_score,
            cost_charged,
            pool_debited,
            outcome: UsageOutcome::from(decision),
        };
        self.book.append_usage(event.clone());
        event
    }

    /// Return every event that satisfies `filter`, oldest first.
    ///
    /// ```rust
    /// use credit_gate_core::types::{FeatureContext, UsageFilter};
    ///
    /// let filter = UsageFilter {
    ///     feature: Some(FeatureContext::GeneralChat),
    ///     limit: Some(10),
    ///     ..UsageFilter::default()
    /// };
    /// ```
    pub fn query(&self, filter: &UsageFilter) -> Vec<UsageEvent> {
        self.book.query_usage(filter)
    }
}
