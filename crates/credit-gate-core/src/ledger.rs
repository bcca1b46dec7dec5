// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Credit ledger.
//!
//! [`CreditLedger`] exposes one metered operation:
//!
//! * [`charge`](CreditLedger::charge) - reset if due, resolve the price, debit
//!
//! The three steps run inside the account's lock.  Pricing is computed on a
//! draft copy of the record and only committed for non-denied outcomes, so a
//! refused amortized charge also rolls back its counter increment.
//!
//! Pricing rules, in order:
//!
//! 1. `Pool::None` - `Charged(None, 0)`, nothing touched.
//! 2. `Price::PerQuestions` - bump the general-question counter; the Nth
//!    bump debits one credit and clears the counter.  Premium accounts are
//!    never metered on the free pool (`AmortizedNoCharge`, no bump).
//! 3. `Price::Flat(n)` - premium pool: debit `premium_credits` on any tier.
//!    Free pool: premium accounts pass at no cost, free accounts debit
//!    `free_credits`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::accounts::AccountBook;
use crate::config::Config;
use crate::error::{ConfigError, GovernanceError};
use crate::policy::{Price, ResolvedCost};
use crate::storage::Storage;
use crate::types::{
    Account, ClassificationResult, Decision, DenyReason, FeatureContext, PlanTier, Pool,
};

/// Applies metered charges to accounts held in an [`AccountBook`].
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use chrono::Utc;
/// use credit_gate_core::{
///     accounts::AccountBook,
///     config::Config,
///     ledger::CreditLedger,
///     schedule::ResetScheduler,
///     storage::InMemoryStorage,
///     types::{ClassificationResult, Decision, FeatureContext, PlanTier, Pool},
/// };
///
/// let config = Config::default();
/// let book = Arc::new(AccountBook::new(
///     InMemoryStorage::new(),
///     ResetScheduler::from_config(&config),
/// ));
/// let ledger = CreditLedger::new(config, Arc::clone(&book)).unwrap();
///
/// let now = Utc::now();
/// book.open_account("acct-1", PlanTier::Free, now);
///
/// let decision = ledger
///     .charge_at("acct-1", FeatureContext::KolSearch, &ClassificationResult::unclassified(), now)
///     .unwrap();
/// assert_eq!(decision, Decision::Charged { pool: Pool::Free, amount: 1 });
/// ```
pub struct CreditLedger<S: Storage> {
    config: Config,
    book: Arc<AccountBook<S>>,
}

impl<S: Storage> CreditLedger<S> {
    /// Create a ledger over `book`, validating `config` first.
    pub fn new(config: Config, book: Arc<AccountBook<S>>) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config, book })
    }

    /// Charge `feature` to the account as of the current time.
    pub fn charge(
        &self,
        account_id: &str,
        feature: FeatureContext,
        classification: &ClassificationResult,
    ) -> Result<Decision, GovernanceError> {
        self.charge_at(account_id, feature, classification, Utc::now())
    }

    /// Charge `feature` to the account as of `now`.
    ///
    /// Contact features are refused with [`GovernanceError::ContactFeature`];
    /// they are priced by the [`ContactGate`](crate::contact::ContactGate).
    pub fn charge_at(
        &self,
        account_id: &str,
        feature: FeatureContext,
        classification: &ClassificationResult,
        now: DateTime<Utc>,
    ) -> Result<Decision, GovernanceError> {
        self.charge_with_tier(account_id, feature, classification, now, |_| {})
            .map(|(decision, _)| decision)
    }

    /// As [`charge_at`](Self::charge_at), also reporting the account's tier at
    /// the moment of the decision.  `on_decision` runs under the account lock.
    pub(crate) fn charge_with_tier(
        &self,
        account_id: &str,
        feature: FeatureContext,
        classification: &ClassificationResult,
        now: DateTime<Utc>,
        on_decision: impl FnOnce(&Decision),
    ) -> Result<(Decision, PlanTier), GovernanceError> {
        if feature.contact_target().is_some() {
            return Err(GovernanceError::ContactFeature(feature));
        }

        let outcome = self.book.transact_then(account_id, now, |account| {
            let plan = account.plan_tier;
            let cost = match self.config.cost_table.resolve(feature, plan, classification) {
                Some(cost) => cost,
                None => {
                    let missing = ConfigError::MissingPolicyEntry { feature, plan };
                    return (Err(GovernanceError::Config(missing)), false);
                }
            };

            let mut draft = account.clone();
            let decision = match settle(&mut draft, cost, self.config.general_questions_per_credit) {
                Ok(decision) => decision,
                Err(error) => return (Err(GovernanceError::Config(error)), false),
            };
            let commit = !decision.is_denied();
            if commit {
                *account = draft;
            }
            (Ok((decision, plan)), commit)
        }, |outcome| {
            if let Ok((decision, _)) = outcome {
                on_decision(decision);
            }
        })?;

        if let Ok((decision, plan)) = &outcome {
            debug!(account = account_id, %feature, %plan, ?decision, "credit charge");
        }
        outcome
    }

    pub fn book(&self) -> &Arc<AccountBook<S>> {
        &self.book
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

// ---------------------------------------------------------------------------
// Pricing
// ---------------------------------------------------------------------------

/// Apply `cost` to `account` in place and report the outcome.
///
/// On a denial the record may have been partially modified; callers work on a
/// draft and discard it.  The contact pool is metered by the contact gate and
/// is refused here.
pub(crate) fn settle(
    account: &mut Account,
    cost: ResolvedCost,
    questions_per_credit: u32,
) -> Result<Decision, ConfigError> {
    let decision = match (cost.pool, cost.price) {
        (Pool::Contact, _) => {
            return Err(ConfigError::invalid(
                "cost_table",
                "the contact pool can only be debited by the contact gate",
            ))
        }
        (Pool::None, _) => Decision::charged(Pool::None, 0),
        (pool, Price::PerQuestions) => settle_amortized(account, pool, questions_per_credit),
        (pool, Price::Flat(amount)) => settle_flat(account, pool, amount),
    };
    Ok(decision)
}

fn settle_amortized(account: &mut Account, pool: Pool, questions_per_credit: u32) -> Decision {
    if account.plan_tier == PlanTier::Premium && pool == Pool::Free {
        return Decision::AmortizedNoCharge {
            counter: account.general_question_counter,
        };
    }

    let counter = account.general_question_counter + 1;
    if counter < questions_per_credit {
        account.general_question_counter = counter;
        return Decision::AmortizedNoCharge { counter };
    }

    match debit(account, pool, 1) {
        Ok(()) => {
            account.general_question_counter = 0;
            Decision::charged(pool, 1)
        }
        Err(reason) => Decision::denied(reason),
    }
}

fn settle_flat(account: &mut Account, pool: Pool, amount: u32) -> Decision {
    if pool == Pool::Free && account.plan_tier == PlanTier::Premium {
        return Decision::charged(Pool::Free, 0);
    }
    match debit(account, pool, amount) {
        Ok(()) => Decision::charged(pool, amount),
        Err(reason) => Decision::denied(reason),
    }
}

/// Subtract `amount` from a credit pool, refusing instead of clamping.
fn debit(account: &mut Account, pool: Pool, amount: u32) -> Result<(), DenyReason> {
    let balance = match pool {
        Pool::Free => &mut account.free_credits,
        Pool::Premium => &mut account.premium_credits,
        Pool::Contact | Pool::None => return Ok(()),
    };
    match balance.checked_sub(amount) {
        Some(rest) => {
            *balance = rest;
            Ok(())
        }
        None => Err(DenyReason::InsufficientCredits {
            pool,
            required: amount,
            available: *balance,
        }),
    }
}
