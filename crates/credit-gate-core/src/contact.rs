// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Contact quota gate.
//!
//! Contact is asymmetric:
//!
//! * **Brand → KOL** consumes the monthly contact quota of the brand's plan.
//!   Invitations do not apply in this direction.
//! * **KOL → Brand** is free when the KOL was invited; otherwise it is priced
//!   from the `contact_brand` row of the cost table like any credit charge.
//! * Same-role contact is refused.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::accounts::AccountBook;
use crate::config::Config;
use crate::error::{ConfigError, GovernanceError};
use crate::ledger::settle;
use crate::policy::{Price, ResolvedCost};
use crate::storage::Storage;
use crate::types::{
    Account, ClassificationResult, Decision, DenyReason, FeatureContext, PlanTier, Pool, Role,
};

/// Admits or refuses contact attempts between brands and KOLs.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use chrono::Utc;
/// use credit_gate_core::{
///     accounts::AccountBook,
///     config::Config,
///     contact::ContactGate,
///     schedule::ResetScheduler,
///     storage::InMemoryStorage,
///     types::{Decision, PlanTier, Pool, Role},
/// };
///
/// let config = Config::default();
/// let book = Arc::new(AccountBook::new(
///     InMemoryStorage::new(),
///     ResetScheduler::from_config(&config),
/// ));
/// let gate = ContactGate::new(config, Arc::clone(&book)).unwrap();
///
/// let now = Utc::now();
/// book.open_account("brand-1", PlanTier::Free, now);
///
/// let decision = gate
///     .attempt_contact_at("brand-1", Role::Brand, Role::Kol, false, now)
///     .unwrap();
/// assert_eq!(decision, Decision::Charged { pool: Pool::Contact, amount: 1 });
/// assert_eq!(book.account("brand-1").unwrap().monthly_contacts_used, 1);
/// ```
pub struct ContactGate<S: Storage> {
    config: Config,
    book: Arc<AccountBook<S>>,
}

impl<S: Storage> ContactGate<S> {
    pub fn new(config: Config, book: Arc<AccountBook<S>>) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config, book })
    }

    /// Attempt a contact as of the current time.
    pub fn attempt_contact(
        &self,
        account_id: &str,
        caller: Role,
        target: Role,
        was_invited: bool,
    ) -> Result<Decision, GovernanceError> {
        self.attempt_contact_at(account_id, caller, target, was_invited, Utc::now())
    }

    /// Attempt a contact as of `now`.
    ///
    /// Monthly and daily resets due for the caller's account are applied
    /// first, under the same lock as the quota check.
    pub fn attempt_contact_at(
        &self,
        account_id: &str,
        caller: Role,
        target: Role,
        was_invited: bool,
        now: DateTime<Utc>,
    ) -> Result<Decision, GovernanceError> {
        self.attempt_with_tier(account_id, caller, target, was_invited, now, |_| {})
            .map(|(decision, _)| decision)
    }

    /// `on_decision` runs under the account lock.
    pub(crate) fn attempt_with_tier(
        &self,
        account_id: &str,
        caller: Role,
        target: Role,
        was_invited: bool,
        now: DateTime<Utc>,
        on_decision: impl FnOnce(&Decision),
    ) -> Result<(Decision, PlanTier), GovernanceError> {
        let outcome = self.book.transact_then(account_id, now, |account| {
            let plan = account.plan_tier;
            let decided = match (caller, target) {
                (Role::Brand, Role::Kol) => self.contact_kol(account),
                (Role::Kol, Role::Brand) if was_invited => Ok(Decision::charged(Pool::None, 0)),
                (Role::Kol, Role::Brand) => self.contact_brand(account),
                _ => Ok(Decision::denied(DenyReason::ContactNotPermitted { caller, target })),
            };
            match decided {
                Ok(decision) => {
                    let commit = !decision.is_denied();
                    (Ok((decision, plan)), commit)
                }
                Err(error) => (Err(error), false),
            }
        }, |outcome| {
            if let Ok((decision, _)) = outcome {
                on_decision(decision);
            }
        })?;

        if let Ok((decision, plan)) = &outcome {
            debug!(account = account_id, %caller, %target, was_invited, %plan, ?decision, "contact attempt");
        }
        outcome
    }

    pub fn book(&self) -> &Arc<AccountBook<S>> {
        &self.book
    }

    // -----------------------------------------------------------------------
    // Directions
    // -----------------------------------------------------------------------

    fn contact_kol(&self, account: &mut Account) -> Result<Decision, GovernanceError> {
        let cost = self.resolve(FeatureContext::ContactKol, account.plan_tier)?;
        let step = match cost.price {
            Price::Flat(units) => units,
            Price::PerQuestions => {
                return Err(GovernanceError::Config(ConfigError::invalid(
                    "cost_table",
                    "'contact_kol' must have a flat price",
                )))
            }
        };
        let used = account.monthly_contacts_used;
        let limit = self.config.monthly_contact_limit(account.plan_tier);
        if used.saturating_add(step) > limit {
            return Ok(Decision::denied(DenyReason::MonthlyQuotaExceeded { used, limit }));
        }
        account.monthly_contacts_used = used + step;
        Ok(Decision::charged(Pool::Contact, step))
    }

    /// Uninvited outreach to a brand, priced like a flat credit charge.
    fn contact_brand(&self, account: &mut Account) -> Result<Decision, GovernanceError> {
        let cost = self.resolve(FeatureContext::ContactBrand, account.plan_tier)?;
        let mut draft = account.clone();
        let decision = settle(&mut draft, cost, self.config.general_questions_per_credit)?;
        if !decision.is_denied() {
            *account = draft;
        }
        Ok(decision)
    }

    fn resolve(&self, feature: FeatureContext, plan: PlanTier) -> Result<ResolvedCost, GovernanceError> {
        self.config
            .cost_table
            .resolve(feature, plan, &ClassificationResult::unclassified())
            .ok_or(GovernanceError::Config(ConfigError::MissingPolicyEntry { feature, plan }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::ResetScheduler;
    use crate::storage::InMemoryStorage;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
    }

    fn gate() -> ContactGate<InMemoryStorage> {
        let config = Config::default();
        let book = Arc::new(AccountBook::new(
            InMemoryStorage::new(),
            ResetScheduler::from_config(&config),
        ));
        ContactGate::new(config, book).unwrap()
    }

    fn open(gate: &ContactGate<InMemoryStorage>, id: &str, plan: PlanTier, free: u32) {
        gate.book().open_account(id, plan, now());
        gate.book()
            .transact(id, now(), |account| {
                account.free_credits = free;
                ((), true)
            })
            .unwrap();
    }

    #[test]
    fn test_free_brand_stops_at_monthly_ceiling() {
        let gate = gate();
        open(&gate, "brand-1", PlanTier::Free, 5);

        for _ in 0..10 {
            let decision = gate
                .attempt_contact_at("brand-1", Role::Brand, Role::Kol, false, now())
                .unwrap();
            assert_eq!(decision, Decision::charged(Pool::Contact, 1));
        }
        let eleventh = gate
            .attempt_contact_at("brand-1", Role::Brand, Role::Kol, false, now())
            .unwrap();
        assert_eq!(
            eleventh,
            Decision::denied(DenyReason::MonthlyQuotaExceeded { used: 10, limit: 10 })
        );
        assert_eq!(gate.book().account("brand-1").unwrap().monthly_contacts_used, 10);
    }

    #[test]
    fn test_quota_clears_at_month_boundary() {
        let gate = gate();
        open(&gate, "brand-1", PlanTier::Free, 5);
        for _ in 0..10 {
            gate.attempt_contact_at("brand-1", Role::Brand, Role::Kol, false, now())
                .unwrap();
        }

        let next_month = Utc.with_ymd_and_hms(2026, 4, 1, 0, 5, 0).unwrap();
        let decision = gate
            .attempt_contact_at("brand-1", Role::Brand, Role::Kol, false, next_month)
            .unwrap();
        assert_eq!(decision, Decision::charged(Pool::Contact, 1));
        assert_eq!(gate.book().account("brand-1").unwrap().monthly_contacts_used, 1);
    }

    #[test]
    fn test_premium_brand_has_higher_ceiling() {
        let gate = gate();
        open(&gate, "brand-1", PlanTier::Premium, 0);
        for _ in 0..50 {
            assert!(!gate
                .attempt_contact_at("brand-1", Role::Brand, Role::Kol, false, now())
                .unwrap()
                .is_denied());
        }
        assert!(gate
            .attempt_contact_at("brand-1", Role::Brand, Role::Kol, false, now())
            .unwrap()
            .is_denied());
    }

    #[test]
    fn test_invitation_does_not_lift_brand_quota() {
        let gate = gate();
        open(&gate, "brand-1", PlanTier::Free, 5);
        gate.attempt_contact_at("brand-1", Role::Brand, Role::Kol, true, now())
            .unwrap();
        assert_eq!(gate.book().account("brand-1").unwrap().monthly_contacts_used, 1);
    }

    #[test]
    fn test_invited_kol_never_pays() {
        let gate = gate();
        open(&gate, "kol-1", PlanTier::Free, 0);
        for _ in 0..3 {
            let decision = gate
                .attempt_contact_at("kol-1", Role::Kol, Role::Brand, true, now())
                .unwrap();
            assert_eq!(decision, Decision::charged(Pool::None, 0));
        }
        let account = gate.book().account("kol-1").unwrap();
        assert_eq!(account.free_credits, 0);
        assert_eq!(account.monthly_contacts_used, 0);
    }

    #[test]
    fn test_uninvited_kol_pays_flat_credit() {
        let gate = gate();
        open(&gate, "kol-1", PlanTier::Free, 1);

        let first = gate
            .attempt_contact_at("kol-1", Role::Kol, Role::Brand, false, now())
            .unwrap();
        assert_eq!(first, Decision::charged(Pool::Free, 1));

        let second = gate
            .attempt_contact_at("kol-1", Role::Kol, Role::Brand, false, now())
            .unwrap();
        assert_eq!(
            second,
            Decision::denied(DenyReason::InsufficientCredits {
                pool: Pool::Free,
                required: 1,
                available: 0
            })
        );
    }

    #[test]
    fn test_same_role_contact_refused() {
        let gate = gate();
        open(&gate, "brand-1", PlanTier::Premium, 5);
        let decision = gate
            .attempt_contact_at("brand-1", Role::Brand, Role::Brand, true, now())
            .unwrap();
        assert_eq!(
            decision,
            Decision::denied(DenyReason::ContactNotPermitted {
                caller: Role::Brand,
                target: Role::Brand
            })
        );
    }

    #[test]
    fn test_unknown_account() {
        let gate = gate();
        let error = gate
            .attempt_contact_at("ghost", Role::Brand, Role::Kol, false, now())
            .unwrap_err();
        assert!(matches!(error, GovernanceError::UnknownAccount(_)));
    }

    #[test]
    fn test_concurrent_contacts_respect_ceiling() {
        let gate = gate();
        open(&gate, "brand-1", PlanTier::Free, 5);

        let admitted: usize = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..16)
                .map(|_| {
                    scope.spawn(|| {
                        gate.attempt_contact_at("brand-1", Role::Brand, Role::Kol, false, now())
                            .unwrap()
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap())
                .filter(|decision| !decision.is_denied())
                .count()
        });
        assert_eq!(admitted, 10);
        assert_eq!(gate.book().account("brand-1").unwrap().monthly_contacts_used, 10);
    }

    #[test]
    fn test_concurrent_contacts_across_month_boundary_reset_once() {
        let gate = gate();
        open(&gate, "brand-1", PlanTier::Free, 5);
        for _ in 0..10 {
            gate.attempt_contact_at("brand-1", Role::Brand, Role::Kol, false, now())
                .unwrap();
        }

        let next_month = Utc.with_ymd_and_hms(2026, 4, 1, 0, 5, 0).unwrap();
        let admitted: usize = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..16)
                .map(|_| {
                    scope.spawn(|| {
                        gate.attempt_contact_at("brand-1", Role::Brand, Role::Kol, false, next_month)
                            .unwrap()
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap())
                .filter(|decision| !decision.is_denied())
                .count()
        });

        assert_eq!(admitted, 10);
        let account = gate.book().account("brand-1").unwrap();
        assert_eq!(account.monthly_contacts_used, 10);
        assert_eq!(account.monthly_reset_at, next_month);
    }
}
