// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Enforcement orchestrator - the top-level composition of every component.
//!
//! [`Enforcer`] owns one [`AccountBook`] behind an `Arc` and hands a clone of
//! it to the credit ledger, the contact gate and the usage log, so all three
//! observe each other's writes through the same per-account locks.
//!
//! ## Evaluation Order
//!
//! 1. **Authentication** - unauthenticated callers on an authenticated feature
//!    get [`GuardResult::RequiresLogin`]; nothing is touched or logged.
//! 2. **Classification** - free text is classified before any lock is taken.
//! 3. **Provisioning** - a missing account is opened with the caller's tier.
//! 4. **Charge or gate** - contact features go to the [`ContactGate`],
//!    everything else to the [`CreditLedger`].
//! 5. **Usage log** - the decision is recorded regardless of outcome, before
//!    the account lock is released, so an account's events appear in the
//!    order its decisions were made.
//! 6. **Translation** - quota exhaustion on a free account becomes
//!    `RequiresUpgrade`; on a premium account it stays `Denied`.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::accounts::AccountBook;
use crate::classifier::QueryClassifier;
use crate::config::Config;
use crate::contact::ContactGate;
use crate::error::{ConfigError, GovernanceError};
use crate::ledger::CreditLedger;
use crate::schedule::ResetScheduler;
use crate::storage::Storage;
use crate::types::{
    ClassificationResult, Decision, GuardRequest, GuardResult, PlanTier, UsageEvent, UsageFilter,
};
use crate::usage::UsageLog;

/// Composes every metering component into a single `guard` API.
///
/// The orchestrator is generic over `S: Storage` so it can run on the built-in
/// [`InMemoryStorage`](crate::storage::InMemoryStorage) or on a file or
/// network store.  It is `Sync`: share it across threads with an `Arc`.
///
/// # Evaluation
///
/// ```rust
/// use credit_gate_core::{
///     config::Config,
///     engine::Enforcer,
///     storage::InMemoryStorage,
///     types::{AuthState, FeatureContext, GuardRequest, GuardResult, PlanTier, Role},
/// };
///
/// let enforcer = Enforcer::new(Config::default(), InMemoryStorage::new()).unwrap();
///
/// let request = GuardRequest::new(
///     "brand-1",
///     AuthState::authenticated(Role::Brand, PlanTier::Free),
///     FeatureContext::KolSearch,
/// )
/// .with_text("find beauty influencers on tiktok");
///
/// let result = enforcer.guard(&request).unwrap();
/// assert!(result.is_allowed());
///
/// let anonymous = GuardRequest::new(
///     "visitor",
///     AuthState::anonymous(Role::Brand),
///     FeatureContext::KolSearch,
/// );
/// assert_eq!(enforcer.guard(&anonymous).unwrap(), GuardResult::RequiresLogin);
/// ```
pub struct Enforcer<S: Storage> {
    config: Config,
    classifier: QueryClassifier,
    /// Account administration (open, read, upgrade, top up).
    pub accounts: Arc<AccountBook<S>>,
    /// Metered credit charges.
    pub ledger: CreditLedger<S>,
    /// Brand/KOL contact admission.
    pub contacts: ContactGate<S>,
    /// Append-only decision log.
    pub usage: UsageLog<S>,
}

impl<S: Storage> Enforcer<S> {
    /// Validate `config` and build every component over `storage`.
    pub fn new(config: Config, storage: S) -> Result<Self, ConfigError> {
        config.validate()?;
        let accounts = Arc::new(AccountBook::new(storage, ResetScheduler::from_config(&config)));
        Ok(Self {
            classifier: QueryClassifier::with_threshold(config.classifier_confidence_threshold),
            ledger: CreditLedger::new(config.clone(), Arc::clone(&accounts))?,
            contacts: ContactGate::new(config.clone(), Arc::clone(&accounts))?,
            usage: UsageLog::new(Arc::clone(&accounts)),
            accounts,
            config,
        })
    }

    /// Evaluate `request` as of the current time.
    pub fn guard(&self, request: &GuardRequest) -> Result<GuardResult, GovernanceError> {
        self.guard_at(request, Utc::now())
    }

    /// Evaluate `request` as of `now`.
    ///
    /// Denials are values, not errors: the `Err` arm only carries
    /// [`GovernanceError`]s that indicate a broken deployment (a cost row
    /// missing despite validation, a storage backend that dropped a record).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use chrono::Utc;
    /// use credit_gate_core::{
    ///     config::Config,
    ///     engine::Enforcer,
    ///     storage::InMemoryStorage,
    ///     types::{AuthState, FeatureContext, GuardRequest, GuardResult, PlanTier, Role},
    /// };
    ///
    /// let enforcer = Enforcer::new(Config::default(), InMemoryStorage::new()).unwrap();
    /// let auth = AuthState::authenticated(Role::Brand, PlanTier::Free);
    /// let request = GuardRequest::new("brand-1", auth, FeatureContext::AudienceInsights);
    ///
    /// // Free accounts hold no premium credits until they buy some.
    /// let result = enforcer.guard_at(&request, Utc::now()).unwrap();
    /// assert!(matches!(result, GuardResult::RequiresUpgrade { .. }));
    /// ```
    pub fn guard_at(&self, request: &GuardRequest, now: DateTime<Utc>) -> Result<GuardResult, GovernanceError> {
        let feature = request.feature;
        let auth = request.auth;

        // ------------------------------------------------------------------
        // Step 1: Authentication
        // ------------------------------------------------------------------
        let rule = self
            .config
            .cost_table
            .rule(feature, auth.plan_tier)
            .ok_or(ConfigError::MissingPolicyEntry {
                feature,
                plan: auth.plan_tier,
            })?;
        if rule.requires_authentication && !auth.is_authenticated {
            debug!(account = %request.account_id, %feature, "login required");
            return Ok(GuardResult::RequiresLogin);
        }

        // ------------------------------------------------------------------
        // Step 2: Classification (outside the account lock)
        // ------------------------------------------------------------------
        let classification = match request.text.as_deref() {
            Some(text) => self.classifier.classify(text),
            None => ClassificationResult::unclassified(),
        };

        // ------------------------------------------------------------------
        // Step 3: Provisioning
        // ------------------------------------------------------------------
        self.accounts.open_account(&request.account_id, auth.plan_tier, now);

        // ------------------------------------------------------------------
        // Steps 4-5: Charge or gate, logged under the account lock
        // ------------------------------------------------------------------
        let record = |decision: &Decision| {
            self.usage
                .record(&request.account_id, feature, &classification, decision, now);
        };
        let (decision, plan) = match feature.contact_target() {
            Some(target) => self.contacts.attempt_with_tier(
                &request.account_id,
                auth.role,
                target,
                request.was_invited,
                now,
                record,
            )?,
            None => self.ledger.charge_with_tier(
                &request.account_id,
                feature,
                &classification,
                now,
                record,
            )?,
        };

        // ------------------------------------------------------------------
        // Step 6: Translation
        // ------------------------------------------------------------------
        let result = match decision {
            Decision::Denied { reason } if reason.is_quota_exhaustion() => match plan {
                PlanTier::Free => GuardResult::RequiresUpgrade { reason },
                PlanTier::Premium => {
                    warn!(account = %request.account_id, %feature, %reason, "premium account denied");
                    GuardResult::Denied { reason }
                }
            },
            Decision::Denied { reason } => GuardResult::Denied { reason },
            decision => GuardResult::Allowed { decision },
        };
        debug!(account = %request.account_id, %feature, ?result, "guard evaluated");
        Ok(result)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Time left until the next daily refill, for display only.
    pub fn time_until_next_reset(&self) -> Option<Duration> {
        self.time_until_next_reset_at(Utc::now())
    }

    pub fn time_until_next_reset_at(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.accounts.scheduler().time_until_next_reset(now)
    }

    /// Convenience wrapper around [`UsageLog::query`].
    pub fn query_usage(&self, filter: &UsageFilter) -> Vec<UsageEvent> {
        self.usage.query(filter)
    }

    pub fn classifier(&self) -> &QueryClassifier {
        &self.classifier
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
