// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Shared data types used across all metering sub-systems.
//!
//! All types implement [`Clone`], [`Debug`], [`serde::Serialize`], and
//! [`serde::Deserialize`] so they can be persisted, logged, and handed to the
//! surrounding UI layer without additional conversion steps.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Plans, roles, features
// ---------------------------------------------------------------------------

/// Subscription tier of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanTier {
    Free,
    Premium,
}

impl PlanTier {
    /// Every tier, in table order.
    pub const ALL: [PlanTier; 2] = [PlanTier::Free, PlanTier::Premium];

    pub fn as_str(self) -> &'static str {
        match self {
            PlanTier::Free => "free",
            PlanTier::Premium => "premium",
        }
    }
}

impl fmt::Display for PlanTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Marketplace role of the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// A brand running campaigns.
    Brand,
    /// A key opinion leader (creator / influencer).
    Kol,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Brand => f.write_str("brand"),
            Role::Kol => f.write_str("kol"),
        }
    }
}

/// Closed set of metered call sites.
///
/// Adding a feature means adding a variant here and a row per plan tier in
/// the [`CostPolicy`](crate::policy::CostPolicy) table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureContext {
    /// Creator directory search bar.
    KolSearch,
    /// Any of the chat surfaces.
    GeneralChat,
    /// Advanced analytics panel on a creator profile.
    AdvancedAnalytics,
    /// Audience insights panel (premium pool only).
    AudienceInsights,
    /// A brand contacting a KOL.
    ContactKol,
    /// A KOL contacting a brand.
    ContactBrand,
    /// Basic creator profile view, gated by authentication only.
    ProfileView,
}

impl FeatureContext {
    /// Every feature, in table order.
    pub const ALL: [FeatureContext; 7] = [
        FeatureContext::KolSearch,
        FeatureContext::GeneralChat,
        FeatureContext::AdvancedAnalytics,
        FeatureContext::AudienceInsights,
        FeatureContext::ContactKol,
        FeatureContext::ContactBrand,
        FeatureContext::ProfileView,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FeatureContext::KolSearch => "kol_search",
            FeatureContext::GeneralChat => "general_chat",
            FeatureContext::AdvancedAnalytics => "advanced_analytics",
            FeatureContext::AudienceInsights => "audience_insights",
            FeatureContext::ContactKol => "contact_kol",
            FeatureContext::ContactBrand => "contact_brand",
            FeatureContext::ProfileView => "profile_view",
        }
    }

    /// The role on the receiving end of a contact feature, if this is one.
    pub fn contact_target(self) -> Option<Role> {
        match self {
            FeatureContext::ContactKol => Some(Role::Kol),
            FeatureContext::ContactBrand => Some(Role::Brand),
            _ => None,
        }
    }
}

impl fmt::Display for FeatureContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which balance a charge is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pool {
    /// Daily-refilled free credits.
    Free,
    /// Purchased / plan-granted premium credits.
    Premium,
    /// The monthly contact counter of the contact gate.
    Contact,
    /// No balance is touched; the action only needs to pass the allow check.
    None,
}

impl fmt::Display for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Pool::Free => "free",
            Pool::Premium => "premium",
            Pool::Contact => "contact",
            Pool::None => "none",
        };
        f.write_str(label)
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Verdict category of the query classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryCategory {
    /// A premium-grade lookup (named creators, niches, platforms).
    Specific,
    /// Small talk or an open question.
    General,
}

/// Output of [`QueryClassifier::classify`](crate::classifier::QueryClassifier::classify).
///
/// Created per call and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub category: QueryCategory,
    /// Summed signal weight, `0..=100`.
    pub confidence_score: u8,
}

impl ClassificationResult {
    /// The result used when no text accompanies the action.
    pub fn unclassified() -> Self {
        Self {
            category: QueryCategory::General,
            confidence_score: 0,
        }
    }

    pub fn is_specific(&self) -> bool {
        self.category == QueryCategory::Specific
    }
}

// ---------------------------------------------------------------------------
// Account
// ---------------------------------------------------------------------------

/// Metered state of one user.
///
/// Owned by the [`AccountBook`](crate::accounts::AccountBook) and mutated only
/// through ledger and gate operations.  All balances are unsigned; a debit that
/// would underflow is refused rather than clamped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub account_id: String,
    pub plan_tier: PlanTier,
    pub free_credits: u32,
    pub premium_credits: u32,
    /// Always below `Config::general_questions_per_credit`.
    pub general_question_counter: u32,
    /// Last time the daily pool was refilled.
    pub daily_reset_at: DateTime<Utc>,
    pub monthly_contacts_used: u32,
    /// Last time the monthly contact counter was cleared.
    pub monthly_reset_at: DateTime<Utc>,
}

impl Account {
    /// Balance of a credit pool, or `None` for pools that hold no credits.
    pub fn balance(&self, pool: Pool) -> Option<u32> {
        match pool {
            Pool::Free => Some(self.free_credits),
            Pool::Premium => Some(self.premium_credits),
            Pool::Contact | Pool::None => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

/// Why an action was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DenyReason {
    /// The pool cannot cover the price.  Recoverable by reset or upgrade.
    InsufficientCredits {
        pool: Pool,
        required: u32,
        available: u32,
    },
    /// The monthly contact ceiling is reached.  Recoverable at the next month.
    MonthlyQuotaExceeded { used: u32, limit: u32 },
    /// Contact between two parties of the same role.
    ContactNotPermitted { caller: Role, target: Role },
}

impl DenyReason {
    /// Whether upgrading the plan could lift this denial.
    pub fn is_quota_exhaustion(&self) -> bool {
        matches!(
            self,
            DenyReason::InsufficientCredits { .. } | DenyReason::MonthlyQuotaExceeded { .. }
        )
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::InsufficientCredits { pool, required, available } => write!(
                f,
                "insufficient {pool} credits (required {required}, available {available})"
            ),
            DenyReason::MonthlyQuotaExceeded { used, limit } => {
                write!(f, "monthly contact quota exceeded ({used}/{limit})")
            }
            DenyReason::ContactNotPermitted { caller, target } => {
                write!(f, "{caller} accounts cannot contact {target} accounts")
            }
        }
    }
}

/// Outcome of a ledger charge or a contact attempt.
///
/// Side effects are already applied when a non-denied decision is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Decision {
    /// `amount` was debited from `pool` (possibly zero).
    Charged { pool: Pool, amount: u32 },
    /// A general question was counted without debiting a credit.
    AmortizedNoCharge { counter: u32 },
    /// Nothing was changed.
    Denied { reason: DenyReason },
}

impl Decision {
    pub fn charged(pool: Pool, amount: u32) -> Self {
        Decision::Charged { pool, amount }
    }

    pub fn denied(reason: DenyReason) -> Self {
        Decision::Denied { reason }
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, Decision::Denied { .. })
    }
}

// ---------------------------------------------------------------------------
// Orchestrator boundary
// ---------------------------------------------------------------------------

/// Authentication facts about the caller, established outside the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthState {
    pub is_authenticated: bool,
    pub role: Role,
    pub plan_tier: PlanTier,
}

impl AuthState {
    pub fn authenticated(role: Role, plan_tier: PlanTier) -> Self {
        Self {
            is_authenticated: true,
            role,
            plan_tier,
        }
    }

    /// A signed-out visitor browsing as `role`.
    pub fn anonymous(role: Role) -> Self {
        Self {
            is_authenticated: false,
            role,
            plan_tier: PlanTier::Free,
        }
    }
}

/// One call into [`Enforcer::guard`](crate::engine::Enforcer::guard).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardRequest {
    pub account_id: String,
    pub auth: AuthState,
    pub feature: FeatureContext,
    /// Free text to classify (chat message, search query).
    pub text: Option<String>,
    /// Only meaningful for contact features.
    #[serde(default)]
    pub was_invited: bool,
}

impl GuardRequest {
    pub fn new(account_id: impl Into<String>, auth: AuthState, feature: FeatureContext) -> Self {
        Self {
            account_id: account_id.into(),
            auth,
            feature,
            text: None,
            was_invited: false,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn invited(mut self, was_invited: bool) -> Self {
        self.was_invited = was_invited;
        self
    }
}

/// What the caller should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum GuardResult {
    /// Proceed; the decision's side effect is already applied.
    Allowed { decision: Decision },
    /// Redirect to sign-in.
    RequiresLogin,
    /// Redirect to pricing; a free account ran out of quota.
    RequiresUpgrade { reason: DenyReason },
    /// Refused outright.
    Denied { reason: DenyReason },
}

impl GuardResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GuardResult::Allowed { .. })
    }
}

// ---------------------------------------------------------------------------
// Usage log
// ---------------------------------------------------------------------------

/// Coarse outcome stored on a [`UsageEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageOutcome {
    Charged,
    Amortized,
    Denied,
}

impl From<&Decision> for UsageOutcome {
    fn from(decision: &Decision) -> Self {
        match decision {
            Decision::Charged { .. } => UsageOutcome::Charged,
            Decision::AmortizedNoCharge { .. } => UsageOutcome::Amortized,
            Decision::Denied { .. } => UsageOutcome::Denied,
        }
    }
}

/// Append-only observability record.  The engine never reads these back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageEvent {
    pub account_id: String,
    pub timestamp: DateTime<Utc>,
    pub feature_context: FeatureContext,
    pub category: QueryCategory,
    pub confidence_score: u8,
    pub cost_charged: u32,
    pub pool_debited: Pool,
    pub outcome: UsageOutcome,
}

/// Filter used to narrow the results of a usage query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageFilter {
    pub account_id: Option<String>,
    pub feature: Option<FeatureContext>,
    /// Inclusive lower bound.
    pub since: Option<DateTime<Utc>>,
    /// Inclusive upper bound.
    pub until: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl UsageFilter {
    pub fn for_account(account_id: impl Into<String>) -> Self {
        Self {
            account_id: Some(account_id.into()),
            ..Self::default()
        }
    }

    /// Whether `event` satisfies every set criterion (the limit is applied
    /// by the caller).
    pub fn matches(&self, event: &UsageEvent) -> bool {
        if let Some(ref account_id) = self.account_id {
            if &event.account_id != account_id {
                return false;
            }
        }
        if let Some(feature) = self.feature {
            if event.feature_context != feature {
                return false;
            }
        }
        if let Some(since) = self.since {
            if event.timestamp < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if event.timestamp > until {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event(account_id: &str, hour: u32, feature: FeatureContext) -> UsageEvent {
        UsageEvent {
            account_id: account_id.into(),
            timestamp: Utc.with_ymd_and_hms(2026, 3, 2, hour, 0, 0).unwrap(),
            feature_context: feature,
            category: QueryCategory::General,
            confidence_score: 0,
            cost_charged: 0,
            pool_debited: Pool::None,
            outcome: UsageOutcome::Charged,
        }
    }

    #[test]
    fn test_feature_names_match_serde_names() {
        for feature in FeatureContext::ALL {
            let json = serde_json::to_string(&feature).unwrap();
            assert_eq!(json, format!("\"{}\"", feature.as_str()));
        }
    }

    #[test]
    fn test_contact_targets() {
        assert_eq!(FeatureContext::ContactKol.contact_target(), Some(Role::Kol));
        assert_eq!(FeatureContext::ContactBrand.contact_target(), Some(Role::Brand));
        assert_eq!(FeatureContext::GeneralChat.contact_target(), None);
    }

    #[test]
    fn test_guard_result_serialises_with_tag() {
        let result = GuardResult::RequiresUpgrade {
            reason: DenyReason::InsufficientCredits {
                pool: Pool::Free,
                required: 1,
                available: 0,
            },
        };
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"result\":\"requires_upgrade\""));
        assert!(json.contains("\"kind\":\"insufficient_credits\""));
    }

    #[test]
    fn test_usage_filter_matches() {
        let filter = UsageFilter {
            account_id: Some("acct-1".into()),
            since: Some(Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()),
            ..UsageFilter::default()
        };
        assert!(filter.matches(&event("acct-1", 9, FeatureContext::KolSearch)));
        assert!(!filter.matches(&event("acct-1", 8, FeatureContext::KolSearch)));
        assert!(!filter.matches(&event("acct-2", 10, FeatureContext::KolSearch)));
    }

    #[test]
    fn test_quota_exhaustion_reasons() {
        assert!(DenyReason::MonthlyQuotaExceeded { used: 10, limit: 10 }.is_quota_exhaustion());
        assert!(!DenyReason::ContactNotPermitted {
            caller: Role::Brand,
            target: Role::Brand
        }
        .is_quota_exhaustion());
    }
}
