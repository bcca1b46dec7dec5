// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Declarative cost policy.
//!
//! [`CostPolicy`] is a static table keyed by `(FeatureContext, PlanTier)`.
//! It is validated once when the engine is built; after that,
//! [`resolve`](CostPolicy::resolve) is a pure lookup that cannot fail for a
//! configuration reason.
//!
//! On the wire the table is a flat list of [`CostEntry`] rows, which keeps it
//! readable in TOML:
//!
//! ```toml
//! [[cost_table]]
//! feature  = "general_chat"
//! plan     = "free"
//! pool     = "free"
//! specific = { flat = 1 }
//! general  = "per_questions"
//! ```

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{ClassificationResult, FeatureContext, PlanTier, Pool, QueryCategory, Role};

/// How much one action costs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Price {
    /// A fixed number of credits per action.
    Flat(u32),
    /// One credit per `general_questions_per_credit` actions.
    PerQuestions,
}

/// Pricing of one feature on one plan tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostRule {
    pub pool: Pool,
    /// Price applied when the text classifies as `Specific`.
    pub specific: Price,
    /// Price applied when the text classifies as `General` or is absent.
    pub general: Price,
    #[serde(default = "default_requires_authentication")]
    pub requires_authentication: bool,
}

fn default_requires_authentication() -> bool {
    true
}

impl CostRule {
    /// A rule whose price does not depend on classification.
    pub const fn flat(pool: Pool, credits: u32) -> Self {
        Self {
            pool,
            specific: Price::Flat(credits),
            general: Price::Flat(credits),
            requires_authentication: true,
        }
    }
}

/// One row of the serialised cost table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostEntry {
    pub feature: FeatureContext,
    pub plan: PlanTier,
    #[serde(flatten)]
    pub rule: CostRule,
}

/// The price and pool chosen for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedCost {
    pub pool: Pool,
    pub price: Price,
}

/// Static table mapping `(feature, plan)` to a [`CostRule`].
///
/// # Examples
///
/// ```rust
/// use credit_gate_core::policy::{CostPolicy, Price};
/// use credit_gate_core::types::{ClassificationResult, FeatureContext, PlanTier, Pool};
///
/// let policy = CostPolicy::default();
/// policy.validate().unwrap();
///
/// let cost = policy
///     .resolve(
///         FeatureContext::GeneralChat,
///         PlanTier::Free,
///         &ClassificationResult::unclassified(),
///     )
///     .unwrap();
/// assert_eq!(cost.pool, Pool::Free);
/// assert_eq!(cost.price, Price::PerQuestions);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<CostEntry>", into = "Vec<CostEntry>")]
pub struct CostPolicy {
    rules: HashMap<(FeatureContext, PlanTier), CostRule>,
}

impl CostPolicy {
    /// Build a policy from rows, rejecting duplicate keys.
    ///
    /// Coverage is checked separately by [`validate`](Self::validate) so that
    /// partial tables can be assembled in tests.
    pub fn from_entries<I>(entries: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = CostEntry>,
    {
        let mut rules = HashMap::new();
        for entry in entries {
            if rules.insert((entry.feature, entry.plan), entry.rule).is_some() {
                return Err(ConfigError::DuplicatePolicyEntry {
                    feature: entry.feature,
                    plan: entry.plan,
                });
            }
        }
        Ok(Self { rules })
    }

    /// Fail unless every `(feature, plan)` pair has an entry and the contact
    /// pool is used by brand-to-KOL contact alone, at a flat step.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for feature in FeatureContext::ALL {
            for plan in PlanTier::ALL {
                let rule = self
                    .rules
                    .get(&(feature, plan))
                    .ok_or(ConfigError::MissingPolicyEntry { feature, plan })?;
                validate_contact_pool(feature, plan, rule)?;
            }
        }
        Ok(())
    }

    /// The rule for `(feature, plan)`, if the table has one.
    pub fn rule(&self, feature: FeatureContext, plan: PlanTier) -> Option<&CostRule> {
        self.rules.get(&(feature, plan))
    }

    /// Choose the pool and price for one call.
    ///
    /// Returns `None` only for a table that never passed
    /// [`validate`](Self::validate).
    pub fn resolve(
        &self,
        feature: FeatureContext,
        plan: PlanTier,
        classification: &ClassificationResult,
    ) -> Option<ResolvedCost> {
        let rule = self.rule(feature, plan)?;
        let price = match classification.category {
            QueryCategory::Specific => rule.specific,
            QueryCategory::General => rule.general,
        };
        Some(ResolvedCost {
            pool: rule.pool,
            price,
        })
    }

    /// Replace (or add) one entry.
    pub fn set(&mut self, feature: FeatureContext, plan: PlanTier, rule: CostRule) {
        self.rules.insert((feature, plan), rule);
    }

    /// Rows in table order.
    pub fn entries(&self) -> Vec<CostEntry> {
        let mut entries = Vec::with_capacity(self.rules.len());
        for feature in FeatureContext::ALL {
            for plan in PlanTier::ALL {
                if let Some(rule) = self.rules.get(&(feature, plan)) {
                    entries.push(CostEntry {
                        feature,
                        plan,
                        rule: *rule,
                    });
                }
            }
        }
        entries
    }
}

fn validate_contact_pool(feature: FeatureContext, plan: PlanTier, rule: &CostRule) -> Result<(), ConfigError> {
    let quota_feature = feature.contact_target() == Some(Role::Kol);
    if quota_feature && rule.pool != Pool::Contact {
        return Err(ConfigError::invalid(
            "cost_table",
            format!("'{feature}' on plan '{plan}' must use the contact pool"),
        ));
    }
    if !quota_feature && rule.pool == Pool::Contact {
        return Err(ConfigError::invalid(
            "cost_table",
            format!("'{feature}' on plan '{plan}' cannot use the contact pool"),
        ));
    }
    if quota_feature && (rule.specific == Price::PerQuestions || rule.general == Price::PerQuestions) {
        return Err(ConfigError::invalid(
            "cost_table",
            format!("'{feature}' on plan '{plan}' must have a flat price"),
        ));
    }
    Ok(())
}

impl TryFrom<Vec<CostEntry>> for CostPolicy {
    type Error = ConfigError;

    fn try_from(entries: Vec<CostEntry>) -> Result<Self, Self::Error> {
        Self::from_entries(entries)
    }
}

impl From<CostPolicy> for Vec<CostEntry> {
    fn from(policy: CostPolicy) -> Self {
        policy.entries()
    }
}

impl Default for CostPolicy {
    fn default() -> Self {
        let mut rules = HashMap::new();
        for plan in PlanTier::ALL {
            rules.insert((FeatureContext::KolSearch, plan), CostRule::flat(Pool::Free, 1));
            rules.insert(
                (FeatureContext::GeneralChat, plan),
                CostRule {
                    pool: Pool::Free,
                    specific: Price::Flat(1),
                    general: Price::PerQuestions,
                    requires_authentication: true,
                },
            );
            rules.insert(
                (FeatureContext::AdvancedAnalytics, plan),
                CostRule::flat(Pool::Free, 2),
            );
            rules.insert(
                (FeatureContext::AudienceInsights, plan),
                CostRule::flat(Pool::Premium, 5),
            );
            rules.insert((FeatureContext::ContactKol, plan), CostRule::flat(Pool::Contact, 1));
            rules.insert((FeatureContext::ContactBrand, plan), CostRule::flat(Pool::Free, 1));
            rules.insert((FeatureContext::ProfileView, plan), CostRule::flat(Pool::None, 0));
        }
        Self { rules }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn specific() -> ClassificationResult {
        ClassificationResult {
            category: QueryCategory::Specific,
            confidence_score: 90,
        }
    }

    #[test]
    fn test_default_policy_covers_every_call_site() {
        CostPolicy::default().validate().unwrap();
    }

    #[test]
    fn test_general_chat_price_depends_on_classification() {
        let policy = CostPolicy::default();
        let specific_cost = policy
            .resolve(FeatureContext::GeneralChat, PlanTier::Free, &specific())
            .unwrap();
        let general_cost = policy
            .resolve(
                FeatureContext::GeneralChat,
                PlanTier::Free,
                &ClassificationResult::unclassified(),
            )
            .unwrap();
        assert_eq!(specific_cost.price, Price::Flat(1));
        assert_eq!(general_cost.price, Price::PerQuestions);
    }

    #[test]
    fn test_audience_insights_draws_premium_pool() {
        let cost = CostPolicy::default().resolve(
            FeatureContext::AudienceInsights,
            PlanTier::Premium,
            &ClassificationResult::unclassified(),
        );
        assert_eq!(cost, Some(ResolvedCost { pool: Pool::Premium, price: Price::Flat(5) }));
    }

    #[test]
    fn test_missing_entry_fails_validation() {
        let mut entries = CostPolicy::default().entries();
        entries.retain(|entry| {
            !(entry.feature == FeatureContext::AdvancedAnalytics && entry.plan == PlanTier::Premium)
        });
        let policy = CostPolicy::from_entries(entries).unwrap();
        let error = policy.validate().unwrap_err();
        assert!(matches!(
            error,
            ConfigError::MissingPolicyEntry {
                feature: FeatureContext::AdvancedAnalytics,
                plan: PlanTier::Premium
            }
        ));
    }

    #[test]
    fn test_duplicate_entry_rejected() {
        let entry = CostEntry {
            feature: FeatureContext::KolSearch,
            plan: PlanTier::Free,
            rule: CostRule::flat(Pool::Free, 1),
        };
        assert!(matches!(
            CostPolicy::from_entries([entry, entry]),
            Err(ConfigError::DuplicatePolicyEntry { .. })
        ));
    }

    #[test]
    fn test_brand_to_kol_contact_must_use_contact_pool() {
        let mut policy = CostPolicy::default();
        policy.set(FeatureContext::ContactKol, PlanTier::Free, CostRule::flat(Pool::Free, 1));
        assert!(matches!(policy.validate(), Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_contact_pool_reserved_for_brand_to_kol_contact() {
        for feature in [FeatureContext::KolSearch, FeatureContext::ContactBrand] {
            let mut policy = CostPolicy::default();
            policy.set(feature, PlanTier::Free, CostRule::flat(Pool::Contact, 1));
            let error = policy.validate().unwrap_err();
            assert!(
                matches!(error, ConfigError::InvalidValue { ref reason, .. } if reason.contains("cannot use the contact pool")),
                "{feature}: {error}"
            );
        }
    }

    #[test]
    fn test_brand_to_kol_contact_needs_flat_step() {
        let mut policy = CostPolicy::default();
        policy.set(
            FeatureContext::ContactKol,
            PlanTier::Premium,
            CostRule {
                pool: Pool::Contact,
                specific: Price::Flat(1),
                general: Price::PerQuestions,
                requires_authentication: true,
            },
        );
        let error = policy.validate().unwrap_err();
        assert!(matches!(error, ConfigError::InvalidValue { ref reason, .. } if reason.contains("flat price")));
    }

    #[test]
    fn test_table_round_trips_through_json_rows() {
        let policy = CostPolicy::default();
        let json = serde_json::to_string(&policy).unwrap();
        assert!(json.contains("\"general\":\"per_questions\""));
        let parsed: CostPolicy = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, policy);
    }
}
