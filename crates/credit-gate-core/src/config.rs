// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Engine-level configuration.
//!
//! [`Config`] is the single entry point for tuning the engine at construction
//! time.  All fields have defaults so that `Config::default()` is always a
//! valid starting point, and [`Config::validate`] is run by every constructor
//! that accepts one, so a bad table fails at startup instead of mid-request.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::classifier::DEFAULT_THRESHOLD;
use crate::error::ConfigError;
use crate::policy::CostPolicy;
use crate::types::PlanTier;

/// Top-level configuration for [`Enforcer`](crate::engine::Enforcer).
///
/// # Examples
///
/// ```rust
/// use credit_gate_core::config::Config;
///
/// let config = Config {
///     general_questions_per_credit: 3,
///     daily_reset_hour: 0,
///     ..Config::default()
/// };
/// config.validate().unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Number of general questions that together cost one credit.
    pub general_questions_per_credit: u32,

    /// Local hour (0–23) at which the daily free pool is refilled.
    pub daily_reset_hour: u32,

    /// Reference timezone for both the daily and the monthly boundary.
    pub reset_timezone: Tz,

    /// Free credits granted at each daily boundary.
    pub daily_free_credit_allotment: u32,

    /// Brand→KOL contacts per month on the free plan.
    pub free_monthly_contact_limit: u32,

    /// Brand→KOL contacts per month on the premium plan.
    pub premium_monthly_contact_limit: u32,

    /// Minimum classifier confidence (0–100) for a `Specific` verdict.
    pub classifier_confidence_threshold: u8,

    /// Per-feature pricing.
    pub cost_table: CostPolicy,
}

impl Config {
    /// Check every field and the cost table.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.general_questions_per_credit == 0 {
            return Err(ConfigError::invalid(
                "general_questions_per_credit",
                "must be greater than zero",
            ));
        }
        if self.daily_reset_hour > 23 {
            return Err(ConfigError::invalid(
                "daily_reset_hour",
                format!("{} is not an hour of the day (0-23)", self.daily_reset_hour),
            ));
        }
        if self.classifier_confidence_threshold > 100 {
            return Err(ConfigError::invalid(
                "classifier_confidence_threshold",
                "must be in range 0-100",
            ));
        }
        self.cost_table.validate()
    }

    /// Monthly brand→KOL contact ceiling for `plan`.
    pub fn monthly_contact_limit(&self, plan: PlanTier) -> u32 {
        match plan {
            PlanTier::Free => self.free_monthly_contact_limit,
            PlanTier::Premium => self.premium_monthly_contact_limit,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general_questions_per_credit: 2,
            daily_reset_hour: 7,
            reset_timezone: Tz::UTC,
            daily_free_credit_allotment: 5,
            free_monthly_contact_limit: 10,
            premium_monthly_contact_limit: 50,
            classifier_confidence_threshold: DEFAULT_THRESHOLD,
            cost_table: CostPolicy::default(),
        }
    }
}
