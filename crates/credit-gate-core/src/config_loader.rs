// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Configuration loader for [`Enforcer`](crate::engine::Enforcer).
//!
//! Supports two load strategies:
//!
//! 1. **TOML file** - [`load_config`] reads and deserialises a TOML file into
//!    a [`Config`], including a custom cost table.
//! 2. **Environment variables** - [`load_config_from_env`] starts from the
//!    defaults and overrides scalars from `CREDIT_GATE_`-prefixed variables.
//!
//! Both loaders validate the result before returning it.
//!
//! # File format
//!
//! ```toml
//! general_questions_per_credit = 3
//! daily_reset_hour             = 7
//! reset_timezone               = "Asia/Ho_Chi_Minh"
//! daily_free_credit_allotment  = 5
//!
//! # Omit cost_table to keep the built-in table; if present it must list
//! # every (feature, plan) pair.
//! [[cost_table]]
//! feature  = "kol_search"
//! plan     = "free"
//! pool     = "free"
//! specific = { flat = 1 }
//! general  = { flat = 1 }
//! ```
//!
//! # Environment variables
//!
//! | Variable                                      | Type   | Default |
//! |-----------------------------------------------|--------|---------|
//! | `CREDIT_GATE_GENERAL_QUESTIONS_PER_CREDIT`    | u32    | 2       |
//! | `CREDIT_GATE_DAILY_RESET_HOUR`                | u32    | 7       |
//! | `CREDIT_GATE_RESET_TIMEZONE`                  | IANA   | UTC     |
//! | `CREDIT_GATE_DAILY_FREE_CREDIT_ALLOTMENT`     | u32    | 5       |
//! | `CREDIT_GATE_FREE_MONTHLY_CONTACT_LIMIT`      | u32    | 10      |
//! | `CREDIT_GATE_PREMIUM_MONTHLY_CONTACT_LIMIT`   | u32    | 50      |
//! | `CREDIT_GATE_CLASSIFIER_CONFIDENCE_THRESHOLD` | u8     | 60      |

#![cfg(feature = "config-loader")]

use std::fs;
use std::path::Path;
use std::str::FromStr;

use chrono_tz::Tz;

use crate::config::Config;
use crate::error::ConfigError;

const ENV_PREFIX: &str = "CREDIT_GATE_";

// ---------------------------------------------------------------------------
// TOML loader
// ---------------------------------------------------------------------------

/// Load and validate a [`Config`] from a TOML file.
///
/// # Errors
///
/// [`ConfigError::FileRead`] if the file cannot be read,
/// [`ConfigError::TomlParse`] if it does not match the schema, and any
/// validation error of [`Config::validate`].
///
/// # Example
///
/// ```rust,no_run
/// use credit_gate_core::config_loader::load_config;
///
/// let config = load_config("/etc/credit-gate/config.toml").unwrap();
/// println!("reset hour: {}", config.daily_reset_hour);
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
        path: path.display().to_string(),
        source,
    })?;
    parse_config(&content)
}

/// Parse and validate TOML text.
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content).map_err(|source| ConfigError::TomlParse { source })?;
    config.validate()?;
    Ok(config)
}

// ---------------------------------------------------------------------------
// Environment variable loader
// ---------------------------------------------------------------------------

/// Load a [`Config`] from `CREDIT_GATE_`-prefixed environment variables.
///
/// Unset variables keep their defaults.  The cost table is always the
/// built-in one; use [`load_config`] to customise it.
pub fn load_config_from_env() -> Result<Config, ConfigError> {
    config_from_lookup(|key| std::env::var(key).ok())
}

fn config_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Config, ConfigError> {
    let mut config = Config::default();
    let read = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

    override_with(&read, "GENERAL_QUESTIONS_PER_CREDIT", &mut config.general_questions_per_credit)?;
    override_with(&read, "DAILY_RESET_HOUR", &mut config.daily_reset_hour)?;
    override_with(&read, "DAILY_FREE_CREDIT_ALLOTMENT", &mut config.daily_free_credit_allotment)?;
    override_with(&read, "FREE_MONTHLY_CONTACT_LIMIT", &mut config.free_monthly_contact_limit)?;
    override_with(&read, "PREMIUM_MONTHLY_CONTACT_LIMIT", &mut config.premium_monthly_contact_limit)?;
    override_with(
        &read,
        "CLASSIFIER_CONFIDENCE_THRESHOLD",
        &mut config.classifier_confidence_threshold,
    )?;

    if let Some(value) = read("RESET_TIMEZONE") {
        config.reset_timezone = value
            .trim()
            .parse::<Tz>()
            .map_err(|reason| ConfigError::ParseField {
                field: format!("{ENV_PREFIX}RESET_TIMEZONE"),
                value: value.clone(),
                reason: reason.to_string(),
            })?;
    }

    config.validate()?;
    Ok(config)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn override_with<T>(
    read: &impl Fn(&str) -> Option<String>,
    name: &str,
    slot: &mut T,
) -> Result<(), ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(value) = read(name) {
        *slot = value.trim().parse::<T>().map_err(|reason| ConfigError::ParseField {
            field: format!("{ENV_PREFIX}{name}"),
            value: value.clone(),
            reason: reason.to_string(),
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{CostRule, Price};
    use crate::types::{FeatureContext, PlanTier, Pool};
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "general_questions_per_credit = 3\nreset_timezone = \"Asia/Ho_Chi_Minh\""
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.general_questions_per_credit, 3);
        assert_eq!(config.reset_timezone, chrono_tz::Asia::Ho_Chi_Minh);
        assert_eq!(config.premium_monthly_contact_limit, 50);
        assert_eq!(config.cost_table, Config::default().cost_table);
    }

    #[test]
    fn test_missing_file_is_reported_with_path() {
        let error = load_config("/nonexistent/credit-gate.toml").unwrap_err();
        assert!(matches!(error, ConfigError::FileRead { ref path, .. } if path.contains("credit-gate.toml")));
    }

    #[test]
    fn test_incomplete_cost_table_fails_fast() {
        let toml = r#"
            [[cost_table]]
            feature  = "kol_search"
            plan     = "free"
            pool     = "free"
            specific = { flat = 1 }
            general  = { flat = 1 }
        "#;
        let error = parse_config(toml).unwrap_err();
        assert!(matches!(error, ConfigError::MissingPolicyEntry { .. }));
    }

    #[test]
    fn test_full_cost_table_from_toml() {
        let mut toml = String::new();
        for entry in Config::default().cost_table.entries() {
            let mut rule = entry.rule;
            if entry.feature == FeatureContext::AdvancedAnalytics {
                rule = CostRule::flat(Pool::Free, 3);
            }
            let price = |price: Price| match price {
                Price::Flat(n) => format!("{{ flat = {n} }}"),
                Price::PerQuestions => "\"per_questions\"".to_string(),
            };
            let pool = serde_json::to_string(&rule.pool).unwrap();
            toml.push_str(&format!(
                "[[cost_table]]\nfeature = \"{}\"\nplan = \"{}\"\npool = {}\nspecific = {}\ngeneral = {}\n\n",
                entry.feature,
                entry.plan,
                pool,
                price(rule.specific),
                price(rule.general),
            ));
        }

        let config = parse_config(&toml).unwrap();
        let rule = config
            .cost_table
            .rule(FeatureContext::AdvancedAnalytics, PlanTier::Free)
            .unwrap();
        assert_eq!(rule.specific, Price::Flat(3));
        assert!(rule.requires_authentication);
    }

    #[test]
    fn test_malformed_toml() {
        let error = parse_config("daily_reset_hour = \"seven\"").unwrap_err();
        assert!(matches!(error, ConfigError::TomlParse { .. }));
    }

    #[test]
    fn test_env_overrides() {
        let config = config_from_lookup(lookup(&[
            ("CREDIT_GATE_GENERAL_QUESTIONS_PER_CREDIT", "3"),
            ("CREDIT_GATE_DAILY_RESET_HOUR", " 0 "),
            ("CREDIT_GATE_RESET_TIMEZONE", "Europe/Paris"),
            ("CREDIT_GATE_PREMIUM_MONTHLY_CONTACT_LIMIT", "100"),
        ]))
        .unwrap();
        assert_eq!(config.general_questions_per_credit, 3);
        assert_eq!(config.daily_reset_hour, 0);
        assert_eq!(config.reset_timezone, chrono_tz::Europe::Paris);
        assert_eq!(config.premium_monthly_contact_limit, 100);
        assert_eq!(config.free_monthly_contact_limit, 10);
    }

    #[test]
    fn test_env_parse_error_names_variable() {
        let error = config_from_lookup(lookup(&[("CREDIT_GATE_DAILY_RESET_HOUR", "seven")])).unwrap_err();
        assert!(matches!(
            error,
            ConfigError::ParseField { ref field, .. } if field == "CREDIT_GATE_DAILY_RESET_HOUR"
        ));
    }

    #[test]
    fn test_env_unknown_timezone() {
        let error = config_from_lookup(lookup(&[("CREDIT_GATE_RESET_TIMEZONE", "Mars/Olympus")])).unwrap_err();
        assert!(matches!(error, ConfigError::ParseField { .. }));
    }

    #[test]
    fn test_env_values_are_validated() {
        let error = config_from_lookup(lookup(&[("CREDIT_GATE_DAILY_RESET_HOUR", "24")])).unwrap_err();
        assert!(matches!(error, ConfigError::InvalidValue { .. }));
    }
}
