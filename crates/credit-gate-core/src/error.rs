// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Error types.
//!
//! Denials are never errors: they are returned as [`Decision::Denied`] or
//! [`GuardResult`] values.  The variants here cover configuration faults,
//! which are detected when the engine is built, and caller misuse.
//!
//! [`Decision::Denied`]: crate::types::Decision::Denied
//! [`GuardResult`]: crate::types::GuardResult

use thiserror::Error;

use crate::types::{FeatureContext, PlanTier};

/// Errors raised while building or validating a [`Config`](crate::config::Config).
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("no cost policy entry for feature '{feature}' on plan '{plan}'")]
    MissingPolicyEntry {
        feature: FeatureContext,
        plan: PlanTier,
    },

    #[error("duplicate cost policy entry for feature '{feature}' on plan '{plan}'")]
    DuplicatePolicyEntry {
        feature: FeatureContext,
        plan: PlanTier,
    },

    #[error("field \"{field}\": {reason}")]
    InvalidValue { field: String, reason: String },

    #[cfg(feature = "config-loader")]
    #[error("failed to read config file \"{path}\"")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "config-loader")]
    #[error("failed to parse TOML config")]
    TomlParse {
        #[source]
        source: toml::de::Error,
    },

    #[cfg(feature = "config-loader")]
    #[error("field \"{field}\": cannot parse \"{value}\": {reason}")]
    ParseField {
        field: String,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Errors returned by ledger, gate, and orchestrator calls.
#[derive(Error, Debug)]
pub enum GovernanceError {
    #[error("unknown account '{0}'")]
    UnknownAccount(String),

    /// Contact features are priced by the contact gate, not the credit ledger.
    #[error("feature '{0}' must go through the contact gate")]
    ContactFeature(FeatureContext),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The blocking task running a guard was cancelled by runtime shutdown.
    #[cfg(feature = "async")]
    #[error("guard task cancelled")]
    Cancelled,
}
