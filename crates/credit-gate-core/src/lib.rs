// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! # credit-gate-core
//!
//! Usage-credit governance engine for a creator marketplace: decides whether a
//! user action (searching creators, chatting, opening analytics, contacting a
//! brand or KOL) is allowed, how many credits it costs, and when quotas
//! refill.
//!
//! ## Architecture
//!
//! ```text
//! Enforcer<S: Storage>
//!   ├── QueryClassifier    - Specific / General verdict on free text
//!   ├── AccountBook<S>     - per-account locks, resets, administration
//!   │     └── ResetScheduler - daily hour and month boundaries
//!   ├── CreditLedger<S>    - CostPolicy lookup, amortized and flat debits
//!   ├── ContactGate<S>     - monthly brand→KOL quota, KOL→brand pricing
//!   └── UsageLog<S>        - append-only decision log
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use credit_gate_core::{
//!     AuthState, Config, Decision, Enforcer, FeatureContext, GuardRequest, GuardResult,
//!     InMemoryStorage, PlanTier, Role,
//! };
//!
//! let enforcer = Enforcer::new(Config::default(), InMemoryStorage::new()).unwrap();
//! let auth = AuthState::authenticated(Role::Brand, PlanTier::Free);
//!
//! // Small talk is amortized: the first question is free.
//! let request = GuardRequest::new("brand-1", auth, FeatureContext::GeneralChat)
//!     .with_text("hello, how are you");
//! let result = enforcer.guard(&request).unwrap();
//! assert_eq!(
//!     result,
//!     GuardResult::Allowed { decision: Decision::AmortizedNoCharge { counter: 1 } }
//! );
//! ```

pub mod accounts;
pub mod classifier;
pub mod config;
pub mod contact;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod policy;
pub mod schedule;
pub mod storage;
pub mod types;
pub mod usage;

#[cfg(feature = "async")]
pub mod async_engine;

#[cfg(feature = "config-loader")]
pub mod config_loader;

// Re-export the most commonly used items at the crate root so consumers can
// write `use credit_gate_core::Enforcer;` instead of the fully qualified path.
pub use config::Config;
pub use engine::Enforcer;
pub use error::{ConfigError, GovernanceError};
pub use storage::{InMemoryStorage, Storage};
pub use types::{
    Account, AuthState, ClassificationResult, Decision, DenyReason, FeatureContext, GuardRequest,
    GuardResult, PlanTier, Pool, QueryCategory, Role, UsageEvent, UsageFilter,
};

#[cfg(feature = "async")]
pub use async_engine::AsyncEnforcer;
