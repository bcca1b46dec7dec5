// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! # credit-gate-std
//!
//! Storage backends for `credit-gate-core` that need the filesystem.
//!
//! This crate provides [`FileStorage`], a JSON file-backed implementation of
//! the [`Storage`](credit_gate_core::Storage) trait suitable for CLI tools and
//! single-process servers that do not need a full database.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use credit_gate_std::storage::FileStorage;
//! use credit_gate_core::{Config, Enforcer};
//!
//! let storage = FileStorage::open("/var/lib/credit-gate/accounts.json")
//!     .expect("failed to open storage file");
//!
//! let enforcer = Enforcer::new(Config::default(), storage).expect("invalid config");
//! ```

pub mod storage;

pub use storage::file::FileStorage;
