// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! File-based JSON storage backend.
//!
//! [`FileStorage`] persists every account record and the usage log to a
//! single JSON file on disk.  Every mutation flushes the file atomically
//! (write-rename) so that a crash mid-write does not corrupt existing data.
//!
//! ## Layout
//!
//! ```json
//! {
//!   "accounts": { "<account_id>": Account, ... },
//!   "usage":    [ UsageEvent, ... ]
//! }
//! ```
//!
//! ## Caveats
//!
//! * [`FileStorage`] holds the full state in memory and rewrites the file on
//!   every mutation.  It is not intended for high-frequency write workloads.
//! * Concurrent access from multiple processes is not supported.  Within one
//!   process the engine's account book serialises access.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use credit_gate_core::storage::Storage;
use credit_gate_core::types::{Account, UsageEvent, UsageFilter};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Snapshot of all metering state, serialised to / deserialised from disk.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StorageSnapshot {
    #[serde(default)]
    accounts: HashMap<String, Account>,
    #[serde(default)]
    usage: Vec<UsageEvent>,
}

/// A file-backed [`Storage`] implementation that persists state as JSON.
///
/// Write failures inside the [`Storage`] methods are logged at `warn` and the
/// in-memory state stays authoritative; call [`flush`](FileStorage::flush)
/// directly when durability must be confirmed.
///
/// # Examples
///
/// ```rust,no_run
/// use chrono::Utc;
/// use credit_gate_core::{Account, PlanTier, Storage};
/// use credit_gate_std::storage::file::FileStorage;
///
/// let mut storage = FileStorage::open("/tmp/credit-gate.json")
///     .expect("could not open storage");
///
/// let now = Utc::now();
/// storage.set_account(Account {
///     account_id: "acct-1".into(),
///     plan_tier: PlanTier::Free,
///     free_credits: 5,
///     premium_credits: 0,
///     general_question_counter: 0,
///     daily_reset_at: now,
///     monthly_contacts_used: 0,
///     monthly_reset_at: now,
/// });
/// assert!(storage.get_account("acct-1").is_some());
/// ```
pub struct FileStorage {
    path: PathBuf,
    data: StorageSnapshot,
}

impl FileStorage {
    /// Open an existing JSON storage file, or start empty if the path does
    /// not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an [`io::Error`] if the file exists but cannot be read or if
    /// the JSON is malformed.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let data = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            serde_json::from_str(&raw).map_err(|error| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("credit storage JSON parse error: {error}"),
                )
            })?
        } else {
            StorageSnapshot::default()
        };

        Ok(Self { path, data })
    }

    /// Flush the current in-memory state to disk using an atomic write-rename.
    ///
    /// The file is written to `<path>.tmp` first, then renamed over the
    /// target, so a crash during the write never leaves a partial file.
    pub fn flush(&self) -> io::Result<()> {
        let json = serde_json::to_string_pretty(&self.data).map_err(|error| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("credit storage serialisation error: {error}"),
            )
        })?;

        let tmp_path = self.path.with_extension("tmp");
        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush_or_warn(&self) {
        if let Err(error) = self.flush() {
            warn!(path = %self.path.display(), %error, "failed to flush credit storage");
        }
    }
}

impl Storage for FileStorage {
    fn get_account(&self, account_id: &str) -> Option<Account> {
        self.data.accounts.get(account_id).cloned()
    }

    fn set_account(&mut self, account: Account) {
        self.data.accounts.insert(account.account_id.clone(), account);
        self.flush_or_warn();
    }

    fn append_usage(&mut self, event: UsageEvent) {
        self.data.usage.push(event);
        self.flush_or_warn();
    }

    fn query_usage(&self, filter: &UsageFilter) -> Vec<UsageEvent> {
        self.data
            .usage
            .iter()
            .filter(|event| filter.matches(event))
            .take(filter.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }
}
