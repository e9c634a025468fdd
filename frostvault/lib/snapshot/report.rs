use std::collections::BTreeMap;

use getset::Getters;
use serde::Serialize;

use crate::{FrostvaultError, FrostvaultResult};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// What happened to one domain during a restore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DomainRestore {
    /// The live path now matches the stored copy.
    Restored {
        /// Number of files and links written.
        entries: usize,
    },

    /// The live path was left untouched.
    Failed {
        /// Why the domain could not be restored.
        reason: String,
    },
}

/// Per-domain outcome of restoring one snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize)]
#[getset(get = "pub with_prefix")]
pub struct RestoreReport {
    /// The snapshot that was restored.
    snapshot_id: String,

    /// Outcome per domain name.
    domains: BTreeMap<String, DomainRestore>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl RestoreReport {
    /// Creates an empty report for `snapshot_id`.
    pub fn new(snapshot_id: impl Into<String>) -> Self {
        Self {
            snapshot_id: snapshot_id.into(),
            domains: BTreeMap::new(),
        }
    }

    /// Records the outcome for the domain `name`.
    pub fn record(&mut self, name: impl Into<String>, outcome: DomainRestore) {
        self.domains.insert(name.into(), outcome);
    }

    /// Whether every domain restored.
    pub fn is_success(&self) -> bool {
        self.failed().is_empty()
    }

    /// The domains that failed to restore.
    pub fn failed(&self) -> Vec<String> {
        self.domains
            .iter()
            .filter(|(_, outcome)| matches!(outcome, DomainRestore::Failed { .. }))
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// The domains that restored.
    pub fn restored(&self) -> Vec<String> {
        self.domains
            .iter()
            .filter(|(_, outcome)| matches!(outcome, DomainRestore::Restored { .. }))
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Turns a partially failed report into `RestoreIncomplete`.
    pub fn into_result(self) -> FrostvaultResult<Self> {
        let failed = self.failed();
        if failed.is_empty() {
            return Ok(self);
        }

        Err(FrostvaultError::RestoreIncomplete {
            snapshot_id: self.snapshot_id,
            failed,
        })
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
