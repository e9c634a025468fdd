use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use getset::Getters;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// The number of hex characters in a snapshot id.
pub const SNAPSHOT_ID_LEN: usize = 16;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// An immutable capture of the frozen domains at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
#[getset(get = "pub with_prefix")]
pub struct Snapshot {
    /// The human label. Not unique.
    name: String,

    /// The unique id.
    #[serde(rename = "snapshot_id")]
    id: String,

    /// When the capture started.
    created_at: DateTime<Utc>,

    /// Domain name to SHA-256 fingerprint of the domain's contents at capture time.
    #[serde(rename = "domains")]
    fingerprints: BTreeMap<String, String>,

    /// Free-form notes.
    #[serde(default)]
    description: String,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl Snapshot {
    /// Creates a snapshot record.
    pub fn new(
        name: impl Into<String>,
        id: impl Into<String>,
        created_at: DateTime<Utc>,
        fingerprints: BTreeMap<String, String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            created_at,
            fingerprints,
            description: description.into(),
        }
    }

    /// Derives a snapshot id from its label and capture time.
    pub fn generate_id(label: &str, created_at: &DateTime<Utc>) -> String {
        let mut hasher = Sha256::new();
        hasher.update(label.as_bytes());
        hasher.update(
            created_at
                .to_rfc3339_opts(SecondsFormat::Nanos, true)
                .as_bytes(),
        );
        let mut id = hex::encode(hasher.finalize());
        id.truncate(SNAPSHOT_ID_LEN);
        id
    }

    /// The names of the domains this snapshot covers.
    pub fn domain_names(&self) -> impl Iterator<Item = &str> {
        self.fingerprints.keys().map(String::as_str)
    }

    /// Whether the snapshot covers the domain `name`.
    pub fn covers(&self, name: &str) -> bool {
        self.fingerprints.contains_key(name)
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
