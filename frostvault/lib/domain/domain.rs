use std::path::PathBuf;

use getset::Getters;
use serde::{Deserialize, Serialize};

use super::{DomainKind, ResetPolicy};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A named, policy-tagged storage area.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
#[getset(get = "pub with_prefix")]
pub struct Domain {
    /// The unique name of the domain.
    name: String,

    /// The kind of the domain.
    #[serde(rename = "domain_type")]
    kind: DomainKind,

    /// The absolute path of the domain's live storage.
    path: PathBuf,

    /// What happens to the domain's contents across resets.
    reset_policy: ResetPolicy,

    /// Whether the config version tracker records the domain's history.
    #[serde(rename = "use_git", default)]
    versioned: bool,

    /// Whether the domain is frozen behind an overlay or redirect.
    #[serde(rename = "use_overlay", default)]
    frozen: bool,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl Domain {
    /// Creates the default domain of `kind` stored at `path`, following the kind's fixed policy.
    pub fn with_default_policy(kind: DomainKind, path: impl Into<PathBuf>) -> Self {
        let policy = kind.policy();
        Self {
            name: kind.as_str().to_string(),
            kind,
            path: path.into(),
            reset_policy: policy.reset_policy,
            versioned: policy.versioned,
            frozen: policy.overlay,
        }
    }

    /// Whether the domain is frozen.
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Whether the domain's history is version controlled.
    pub fn is_versioned(&self) -> bool {
        self.versioned
    }

    /// Whether the domain's live path currently exists.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}
