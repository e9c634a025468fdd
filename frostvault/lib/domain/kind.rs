use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::FrostvaultError;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The kind of a storage domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DomainKind {
    /// Operating system and applications. Frozen.
    #[serde(rename = "sys")]
    System,

    /// Configuration. Frozen and versioned.
    #[serde(rename = "cfg")]
    Config,

    /// Home directories. Persistent.
    #[serde(rename = "user")]
    User,

    /// Temporary files. Always reset.
    #[serde(rename = "cache")]
    Cache,
}

/// What happens to a domain's contents across resets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResetPolicy {
    /// Changes are discarded on reset.
    #[serde(rename = "discard")]
    Discard,

    /// Changes may be committed or discarded.
    #[serde(rename = "optional")]
    OptionalCommit,

    /// Never reset.
    #[serde(rename = "persistent")]
    Persistent,

    /// Reset every time.
    #[serde(rename = "always")]
    AlwaysReset,
}

/// The fixed policy row of a domain kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainPolicy {
    /// The reset policy.
    pub reset_policy: ResetPolicy,

    /// Whether changes are tracked by the config version tracker.
    pub versioned: bool,

    /// Whether the domain is frozen behind an overlay or redirect.
    pub overlay: bool,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl DomainKind {
    /// Every domain kind, in creation order.
    pub const ALL: [DomainKind; 4] = [
        DomainKind::System,
        DomainKind::Config,
        DomainKind::User,
        DomainKind::Cache,
    ];

    /// The short tag used as the domain's name and directory.
    pub fn as_str(&self) -> &'static str {
        match self {
            DomainKind::System => "sys",
            DomainKind::Config => "cfg",
            DomainKind::User => "user",
            DomainKind::Cache => "cache",
        }
    }

    /// The fixed policy for this kind.
    pub fn policy(&self) -> DomainPolicy {
        let (reset_policy, versioned, overlay) = match self {
            DomainKind::System => (ResetPolicy::Discard, false, true),
            DomainKind::Config => (ResetPolicy::OptionalCommit, true, true),
            DomainKind::User => (ResetPolicy::Persistent, false, false),
            DomainKind::Cache => (ResetPolicy::AlwaysReset, false, false),
        };

        DomainPolicy {
            reset_policy,
            versioned,
            overlay,
        }
    }
}

impl ResetPolicy {
    /// The tag stored in the domain record.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResetPolicy::Discard => "discard",
            ResetPolicy::OptionalCommit => "optional",
            ResetPolicy::Persistent => "persistent",
            ResetPolicy::AlwaysReset => "always",
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl fmt::Display for DomainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ResetPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DomainKind {
    type Err = FrostvaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DomainKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| FrostvaultError::DomainNotFound(s.to_string()))
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_table() {
        let table: Vec<_> = DomainKind::ALL
            .iter()
            .map(|kind| {
                let p = kind.policy();
                (kind.as_str(), p.reset_policy, p.versioned, p.overlay)
            })
            .collect();

        assert_eq!(
            table,
            vec![
                ("sys", ResetPolicy::Discard, false, true),
                ("cfg", ResetPolicy::OptionalCommit, true, true),
                ("user", ResetPolicy::Persistent, false, false),
                ("cache", ResetPolicy::AlwaysReset, false, false),
            ]
        );
    }

    #[test]
    fn test_record_tags() -> anyhow::Result<()> {
        assert_eq!(serde_json::to_string(&DomainKind::Config)?, "\"cfg\"");
        assert_eq!(
            serde_json::to_string(&ResetPolicy::OptionalCommit)?,
            "\"optional\""
        );
        assert_eq!("cache".parse::<DomainKind>()?, DomainKind::Cache);
        assert!("home".parse::<DomainKind>().is_err());
        assert!(serde_json::from_str::<ResetPolicy>("\"sometimes\"").is_err());
        Ok(())
    }
}
