use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    config::DEFAULT_RECENT_SNAPSHOTS,
    domain::{Domain, DomainKind, ResetPolicy},
    mount::{self, MountKind},
    snapshot::Snapshot,
    utils::{self, DiskUsage},
    vcs::RepositoryStatus,
    FrostvaultResult,
};

use super::FreezeOrchestrator;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Everything `frostvault status` reports.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    /// The base path.
    pub base_path: PathBuf,

    /// The operating system.
    pub platform: String,

    /// The preferred presentation strategy on this machine.
    pub mount_strategy: MountKind,

    /// Whether protection is suspended.
    pub thawed: bool,

    /// Every domain, in kind order.
    pub domains: Vec<DomainStatus>,

    /// Number of registered snapshots.
    pub snapshot_count: usize,

    /// The default snapshot.
    pub default_snapshot: Option<SnapshotSummary>,

    /// The most recent snapshots, newest first.
    pub recent_snapshots: Vec<SnapshotSummary>,

    /// The config repository, if it could be read.
    pub config_repository: Option<RepositoryStatus>,
}

/// One domain in a [`StatusReport`].
#[derive(Debug, Clone, Serialize)]
pub struct DomainStatus {
    /// The domain name.
    pub name: String,

    /// The domain kind.
    pub kind: DomainKind,

    /// The live path.
    pub path: PathBuf,

    /// The reset policy.
    pub reset_policy: ResetPolicy,

    /// Whether the domain is versioned.
    pub versioned: bool,

    /// Whether the domain is frozen.
    pub frozen: bool,

    /// Whether the live path exists.
    pub exists: bool,

    /// How the domain is currently presented, if at all.
    pub presentation: Option<MountKind>,

    /// Space on the filesystem holding the live path. Zero when the path is missing.
    pub disk_usage: DiskUsage,
}

/// A snapshot in a [`StatusReport`].
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotSummary {
    /// The snapshot id.
    pub id: String,

    /// The snapshot label.
    pub name: String,

    /// When it was captured.
    pub created_at: DateTime<Utc>,

    /// Free-form notes.
    pub description: String,

    /// The domains it covers.
    pub domains: Vec<String>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl FreezeOrchestrator {
    /// Builds a report of the whole system.
    ///
    /// An unreadable config repository is left out of the report rather than failing it.
    pub async fn status(&mut self) -> FrostvaultResult<StatusReport> {
        self.ensure_initialized()?;
        let mounter = self.mounter().await;

        let mut domains = Vec::new();
        for domain in self.registry.domains() {
            let presentation = if domain.is_frozen() {
                let view = self.layout.view_dir(domain.get_name());
                mount::presentation_of(mounter.as_ref(), &view).await?
            } else {
                None
            };
            let disk_usage = match utils::disk_usage(domain.get_path()).await {
                Ok(usage) => usage,
                Err(e) => {
                    tracing::warn!("could not read disk usage of {}: {}", domain.get_name(), e);
                    DiskUsage::default()
                }
            };
            domains.push(DomainStatus::new(domain, presentation, disk_usage));
        }

        let config_repository = match self.config_status().await {
            Ok(status) => Some(status),
            Err(e) => {
                tracing::warn!("could not read config repository status: {}", e);
                None
            }
        };

        Ok(StatusReport {
            base_path: self.layout.base().to_path_buf(),
            platform: std::env::consts::OS.to_string(),
            mount_strategy: mounter.kind(),
            thawed: self.state.is_thawed(),
            domains,
            snapshot_count: self.snapshots.len(),
            default_snapshot: self.snapshots.default_snapshot().map(SnapshotSummary::from),
            recent_snapshots: self
                .snapshots
                .recent(DEFAULT_RECENT_SNAPSHOTS)
                .into_iter()
                .map(SnapshotSummary::from)
                .collect(),
            config_repository,
        })
    }
}

impl DomainStatus {
    fn new(domain: &Domain, presentation: Option<MountKind>, disk_usage: DiskUsage) -> Self {
        Self {
            name: domain.get_name().clone(),
            kind: *domain.get_kind(),
            path: domain.get_path().clone(),
            reset_policy: *domain.get_reset_policy(),
            versioned: domain.is_versioned(),
            frozen: domain.is_frozen(),
            exists: domain.exists(),
            presentation,
            disk_usage,
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl From<&Snapshot> for SnapshotSummary {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            id: snapshot.get_id().clone(),
            name: snapshot.get_name().clone(),
            created_at: *snapshot.get_created_at(),
            description: snapshot.get_description().clone(),
            domains: snapshot.domain_names().map(str::to_string).collect(),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tempfile::TempDir;

    use crate::mount::RedirectMounter;

    use super::*;

    #[test_log::test(tokio::test)]
    async fn test_status_report() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let mut orchestrator = FreezeOrchestrator::new(temp_dir.path())
            .with_mounter(Arc::new(RedirectMounter::new()));
        orchestrator.init().await?;

        for i in 0..7 {
            orchestrator.create_snapshot(&format!("s{i}"), "").await?;
        }
        orchestrator.set_default_snapshot("s0").await?;
        orchestrator.present_domains().await?;
        orchestrator.thaw().await?;

        let report = orchestrator.status().await?;

        assert!(report.thawed);
        assert_eq!(report.mount_strategy, MountKind::Redirect);
        assert_eq!(report.snapshot_count, 7);
        assert_eq!(report.recent_snapshots.len(), DEFAULT_RECENT_SNAPSHOTS);
        assert_eq!(report.recent_snapshots[0].name, "s6");
        assert_eq!(report.default_snapshot.clone().map(|s| s.name), Some("s0".to_string()));

        let names: Vec<_> = report.domains.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["sys", "cfg", "user", "cache"]);
        assert!(report.domains.iter().all(|d| d.exists));
        assert_eq!(report.domains[0].presentation, Some(MountKind::Redirect));
        assert_eq!(report.domains[2].presentation, None);
        #[cfg(unix)]
        assert!(report.domains.iter().all(|d| d.disk_usage.total > 0));

        let repository = report.config_repository.as_ref().expect("config repository");
        assert!(repository.clean);

        let json = serde_json::to_value(&report)?;
        assert_eq!(json["domains"][1]["reset_policy"], "optional");
        assert_eq!(json["mount_strategy"], "redirect");
        assert!(json["domains"][0]["disk_usage"]["free"].is_u64());

        Ok(())
    }
}
