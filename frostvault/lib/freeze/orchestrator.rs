use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use getset::Getters;
use serde::Serialize;
use tokio::fs;

use crate::{
    domain::{DomainKind, DomainRegistry},
    mount::{self, Mounter},
    snapshot::{Snapshot, SnapshotStore},
    utils::StorageLayout,
    vcs::{CommitOutcome, GitTracker, VersionTracker},
    FrostvaultError, FrostvaultResult,
};

use super::FreezeState;

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// Prefix of the config commit recorded after every snapshot.
pub const SNAPSHOT_COMMIT_PREFIX: &str = "Snapshot: ";

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Coordinates domains, snapshots, presentation and config history under one base path.
#[derive(Debug, Getters)]
#[getset(get = "pub with_prefix")]
pub struct FreezeOrchestrator {
    /// Where everything is stored.
    pub(super) layout: StorageLayout,

    /// The domain table.
    pub(super) registry: DomainRegistry,

    /// The snapshot index.
    pub(super) snapshots: SnapshotStore,

    /// The freeze flag.
    pub(super) state: FreezeState,

    #[getset(skip)]
    mounter: Option<Arc<dyn Mounter>>,

    #[getset(skip)]
    initialized: bool,
}

/// Result of [`FreezeOrchestrator::init`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InitOutcome {
    /// Storage was set up.
    Initialized,

    /// Storage existed and was loaded unchanged.
    AlreadyInitialized,
}

/// What happened to the config domain after a snapshot was captured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConfigCommit {
    /// Changes were committed.
    Committed {
        /// Short id of the commit.
        id: String,
    },

    /// The config domain had no changes.
    Unchanged,

    /// The commit failed. The snapshot is still valid.
    Failed {
        /// What went wrong.
        reason: String,
    },

    /// No domain is version controlled.
    Skipped,
}

/// Result of [`FreezeOrchestrator::create_snapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize)]
#[getset(get = "pub with_prefix")]
pub struct SnapshotCreated {
    /// The registered snapshot.
    snapshot: Snapshot,

    /// The follow-up config commit.
    config_commit: ConfigCommit,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl FreezeOrchestrator {
    /// Creates an orchestrator for `base`. Nothing is read until [`init`](Self::init) or
    /// [`load`](Self::load).
    pub fn new(base: impl Into<PathBuf>) -> Self {
        let layout = StorageLayout::new(base);
        Self {
            registry: DomainRegistry::new(layout.clone()),
            snapshots: SnapshotStore::new(layout.clone()),
            layout,
            state: FreezeState::default(),
            mounter: None,
            initialized: false,
        }
    }

    /// Uses `mounter` instead of probing for a mount backend.
    pub fn with_mounter(mut self, mounter: Arc<dyn Mounter>) -> Self {
        self.mounter = Some(mounter);
        self
    }

    /// Creates an orchestrator for `base` and loads its records.
    ///
    /// ## Errors
    /// - `NotInitialized` if `base` has never been initialized
    pub async fn open(base: impl Into<PathBuf>) -> FrostvaultResult<Self> {
        let mut orchestrator = Self::new(base);
        orchestrator.load().await?;
        Ok(orchestrator)
    }

    /// Loads the domain table, the snapshot index and the freeze flag.
    pub async fn load(&mut self) -> FrostvaultResult<()> {
        if !fs::try_exists(self.layout.base()).await.unwrap_or(false) {
            return Err(FrostvaultError::NotInitialized(
                self.layout.base().to_path_buf(),
            ));
        }

        self.rebase().await?;
        self.registry.load().await?;
        self.snapshots.load().await?;
        self.state = FreezeState::load(&self.layout).await?;
        self.initialized = true;

        tracing::debug!("loaded frostvault state from {}", self.layout.base().display());
        Ok(())
    }

    /// Sets up base storage, the default domains, the config repository and the durable records.
    ///
    /// Running it on storage that is already initialized only loads it.
    pub async fn init(&mut self) -> FrostvaultResult<InitOutcome> {
        if self.registry.record_exists() {
            self.load().await?;
            tracing::info!("frostvault already initialized at {}", self.layout.base().display());
            return Ok(InitOutcome::AlreadyInitialized);
        }

        let base = self.layout.base().to_path_buf();
        fs::create_dir_all(&base)
            .await
            .map_err(FrostvaultError::at(&base))?;
        self.rebase().await?;

        self.registry.initialize_defaults().await?;

        let snapshots_dir = self.layout.snapshots_dir();
        fs::create_dir_all(&snapshots_dir)
            .await
            .map_err(FrostvaultError::at(&snapshots_dir))?;

        if let Some(tracker) = self.config_tracker() {
            let state = tokio::task::spawn_blocking(move || tracker.ensure_repository()).await??;
            tracing::debug!("config repository {:?}", state);
        }

        self.snapshots.save().await?;
        self.state = FreezeState::default();
        self.state.save(&self.layout).await?;

        // The domain record marks storage as initialized, so it goes last
        self.registry.save().await?;
        self.initialized = true;

        tracing::info!("initialized frostvault at {}", self.layout.base().display());
        Ok(InitOutcome::Initialized)
    }

    /// Commits the config domain with the message `Snapshot: <name>`, then captures every frozen
    /// domain as a snapshot called `name`. Restoring the snapshot brings back that commit.
    ///
    /// A failed commit is reported in the result and does not prevent the snapshot.
    pub async fn create_snapshot(
        &mut self,
        name: &str,
        description: &str,
    ) -> FrostvaultResult<SnapshotCreated> {
        self.ensure_initialized()?;

        // Committed first so the captured repository already holds the labelled commit
        let message = format!("{SNAPSHOT_COMMIT_PREFIX}{name}");
        let config_commit = match self.commit_config(&message).await {
            Ok(CommitOutcome::Committed { id }) => ConfigCommit::Committed { id },
            Ok(CommitOutcome::NothingToCommit) => ConfigCommit::Unchanged,
            Err(FrostvaultError::DomainNotFound(_)) => ConfigCommit::Skipped,
            Err(e) => {
                tracing::warn!("config commit for snapshot {} failed: {}", name, e);
                ConfigCommit::Failed {
                    reason: e.to_string(),
                }
            }
        };

        let paths = self.registry.frozen_paths();
        let snapshot = self.snapshots.capture(name, &paths, description).await?;

        Ok(SnapshotCreated {
            snapshot,
            config_commit,
        })
    }

    /// Suspends protection. Boot restores are skipped until [`freeze`](Self::freeze).
    pub async fn thaw(&mut self) -> FrostvaultResult<()> {
        self.ensure_initialized()?;
        self.state.thaw();
        self.state.save(&self.layout).await?;
        tracing::info!("frozen domains thawed");
        Ok(())
    }

    /// Resumes protection.
    pub async fn freeze(&mut self) -> FrostvaultResult<()> {
        self.ensure_initialized()?;
        self.state.freeze();
        self.state.save(&self.layout).await?;
        tracing::info!("frozen domains frozen");
        Ok(())
    }

    /// Makes the snapshot with id or name `id_or_name` the default.
    pub async fn set_default_snapshot(&mut self, id_or_name: &str) -> FrostvaultResult<()> {
        self.ensure_initialized()?;
        let id = self.snapshots.resolve(id_or_name)?.get_id().clone();
        self.snapshots.set_default(&id).await
    }

    /// All snapshots, oldest first.
    pub fn list_snapshots(&self) -> FrostvaultResult<Vec<&Snapshot>> {
        self.ensure_initialized()?;
        Ok(self.snapshots.list())
    }

    /// Deletes the snapshot with id or name `id_or_name`.
    pub async fn remove_snapshot(&mut self, id_or_name: &str) -> FrostvaultResult<Snapshot> {
        self.ensure_initialized()?;
        let id = self.snapshots.resolve(id_or_name)?.get_id().clone();
        self.snapshots.remove(&id).await
    }

    /// Whether storage is initialized and loaded.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// The base path.
    pub fn base(&self) -> &Path {
        self.layout.base()
    }

    pub(super) fn ensure_initialized(&self) -> FrostvaultResult<()> {
        if self.initialized {
            return Ok(());
        }

        Err(FrostvaultError::NotInitialized(
            self.layout.base().to_path_buf(),
        ))
    }

    /// The mount backend, probed on first use.
    pub(super) async fn mounter(&mut self) -> Arc<dyn Mounter> {
        if let Some(mounter) = &self.mounter {
            return Arc::clone(mounter);
        }

        let mounter = mount::select_mounter().await;
        self.mounter = Some(Arc::clone(&mounter));
        mounter
    }

    /// The tracker of the version-controlled config domain.
    pub(super) fn config_tracker(&self) -> Option<Arc<dyn VersionTracker>> {
        let domain = self
            .registry
            .by_kind(DomainKind::Config)
            .filter(|d| d.is_versioned())
            .or_else(|| self.registry.domains().into_iter().find(|d| d.is_versioned()))?;

        Some(Arc::new(GitTracker::new(domain.get_path().clone())))
    }

    /// Resolves the base path to its canonical form so every recorded path is absolute.
    async fn rebase(&mut self) -> FrostvaultResult<()> {
        let base = self.layout.base().to_path_buf();
        let canonical = fs::canonicalize(&base)
            .await
            .map_err(FrostvaultError::at(&base))?;

        if canonical != base {
            self.layout = StorageLayout::new(canonical);
            self.registry = DomainRegistry::new(self.layout.clone());
            self.snapshots = SnapshotStore::new(self.layout.clone());
        }

        Ok(())
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use crate::mount::RedirectMounter;

    use super::*;

    fn orchestrator(base: &Path) -> FreezeOrchestrator {
        FreezeOrchestrator::new(base).with_mounter(Arc::new(RedirectMounter::new()))
    }

    #[test_log::test(tokio::test)]
    async fn test_init_is_reentrant() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let base = temp_dir.path().join("vault");

        let mut first = orchestrator(&base);
        assert_eq!(first.init().await?, InitOutcome::Initialized);
        assert!(first.is_initialized());
        assert!(first.get_layout().domains_file().exists());
        assert!(first.get_layout().snapshots_file().exists());
        assert!(first.get_layout().domain_dir("cfg").join(".git").is_dir());

        let mut second = orchestrator(&base);
        assert_eq!(second.init().await?, InitOutcome::AlreadyInitialized);
        assert_eq!(
            second.get_registry().domains(),
            first.get_registry().domains()
        );

        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_operations_require_initialization() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let mut orchestrator = orchestrator(temp_dir.path());

        assert!(matches!(
            orchestrator.create_snapshot("base", "").await,
            Err(FrostvaultError::NotInitialized(_))
        ));
        assert!(matches!(
            orchestrator.thaw().await,
            Err(FrostvaultError::NotInitialized(_))
        ));
        assert!(matches!(
            FreezeOrchestrator::open(temp_dir.path()).await,
            Err(FrostvaultError::NotInitialized(_))
        ));
        assert!(matches!(
            FreezeOrchestrator::open(temp_dir.path().join("missing")).await,
            Err(FrostvaultError::NotInitialized(_))
        ));

        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_create_snapshot_commits_config() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let mut orchestrator = orchestrator(temp_dir.path());
        orchestrator.init().await?;

        let cfg = orchestrator.get_layout().domain_dir("cfg");
        fs::write(cfg.join("network.conf"), b"dhcp=true\n").await?;

        let created = orchestrator.create_snapshot("base", "clean install").await?;
        assert!(matches!(
            created.get_config_commit(),
            ConfigCommit::Committed { .. }
        ));
        assert!(created.get_snapshot().covers("sys"));
        assert!(created.get_snapshot().covers("cfg"));
        assert!(!created.get_snapshot().covers("user"));

        let again = orchestrator.create_snapshot("again", "").await?;
        assert_eq!(again.get_config_commit(), &ConfigCommit::Unchanged);

        let history = orchestrator.config_history(1).await?;
        assert_eq!(history[0].summary, "Snapshot: base");

        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_set_default_and_remove_by_name() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let mut orchestrator = orchestrator(temp_dir.path());
        orchestrator.init().await?;

        let created = orchestrator.create_snapshot("base", "").await?;
        orchestrator.set_default_snapshot("base").await?;
        assert_eq!(
            orchestrator.get_snapshots().default_snapshot(),
            Some(created.get_snapshot())
        );

        orchestrator.remove_snapshot("base").await?;
        assert!(orchestrator.list_snapshots()?.is_empty());
        assert!(orchestrator.get_snapshots().default_snapshot().is_none());

        Ok(())
    }
}
