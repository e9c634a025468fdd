use std::{
    collections::BTreeMap,
    io,
    path::{Path, PathBuf},
};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::{
    tree::{self, CopyOptions, CopyStats, CopyStrategy},
    utils::StorageLayout,
    FrostvaultError, FrostvaultResult,
};

use super::{fingerprint, DomainRestore, RestoreReport, Snapshot};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// Prefix of the directory a capture is assembled in before it is registered.
const STAGING_PREFIX: &str = ".staging-";

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Owns the snapshot index and the stored copies.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    layout: StorageLayout,
    index: SnapshotIndex,
}

/// The on-disk shape of `snapshots.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SnapshotIndex {
    #[serde(default)]
    snapshots: BTreeMap<String, Snapshot>,

    #[serde(default)]
    default_snapshot: Option<String>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl SnapshotStore {
    /// Creates a store with an empty index for the storage under `layout`.
    pub fn new(layout: StorageLayout) -> Self {
        Self {
            layout,
            index: SnapshotIndex::default(),
        }
    }

    /// Creates a store and loads its index.
    pub async fn open(layout: StorageLayout) -> FrostvaultResult<Self> {
        let mut store = Self::new(layout);
        store.load().await?;
        Ok(store)
    }

    /// Reads the index from `snapshots.json`. A missing index is an empty one.
    ///
    /// ## Errors
    /// - `CorruptState` if the index cannot be parsed
    pub async fn load(&mut self) -> FrostvaultResult<()> {
        let path = self.layout.snapshots_file();
        let contents = match fs::read(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.index = SnapshotIndex::default();
                return Ok(());
            }
            Err(e) => return Err(FrostvaultError::storage(&path, e)),
        };

        self.index = serde_json::from_slice(&contents)
            .map_err(|source| FrostvaultError::CorruptState { path, source })?;

        Ok(())
    }

    /// Writes the index to `snapshots.json`, replacing the previous record atomically.
    pub async fn save(&self) -> FrostvaultResult<()> {
        let contents = serde_json::to_vec_pretty(&self.index)?;
        frostutils::write_atomic(self.layout.snapshots_file(), contents).await?;
        Ok(())
    }

    /// Captures the trees at `domain_paths` as a new snapshot called `label`.
    ///
    /// Each existing path is copied into a staging directory and fingerprinted. Paths that do not
    /// exist are left out of the snapshot. Only once every domain is stored is the staging
    /// directory renamed to its final place and the snapshot registered.
    ///
    /// ## Errors
    /// Any failure removes the staging directory and leaves the index unchanged.
    pub async fn capture(
        &mut self,
        label: &str,
        domain_paths: &BTreeMap<String, PathBuf>,
        description: &str,
    ) -> FrostvaultResult<Snapshot> {
        let snapshots_dir = self.layout.snapshots_dir();
        fs::create_dir_all(&snapshots_dir)
            .await
            .map_err(FrostvaultError::at(&snapshots_dir))?;

        let (id, created_at) = loop {
            let created_at = Utc::now();
            let id = Snapshot::generate_id(label, &created_at);
            if !self.index.snapshots.contains_key(&id) && !self.snapshot_dir(&id).exists() {
                break (id, created_at);
            }
        };

        let staging = snapshots_dir.join(format!("{STAGING_PREFIX}{id}"));
        let final_dir = self.snapshot_dir(&id);
        tracing::info!("capturing snapshot {} ({})", label, id);

        let staged = async {
            let fingerprints = stage_domains(&staging, domain_paths).await?;
            fs::rename(&staging, &final_dir)
                .await
                .map_err(FrostvaultError::at(&final_dir))?;
            Ok::<_, FrostvaultError>(fingerprints)
        }
        .await;

        let fingerprints = match staged {
            Ok(fingerprints) => fingerprints,
            Err(e) => {
                tracing::error!("capture of snapshot {} failed: {}", label, e);
                remove_tree(&staging).await;
                return Err(e);
            }
        };

        let snapshot = Snapshot::new(label, &id, created_at, fingerprints, description);
        self.index.snapshots.insert(id.clone(), snapshot.clone());

        if let Err(e) = self.save().await {
            tracing::error!("could not register snapshot {}: {}", id, e);
            self.index.snapshots.remove(&id);
            remove_tree(&final_dir).await;
            return Err(e);
        }

        tracing::info!(
            "snapshot {} ({}) captured {} domains",
            label,
            id,
            snapshot.get_fingerprints().len()
        );

        Ok(snapshot)
    }

    /// Writes the stored copy of snapshot `id` back onto `target_paths`.
    ///
    /// Only domains covered by the snapshot and present in `target_paths` are touched. Each
    /// domain is restored independently and its outcome recorded in the report; one failing
    /// domain does not stop the others.
    ///
    /// ## Errors
    /// - `SnapshotNotFound` if `id` is unknown or its stored copy is gone
    pub async fn restore(
        &self,
        id: &str,
        target_paths: &BTreeMap<String, PathBuf>,
    ) -> FrostvaultResult<RestoreReport> {
        let snapshot = self
            .get_by_id(id)
            .ok_or_else(|| FrostvaultError::SnapshotNotFound(id.to_string()))?;

        let stored_dir = self.snapshot_dir(id);
        if !stored_dir.is_dir() {
            tracing::error!("stored copy of snapshot {} is missing", id);
            return Err(FrostvaultError::SnapshotNotFound(id.to_string()));
        }

        tracing::info!("restoring snapshot {} ({})", snapshot.get_name(), id);
        let mut report = RestoreReport::new(id);

        for name in snapshot.domain_names() {
            let Some(target) = target_paths.get(name) else {
                tracing::debug!("domain {} not requested, skipping", name);
                continue;
            };

            let outcome = match restore_domain(&stored_dir.join(name), target, id).await {
                Ok(stats) => {
                    tracing::info!("restored domain {} at {}", name, target.display());
                    DomainRestore::Restored {
                        entries: stats.copied + stats.linked + stats.symlinks,
                    }
                }
                Err(e) => {
                    tracing::error!("failed to restore domain {}: {}", name, e);
                    DomainRestore::Failed {
                        reason: e.to_string(),
                    }
                }
            };

            report.record(name, outcome);
        }

        Ok(report)
    }

    /// Makes snapshot `id` the default restored at boot.
    ///
    /// ## Errors
    /// - `SnapshotNotFound` if `id` is unknown. The previous default is kept.
    pub async fn set_default(&mut self, id: &str) -> FrostvaultResult<()> {
        if !self.index.snapshots.contains_key(id) {
            return Err(FrostvaultError::SnapshotNotFound(id.to_string()));
        }

        let previous = self.index.default_snapshot.replace(id.to_string());
        if let Err(e) = self.save().await {
            self.index.default_snapshot = previous;
            return Err(e);
        }

        tracing::info!("default snapshot set to {}", id);
        Ok(())
    }

    /// Deletes snapshot `id`, its stored copy and, if it was the default, the default setting.
    pub async fn remove(&mut self, id: &str) -> FrostvaultResult<Snapshot> {
        let snapshot = self
            .index
            .snapshots
            .remove(id)
            .ok_or_else(|| FrostvaultError::SnapshotNotFound(id.to_string()))?;

        let previous_default = self.index.default_snapshot.clone();
        if previous_default.as_deref() == Some(id) {
            self.index.default_snapshot = None;
        }

        if let Err(e) = self.save().await {
            self.index.snapshots.insert(id.to_string(), snapshot);
            self.index.default_snapshot = previous_default;
            return Err(e);
        }

        let dir = self.snapshot_dir(id);
        match fs::remove_dir_all(&dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(FrostvaultError::storage(&dir, e)),
        }

        tracing::info!("removed snapshot {} ({})", snapshot.get_name(), id);
        Ok(snapshot)
    }

    /// All snapshots, oldest first.
    pub fn list(&self) -> Vec<&Snapshot> {
        let mut snapshots: Vec<_> = self.index.snapshots.values().collect();
        snapshots.sort_by(|a, b| {
            a.get_created_at()
                .cmp(b.get_created_at())
                .then_with(|| a.get_id().cmp(b.get_id()))
        });
        snapshots
    }

    /// The `count` newest snapshots, newest first.
    pub fn recent(&self, count: usize) -> Vec<&Snapshot> {
        self.list().into_iter().rev().take(count).collect()
    }

    /// The snapshot with id `id`.
    pub fn get_by_id(&self, id: &str) -> Option<&Snapshot> {
        self.index.snapshots.get(id)
    }

    /// The oldest snapshot labelled `name`.
    pub fn get_by_name(&self, name: &str) -> Option<&Snapshot> {
        self.list().into_iter().find(|s| s.get_name() == name)
    }

    /// Looks a snapshot up by id, then by name.
    pub fn resolve(&self, id_or_name: &str) -> FrostvaultResult<&Snapshot> {
        self.get_by_id(id_or_name)
            .or_else(|| self.get_by_name(id_or_name))
            .ok_or_else(|| FrostvaultError::SnapshotNotFound(id_or_name.to_string()))
    }

    /// The default snapshot, if one is set and still registered.
    pub fn default_snapshot(&self) -> Option<&Snapshot> {
        self.index
            .default_snapshot
            .as_deref()
            .and_then(|id| self.get_by_id(id))
    }

    /// The number of registered snapshots.
    pub fn len(&self) -> usize {
        self.index.snapshots.len()
    }

    /// Whether no snapshot is registered.
    pub fn is_empty(&self) -> bool {
        self.index.snapshots.is_empty()
    }

    /// Where the stored copy of snapshot `id` lives.
    pub fn snapshot_dir(&self, id: &str) -> PathBuf {
        self.layout.snapshots_dir().join(id)
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Snapshots own their bytes and carry the config repository with them.
fn snapshot_copy_options() -> CopyOptions {
    CopyOptions::builder()
        .skip_vcs_metadata(false)
        .strategy(CopyStrategy::Copy)
        .build()
}

/// Copies every existing domain into `staging` and returns their fingerprints.
async fn stage_domains(
    staging: &Path,
    domain_paths: &BTreeMap<String, PathBuf>,
) -> FrostvaultResult<BTreeMap<String, String>> {
    fs::create_dir_all(staging)
        .await
        .map_err(FrostvaultError::at(staging))?;

    let mut fingerprints = BTreeMap::new();
    for (name, path) in domain_paths {
        if fs::symlink_metadata(path).await.is_err() {
            tracing::warn!("domain {} has no data at {}, leaving it out", name, path.display());
            continue;
        }

        tree::copy_tree(path, staging.join(name), &snapshot_copy_options()).await?;
        let digest = fingerprint(path).await?;
        tracing::debug!("domain {} fingerprint {}", name, digest);
        fingerprints.insert(name.clone(), digest);
    }

    Ok(fingerprints)
}

/// Replaces `target` with a copy of `stored`.
///
/// The copy is assembled beside the target, the old tree is renamed aside, the new tree renamed
/// into place and only then is the old tree removed.
async fn restore_domain(stored: &Path, target: &Path, id: &str) -> FrostvaultResult<CopyStats> {
    if !fs::metadata(stored).await.map(|m| m.is_dir()).unwrap_or(false) {
        return Err(FrostvaultError::storage(
            stored,
            io::Error::new(io::ErrorKind::NotFound, "stored domain copy is missing"),
        ));
    }

    let (Some(parent), Some(file_name)) = (target.parent(), target.file_name()) else {
        return Err(FrostvaultError::storage(
            target,
            io::Error::new(io::ErrorKind::InvalidInput, "restore target has no parent"),
        ));
    };
    let file_name = file_name.to_string_lossy();
    let staged = parent.join(format!(".{file_name}.restore-{id}"));
    let aside = parent.join(format!(".{file_name}.discard-{id}"));

    fs::create_dir_all(parent)
        .await
        .map_err(FrostvaultError::at(parent))?;
    remove_tree(&staged).await;
    remove_tree(&aside).await;

    let stats = match tree::copy_tree(stored, &staged, &snapshot_copy_options()).await {
        Ok(stats) => stats,
        Err(e) => {
            remove_tree(&staged).await;
            return Err(e);
        }
    };

    let had_target = fs::symlink_metadata(target).await.is_ok();
    if had_target {
        if let Err(e) = fs::rename(target, &aside).await {
            remove_tree(&staged).await;
            return Err(FrostvaultError::storage(target, e));
        }
    }

    if let Err(e) = fs::rename(&staged, target).await {
        if had_target {
            if let Err(back) = fs::rename(&aside, target).await {
                tracing::error!(
                    "could not put {} back from {}: {}",
                    target.display(),
                    aside.display(),
                    back
                );
            }
        }
        remove_tree(&staged).await;
        return Err(FrostvaultError::storage(target, e));
    }

    if had_target {
        remove_tree(&aside).await;
    }

    Ok(stats)
}

/// Removes a file or tree, logging rather than failing when it cannot.
async fn remove_tree(path: &Path) {
    let result = match fs::symlink_metadata(path).await {
        Ok(metadata) if metadata.is_dir() => fs::remove_dir_all(path).await,
        Ok(_) => fs::remove_file(path).await,
        Err(_) => return,
    };

    if let Err(e) = result {
        tracing::warn!("could not remove {}: {}", path.display(), e);
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
