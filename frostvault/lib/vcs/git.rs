use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use git2::{
    build::CheckoutBuilder, Commit, ConfigLevel, ErrorCode, IndexAddOption, Oid, Repository,
    Signature, Sort, Status, StatusOptions,
};

use crate::{
    config::{
        DEFAULT_COMMIT_AUTHOR, DEFAULT_COMMIT_EMAIL, DEFAULT_GITIGNORE, DEFAULT_STATUS_HISTORY_LEN,
        INITIAL_COMMIT_MESSAGE,
    },
    FrostvaultError, FrostvaultResult,
};

use super::{CommitOutcome, HistoryEntry, RepositoryState, RepositoryStatus, VersionTracker};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// Number of hex characters in a short commit id.
const SHORT_ID_LEN: usize = 7;

const GITIGNORE_FILENAME: &str = ".gitignore";

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A [`VersionTracker`] over a git repository whose work tree is `path`.
#[derive(Debug, Clone)]
pub struct GitTracker {
    path: PathBuf,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl GitTracker {
    /// Creates a tracker for the work tree at `path`. Nothing is touched until a method is called.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The work tree path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> FrostvaultResult<Repository> {
        Ok(Repository::open(&self.path)?)
    }

    fn initialize(&self) -> FrostvaultResult<()> {
        std::fs::create_dir_all(&self.path).map_err(FrostvaultError::at(&self.path))?;
        let repo = Repository::init(&self.path)?;

        let config = repo.config()?;
        let mut local = config.open_level(ConfigLevel::Local)?;
        if config.get_string("user.name").is_err() {
            local.set_str("user.name", DEFAULT_COMMIT_AUTHOR)?;
        }
        if config.get_string("user.email").is_err() {
            local.set_str("user.email", DEFAULT_COMMIT_EMAIL)?;
        }

        let gitignore = self.path.join(GITIGNORE_FILENAME);
        if !gitignore.exists() {
            std::fs::write(&gitignore, DEFAULT_GITIGNORE).map_err(FrostvaultError::at(&gitignore))?;
        }

        let tree_id = stage_all(&repo)?;
        let tree = repo.find_tree(tree_id)?;
        let signature = signature(&repo)?;
        repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            INITIAL_COMMIT_MESSAGE,
            &tree,
            &[],
        )?;

        Ok(())
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Stages every change in the work tree and returns the resulting tree id.
fn stage_all(repo: &Repository) -> FrostvaultResult<Oid> {
    let mut index = repo.index()?;
    index.add_all(["*"].iter(), IndexAddOption::DEFAULT, None)?;
    index.update_all(["*"].iter(), None)?;
    index.write()?;
    Ok(index.write_tree()?)
}

fn head_commit(repo: &Repository) -> FrostvaultResult<Option<Commit<'_>>> {
    match repo.head() {
        Ok(head) => Ok(Some(head.peel_to_commit()?)),
        Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// The configured identity, or the frostvault identity when none is configured.
fn signature(repo: &Repository) -> FrostvaultResult<Signature<'static>> {
    match repo.signature() {
        Ok(signature) => Ok(signature.to_owned()),
        Err(_) => Ok(Signature::now(DEFAULT_COMMIT_AUTHOR, DEFAULT_COMMIT_EMAIL)?),
    }
}

fn short_id(oid: Oid) -> String {
    let mut id = oid.to_string();
    id.truncate(SHORT_ID_LEN);
    id
}

fn current_branch(repo: &Repository) -> Option<String> {
    if repo.head_detached().unwrap_or(false) {
        return None;
    }

    let head = repo.find_reference("HEAD").ok()?;
    let target = head.symbolic_target()?;
    Some(target.strip_prefix("refs/heads/").unwrap_or(target).to_string())
}

fn history_of(repo: &Repository, max_count: usize) -> FrostvaultResult<Vec<HistoryEntry>> {
    if head_commit(repo)?.is_none() {
        return Ok(Vec::new());
    }

    let mut walk = repo.revwalk()?;
    walk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
    walk.push_head()?;

    let mut entries = Vec::new();
    for oid in walk.take(max_count) {
        let commit = repo.find_commit(oid?)?;
        entries.push(HistoryEntry {
            id: short_id(commit.id()),
            summary: commit.summary().unwrap_or_default().to_string(),
            author: commit.author().name().unwrap_or_default().to_string(),
            time: DateTime::<Utc>::from_timestamp(commit.time().seconds(), 0).unwrap_or_default(),
        });
    }

    Ok(entries)
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl VersionTracker for GitTracker {
    fn ensure_repository(&self) -> FrostvaultResult<RepositoryState> {
        match Repository::open(&self.path) {
            Ok(_) => return Ok(RepositoryState::Existing),
            Err(e) if e.code() == ErrorCode::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        self.initialize()?;
        tracing::info!("created config repository at {}", self.path.display());

        Ok(RepositoryState::Created)
    }

    fn commit(&self, message: &str) -> FrostvaultResult<CommitOutcome> {
        let repo = self.open()?;
        let tree_id = stage_all(&repo)?;
        let parent = head_commit(&repo)?;

        if let Some(parent) = &parent {
            if parent.tree_id() == tree_id {
                tracing::debug!("config repository unchanged, nothing to commit");
                return Ok(CommitOutcome::NothingToCommit);
            }
        }

        let tree = repo.find_tree(tree_id)?;
        let signature = signature(&repo)?;
        let parents: Vec<&Commit> = parent.iter().collect();
        let oid = repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)?;

        let id = short_id(oid);
        tracing::info!("committed config changes as {}: {}", id, message);
        Ok(CommitOutcome::Committed { id })
    }

    fn status(&self) -> FrostvaultResult<RepositoryStatus> {
        let repo = self.open()?;

        let mut options = StatusOptions::new();
        options
            .include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_ignored(false);

        let mut modified = BTreeSet::new();
        let mut untracked = BTreeSet::new();
        let mut staged = BTreeSet::new();

        for entry in repo.statuses(Some(&mut options))?.iter() {
            let Some(path) = entry.path() else {
                continue;
            };
            let status = entry.status();

            if status.intersects(
                Status::INDEX_NEW
                    | Status::INDEX_MODIFIED
                    | Status::INDEX_DELETED
                    | Status::INDEX_RENAMED
                    | Status::INDEX_TYPECHANGE,
            ) {
                staged.insert(path.to_string());
            }
            if status.intersects(
                Status::WT_MODIFIED | Status::WT_DELETED | Status::WT_RENAMED | Status::WT_TYPECHANGE,
            ) {
                modified.insert(path.to_string());
            }
            if status.contains(Status::WT_NEW) {
                untracked.insert(path.to_string());
            }
        }

        let head = head_commit(&repo)?.map(|commit| short_id(commit.id()));
        let clean = modified.is_empty() && untracked.is_empty();

        Ok(RepositoryStatus {
            branch: current_branch(&repo),
            head,
            modified,
            untracked,
            staged,
            history: history_of(&repo, DEFAULT_STATUS_HISTORY_LEN)?,
            clean,
        })
    }

    fn tag(&self, name: &str, message: &str) -> FrostvaultResult<()> {
        let repo = self.open()?;
        let head = head_commit(&repo)?.ok_or_else(|| FrostvaultError::NoCommits(self.path.clone()))?;

        if repo.find_reference(&format!("refs/tags/{name}")).is_ok() {
            return Err(FrostvaultError::TagExists(name.to_string()));
        }

        if message.is_empty() {
            repo.tag_lightweight(name, head.as_object(), false)?;
        } else {
            let signature = signature(&repo)?;
            repo.tag(name, head.as_object(), &signature, message, false)?;
        }

        tracing::info!("tagged config commit {} as {}", short_id(head.id()), name);
        Ok(())
    }

    fn history(&self, max_count: usize) -> FrostvaultResult<Vec<HistoryEntry>> {
        let repo = self.open()?;
        history_of(&repo, max_count)
    }

    fn checkout(&self, reference: &str) -> FrostvaultResult<()> {
        let repo = self.open()?;
        let (object, resolved) = repo.revparse_ext(reference)?;

        repo.checkout_tree(&object, Some(CheckoutBuilder::new().safe()))?;
        match resolved.as_ref().and_then(|r| r.name()) {
            Some(name) if name.starts_with("refs/heads/") => repo.set_head(name)?,
            _ => repo.set_head_detached(object.peel_to_commit()?.id())?,
        }

        tracing::info!("checked out {} in config repository", reference);
        Ok(())
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn tracker() -> anyhow::Result<(TempDir, GitTracker)> {
        let temp_dir = TempDir::new()?;
        let tracker = GitTracker::new(temp_dir.path().join("cfg"));
        Ok((temp_dir, tracker))
    }

    #[test_log::test]
    fn test_ensure_repository_is_idempotent() -> anyhow::Result<()> {
        let (_temp_dir, tracker) = tracker()?;

        assert_eq!(tracker.ensure_repository()?, RepositoryState::Created);
        assert_eq!(tracker.ensure_repository()?, RepositoryState::Existing);

        let gitignore = fs::read_to_string(tracker.path().join(".gitignore"))?;
        assert!(gitignore.contains("*.tmp"));
        assert!(gitignore.contains("*.log"));

        let history = tracker.history(10)?;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].summary, INITIAL_COMMIT_MESSAGE);

        let status = tracker.status()?;
        assert!(status.clean);
        assert!(status.branch.is_some());

        Ok(())
    }

    #[test_log::test]
    fn test_commit_detects_changes() -> anyhow::Result<()> {
        let (_temp_dir, tracker) = tracker()?;
        tracker.ensure_repository()?;

        assert_eq!(tracker.commit("no changes")?, CommitOutcome::NothingToCommit);

        fs::write(tracker.path().join("network.conf"), "dhcp=true\n")?;
        let status = tracker.status()?;
        assert!(status.untracked.contains("network.conf"));
        assert!(!status.clean);

        let CommitOutcome::Committed { id } = tracker.commit("Snapshot: base")? else {
            panic!("expected a commit");
        };
        assert_eq!(id.len(), SHORT_ID_LEN);
        assert!(tracker.status()?.clean);

        fs::write(tracker.path().join("network.conf"), "dhcp=false\n")?;
        assert!(tracker.status()?.modified.contains("network.conf"));
        assert!(matches!(
            tracker.commit("edit")?,
            CommitOutcome::Committed { .. }
        ));

        fs::remove_file(tracker.path().join("network.conf"))?;
        assert!(matches!(
            tracker.commit("delete")?,
            CommitOutcome::Committed { .. }
        ));

        let summaries: Vec<_> = tracker
            .history(3)?
            .into_iter()
            .map(|entry| entry.summary)
            .collect();
        assert_eq!(summaries, vec!["delete", "edit", "Snapshot: base"]);

        Ok(())
    }

    #[test_log::test]
    fn test_ignored_files_are_not_committed() -> anyhow::Result<()> {
        let (_temp_dir, tracker) = tracker()?;
        tracker.ensure_repository()?;

        fs::write(tracker.path().join("daemon.log"), "noise")?;
        fs::write(tracker.path().join("edit.tmp"), "noise")?;

        assert!(tracker.status()?.clean);
        assert_eq!(tracker.commit("logs")?, CommitOutcome::NothingToCommit);

        Ok(())
    }

    #[test_log::test]
    fn test_tags() -> anyhow::Result<()> {
        let (_temp_dir, tracker) = tracker()?;

        fs::create_dir_all(tracker.path())?;
        Repository::init(tracker.path())?;
        assert!(matches!(
            tracker.tag("v1", ""),
            Err(FrostvaultError::NoCommits(_))
        ));

        tracker.commit("first")?;
        tracker.tag("v1", "")?;
        tracker.tag("v2", "annotated release")?;
        assert!(matches!(
            tracker.tag("v1", "again"),
            Err(FrostvaultError::TagExists(name)) if name == "v1"
        ));

        let repo = Repository::open(tracker.path())?;
        assert!(repo.revparse_single("v2")?.as_tag().is_some());
        assert!(repo.revparse_single("v1")?.as_tag().is_none());

        Ok(())
    }

    #[test_log::test]
    fn test_checkout_tag_restores_content() -> anyhow::Result<()> {
        let (_temp_dir, tracker) = tracker()?;
        tracker.ensure_repository()?;

        let file = tracker.path().join("hostname");
        fs::write(&file, "alpha\n")?;
        tracker.commit("alpha")?;
        tracker.tag("alpha", "")?;

        fs::write(&file, "beta\n")?;
        tracker.commit("beta")?;

        tracker.checkout("alpha")?;
        assert_eq!(fs::read_to_string(&file)?, "alpha\n");
        assert!(tracker.status()?.branch.is_none());

        Ok(())
    }
}
