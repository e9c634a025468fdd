//! Version history of the config domain.
//!
//! Everything outside this module sees history through the narrow [`VersionTracker`] contract.
//! [`GitTracker`] implements it over a git repository rooted at the domain path.
//!
//! The tracker is synchronous. Async callers run it on the blocking thread pool.

mod git;

use std::{collections::BTreeSet, fmt};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::FrostvaultResult;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use git::*;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Whether [`VersionTracker::ensure_repository`] had to create the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepositoryState {
    /// A new repository with an initial commit.
    Created,

    /// The repository was already there.
    Existing,
}

/// Result of [`VersionTracker::commit`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CommitOutcome {
    /// A commit was recorded.
    Committed {
        /// Short id of the new commit.
        id: String,
    },

    /// The tree matched the last commit. Nothing was recorded.
    NothingToCommit,
}

/// One commit in the history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    /// Short commit id.
    pub id: String,

    /// First line of the commit message.
    pub summary: String,

    /// Author name.
    pub author: String,

    /// Commit time.
    pub time: DateTime<Utc>,
}

/// The state of the working tree relative to history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryStatus {
    /// The checked out branch, if HEAD is not detached.
    pub branch: Option<String>,

    /// Short id of the HEAD commit.
    pub head: Option<String>,

    /// Tracked paths changed in the working tree.
    pub modified: BTreeSet<String>,

    /// Paths not tracked yet.
    pub untracked: BTreeSet<String>,

    /// Paths staged for the next commit.
    pub staged: BTreeSet<String>,

    /// The most recent commits, newest first.
    pub history: Vec<HistoryEntry>,

    /// No modified and no untracked paths.
    pub clean: bool,
}

/// Records and inspects the history of a directory.
pub trait VersionTracker: fmt::Debug + Send + Sync {
    /// Creates the repository if it does not exist yet.
    ///
    /// A new repository gets an ignore list, a local identity when none is configured and an
    /// initial commit.
    fn ensure_repository(&self) -> FrostvaultResult<RepositoryState>;

    /// Stages every new, modified and deleted path and commits them with `message`.
    fn commit(&self, message: &str) -> FrostvaultResult<CommitOutcome>;

    /// Reports the branch, the changed paths and recent history.
    fn status(&self) -> FrostvaultResult<RepositoryStatus>;

    /// Tags the HEAD commit. The tag is annotated when `message` is non-empty.
    ///
    /// ## Errors
    /// - `TagExists` if the name is taken
    /// - `NoCommits` if there is nothing to tag
    fn tag(&self, name: &str, message: &str) -> FrostvaultResult<()>;

    /// The `max_count` most recent commits, newest first.
    fn history(&self, max_count: usize) -> FrostvaultResult<Vec<HistoryEntry>>;

    /// Checks out a branch, tag or commit.
    fn checkout(&self, reference: &str) -> FrostvaultResult<()>;
}
