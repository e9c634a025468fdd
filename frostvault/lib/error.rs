use std::{
    error::Error,
    fmt::{self, Display},
    path::{Path, PathBuf},
};

use frostutils::FrostutilsError;
use thiserror::Error;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The result of a frostvault-related operation.
pub type FrostvaultResult<T> = Result<T, FrostvaultError>;

/// An error that occurred during a frostvault operation.
#[derive(pretty_error_debug::Debug, Error)]
pub enum FrostvaultError {
    /// The base storage has no domain record yet.
    #[error("frostvault is not initialized at {0}")]
    NotInitialized(PathBuf),

    /// No domain with the given name exists.
    #[error("domain not found: {0}")]
    DomainNotFound(String),

    /// No snapshot with the given id or name exists, or its stored data is gone.
    #[error("snapshot not found: {0}")]
    SnapshotNotFound(String),

    /// The path that was about to be created already exists.
    #[error("already exists: {0}")]
    AlreadyExists(PathBuf),

    /// The source of a redirect does not exist.
    #[error("redirect source does not exist: {0}")]
    SourceMissing(PathBuf),

    /// A durable record exists but cannot be parsed.
    #[error("corrupt state record {path}: {source}")]
    CorruptState {
        /// The record that failed to parse.
        path: PathBuf,

        /// The parse error.
        #[source]
        source: serde_json::Error,
    },

    /// The domain table breaks the path uniqueness or nesting rules.
    #[error("invalid domain layout: {0}")]
    InvalidDomainLayout(String),

    /// A filesystem operation on a specific path failed.
    #[error("storage error at {path}: {source}")]
    Storage {
        /// The path being operated on.
        path: PathBuf,

        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The platform cannot mount overlay filesystems.
    #[error("overlay mounts are not supported: {0}")]
    MountUnsupported(String),

    /// Establishing a mount failed.
    #[error("failed to mount {mount_point}: {reason}")]
    MountFailed {
        /// The intended mount point.
        mount_point: PathBuf,

        /// What the OS reported.
        reason: String,
    },

    /// Tearing down a mount failed.
    #[error("failed to unmount {mount_point}: {reason}")]
    UnmountFailed {
        /// The mount point.
        mount_point: PathBuf,

        /// What the OS reported.
        reason: String,
    },

    /// A restore from the default snapshot was requested but none is configured.
    #[error("no default snapshot is set")]
    NoDefaultSet,

    /// Some domains of a restore failed.
    #[error("restore of snapshot {snapshot_id} failed for domains: {}", .failed.join(", "))]
    RestoreIncomplete {
        /// The snapshot being restored.
        snapshot_id: String,

        /// The domains that did not restore.
        failed: Vec<String>,
    },

    /// A tag with the given name already exists in the config history.
    #[error("tag already exists: {0}")]
    TagExists(String),

    /// The config history has no commit yet.
    #[error("the repository at {0} has no commits")]
    NoCommits(PathBuf),

    /// An error reported by the version-control backend.
    #[error("version control error: {0}")]
    VersionControl(#[from] git2::Error),

    /// An I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A serialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// An error from the utility crate.
    #[error("utils error: {0}")]
    Utils(#[from] FrostutilsError),

    /// A blocking task could not be joined.
    #[error("join error: {0}")]
    JoinError(#[from] tokio::task::JoinError),

    /// An error that can represent any error.
    #[error(transparent)]
    Custom(#[from] AnyError),
}

/// An error that can represent any error.
#[derive(Debug)]
pub struct AnyError {
    error: anyhow::Error,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl FrostvaultError {
    /// Creates a new `Err` result.
    pub fn custom(error: impl Into<anyhow::Error>) -> FrostvaultError {
        FrostvaultError::Custom(AnyError {
            error: error.into(),
        })
    }

    /// Wraps an I/O error with the path it happened on.
    pub fn storage(path: impl AsRef<Path>, source: std::io::Error) -> FrostvaultError {
        FrostvaultError::Storage {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Returns a closure that wraps an I/O error with `path`, for use with `map_err`.
    pub fn at(path: impl AsRef<Path>) -> impl FnOnce(std::io::Error) -> FrostvaultError {
        let path = path.as_ref().to_path_buf();
        move |source| FrostvaultError::Storage { path, source }
    }
}

impl AnyError {
    /// Downcasts the error to a `T`.
    pub fn downcast<T>(&self) -> Option<&T>
    where
        T: Display + fmt::Debug + Send + Sync + 'static,
    {
        self.error.downcast_ref::<T>()
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Creates an `Ok` `FrostvaultResult`.
#[allow(non_snake_case)]
pub fn Ok<T>(value: T) -> FrostvaultResult<T> {
    Result::Ok(value)
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl PartialEq for AnyError {
    fn eq(&self, other: &Self) -> bool {
        self.error.to_string() == other.error.to_string()
    }
}

impl Display for AnyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl Error for AnyError {}
