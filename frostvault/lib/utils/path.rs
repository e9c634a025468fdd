use std::path::{Path, PathBuf};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// The directory under the user's home where frostvault keeps its state by default.
pub const FROSTVAULT_HOME_DIR: &str = ".frostvault";

/// The file holding the domain table.
pub const DOMAINS_FILENAME: &str = "domains.json";

/// The file holding the snapshot index.
pub const SNAPSHOTS_FILENAME: &str = "snapshots.json";

/// The marker whose presence means protection is thawed.
pub const THAW_MARKER_FILENAME: &str = ".thawed";

/// The sub directory holding each domain's live storage.
pub const DOMAINS_SUBDIR: &str = "domains";

/// The sub directory holding captured snapshot copies.
pub const SNAPSHOTS_SUBDIR: &str = "snapshots";

/// The sub directory holding overlay upper and work layers per domain.
pub const LAYERS_SUBDIR: &str = "layers";

/// The sub directory where frozen domains are presented to applications.
pub const VIEWS_SUBDIR: &str = "views";

/// The overlay upper layer directory name.
pub const UPPER_SUBDIR: &str = "upper";

/// The overlay work directory name.
pub const WORK_SUBDIR: &str = "work";

/// The directory name of version control metadata skipped by metadata-aware copies.
pub const VCS_METADATA_DIR: &str = ".git";

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Resolves every well-known location under a frostvault base path.
///
/// ```text
/// <base>/
/// ├── domains.json
/// ├── snapshots.json
/// ├── .thawed
/// ├── domains/<name>/          live domain storage
/// ├── snapshots/<id>/<name>/   captured copies
/// ├── layers/<name>/{upper,work}
/// └── views/<name>/            application-facing presentation
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    base: PathBuf,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl StorageLayout {
    /// Creates a layout rooted at `base`.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// The base path.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// The domain table record.
    pub fn domains_file(&self) -> PathBuf {
        self.base.join(DOMAINS_FILENAME)
    }

    /// The snapshot index record.
    pub fn snapshots_file(&self) -> PathBuf {
        self.base.join(SNAPSHOTS_FILENAME)
    }

    /// The freeze flag marker.
    pub fn thaw_marker(&self) -> PathBuf {
        self.base.join(THAW_MARKER_FILENAME)
    }

    /// The live storage directory of the domain `name`.
    pub fn domain_dir(&self, name: &str) -> PathBuf {
        self.base.join(DOMAINS_SUBDIR).join(name)
    }

    /// The directory holding all captured snapshots.
    pub fn snapshots_dir(&self) -> PathBuf {
        self.base.join(SNAPSHOTS_SUBDIR)
    }

    /// The overlay layer directory of the domain `name`.
    pub fn layers_dir(&self, name: &str) -> PathBuf {
        self.base.join(LAYERS_SUBDIR).join(name)
    }

    /// The overlay upper layer of the domain `name`.
    pub fn upper_dir(&self, name: &str) -> PathBuf {
        self.layers_dir(name).join(UPPER_SUBDIR)
    }

    /// The overlay work directory of the domain `name`.
    pub fn work_dir(&self, name: &str) -> PathBuf {
        self.layers_dir(name).join(WORK_SUBDIR)
    }

    /// Where the domain `name` is presented to applications.
    pub fn view_dir(&self, name: &str) -> PathBuf {
        self.base.join(VIEWS_SUBDIR).join(name)
    }
}
