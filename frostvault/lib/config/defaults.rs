use std::path::PathBuf;

use crate::{utils::FROSTVAULT_HOME_DIR, FrostvaultResult};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// The environment variable that overrides the base storage path.
pub const FROSTVAULT_HOME_ENV_VAR: &str = "FROSTVAULT_HOME";

/// The number of history entries reported by a config repository status.
pub const DEFAULT_STATUS_HISTORY_LEN: usize = 5;

/// The number of recent snapshots listed in a status report.
pub const DEFAULT_RECENT_SNAPSHOTS: usize = 5;

/// The author name recorded in config commits when the repository has no identity configured.
pub const DEFAULT_COMMIT_AUTHOR: &str = "frostvault";

/// The author email recorded in config commits when the repository has no identity configured.
pub const DEFAULT_COMMIT_EMAIL: &str = "frostvault@localhost";

/// The message of the first commit in a freshly created config repository.
pub const INITIAL_COMMIT_MESSAGE: &str = "Initial commit by frostvault";

/// The ignore list written into a freshly created config repository.
pub const DEFAULT_GITIGNORE: &str = "# frostvault managed repository\n*.tmp\n*.log\n";

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Resolves the base storage path: `$FROSTVAULT_HOME`, else `~/.frostvault`.
pub fn default_base_path() -> FrostvaultResult<PathBuf> {
    let path = frostutils::resolve_env_path(FROSTVAULT_HOME_ENV_VAR, FROSTVAULT_HOME_DIR)?;
    Ok(path)
}
