use std::path::Path;

use serde::Serialize;

use crate::{FrostvaultError, FrostvaultResult};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Space on the filesystem holding a path, in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiskUsage {
    /// Size of the filesystem.
    pub total: u64,

    /// Space in use.
    pub used: u64,

    /// Space available to unprivileged users.
    pub free: u64,
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Reports the space on the filesystem holding `path`. A missing path reports all zeros.
#[cfg(unix)]
pub async fn disk_usage(path: impl AsRef<Path>) -> FrostvaultResult<DiskUsage> {
    let path = path.as_ref().to_path_buf();
    if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
        return Ok(DiskUsage::default());
    }

    let stat = tokio::task::spawn_blocking({
        let path = path.clone();
        move || nix::sys::statvfs::statvfs(&path)
    })
    .await?
    .map_err(|errno| FrostvaultError::storage(&path, errno.into()))?;

    let fragment = stat.fragment_size() as u64;
    let blocks = stat.blocks() as u64;
    Ok(DiskUsage {
        total: blocks * fragment,
        used: blocks.saturating_sub(stat.blocks_free() as u64) * fragment,
        free: stat.blocks_available() as u64 * fragment,
    })
}

/// Reports the space on the filesystem holding `path`. Not measured on this platform.
#[cfg(not(unix))]
pub async fn disk_usage(_path: impl AsRef<Path>) -> FrostvaultResult<DiskUsage> {
    Ok(DiskUsage::default())
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[cfg(unix)]
    #[test_log::test(tokio::test)]
    async fn test_disk_usage_of_existing_path() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;

        let usage = disk_usage(temp_dir.path()).await?;

        assert!(usage.total > 0);
        assert!(usage.used <= usage.total);
        assert!(usage.free <= usage.total);

        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_disk_usage_of_missing_path_is_zero() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;

        let usage = disk_usage(temp_dir.path().join("missing")).await?;

        assert_eq!(usage, DiskUsage::default());
        Ok(())
    }
}
