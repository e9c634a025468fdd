//! `frostutils::fs` holds the durable-write helpers shared by every record frostvault persists.
//!
//! A record is never rewritten in place. The new contents go to a sibling `*.tmp` file which is
//! flushed to disk and then renamed over the original, so a crash mid-write leaves either the old
//! or the new record readable.

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use tokio::{fs, io::AsyncWriteExt};

use crate::{FrostutilsError, FrostutilsResult};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// The suffix appended to a record's file name while it is being written.
pub const TMP_SUFFIX: &str = "tmp";

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Returns the temporary sibling used while `path` is being replaced.
pub fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("record"));
    name.push(".");
    name.push(TMP_SUFFIX);
    path.with_file_name(name)
}

/// Atomically replaces the file at `path` with `contents`.
///
/// The parent directory is created if needed. A stale temporary file from an interrupted write is
/// discarded first.
pub async fn write_atomic(path: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> FrostutilsResult<()> {
    let path = path.as_ref();
    let tmp = tmp_path_for(path);

    let result = write_then_rename(path, &tmp, contents.as_ref()).await;
    if result.is_err() {
        let _ = fs::remove_file(&tmp).await;
    }

    result.map_err(|source| FrostutilsError::AtomicWrite {
        path: path.to_path_buf(),
        source,
    })
}

/// Creates an empty marker file at `path` if it is absent.
pub async fn create_marker(path: impl AsRef<Path>) -> FrostutilsResult<()> {
    let path = path.as_ref();
    if fs::try_exists(path).await? {
        return Ok(());
    }

    write_atomic(path, b"").await
}

/// Removes the marker file at `path`. Succeeds when there is nothing to remove.
pub async fn remove_marker(path: impl AsRef<Path>) -> FrostutilsResult<()> {
    match fs::remove_file(path.as_ref()).await {
        Ok(()) => {
            sync_parent(path.as_ref()).await;
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

async fn write_then_rename(path: &Path, tmp: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    match fs::remove_file(tmp).await {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(e),
        _ => {}
    }

    let mut file = fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(tmp)
        .await?;
    file.write_all(contents).await?;
    file.sync_all().await?;
    drop(file);

    fs::rename(tmp, path).await?;
    sync_parent(path).await;

    Ok(())
}

/// Flushes the directory entry of `path` to disk. Best effort; not every platform allows opening
/// a directory for syncing.
async fn sync_parent(path: &Path) {
    let Some(parent) = path.parent() else {
        return;
    };

    #[cfg(unix)]
    if let Ok(dir) = fs::File::open(parent).await {
        if let Err(e) = dir.sync_all().await {
            tracing::debug!("could not sync directory {}: {}", parent.display(), e);
        }
    }

    #[cfg(not(unix))]
    let _ = parent;
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test_log::test(tokio::test)]
    async fn test_write_atomic_replaces_contents_and_cleans_tmp() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let record = temp_dir.path().join("nested").join("record.json");

        write_atomic(&record, b"{\"v\":1}").await?;
        assert_eq!(fs::read_to_string(&record).await?, "{\"v\":1}");

        write_atomic(&record, b"{\"v\":2}").await?;
        assert_eq!(fs::read_to_string(&record).await?, "{\"v\":2}");
        assert!(!tmp_path_for(&record).exists());

        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_write_atomic_discards_stale_tmp() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let record = temp_dir.path().join("record.json");

        // Leftover from an interrupted write
        fs::write(tmp_path_for(&record), b"partial").await?;
        write_atomic(&record, b"complete").await?;

        assert_eq!(fs::read_to_string(&record).await?, "complete");
        assert!(!tmp_path_for(&record).exists());

        Ok(())
    }

    #[test]
    fn test_tmp_path_for_keeps_extension() {
        let tmp = tmp_path_for(Path::new("/base/snapshots.json"));
        assert_eq!(tmp, PathBuf::from("/base/snapshots.json.tmp"));
    }

    #[test_log::test(tokio::test)]
    async fn test_markers_are_idempotent() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let marker = temp_dir.path().join(".flag");

        create_marker(&marker).await?;
        create_marker(&marker).await?;
        assert!(marker.exists());

        remove_marker(&marker).await?;
        remove_marker(&marker).await?;
        assert!(!marker.exists());

        Ok(())
    }
}
