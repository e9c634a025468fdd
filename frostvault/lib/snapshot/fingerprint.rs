use std::{cmp::Ordering, path::Path};

use sha2::{Digest, Sha256};
use walkdir::{DirEntry, WalkDir};

use crate::FrostvaultResult;

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

const FILE_TAG: u8 = b'f';

const SYMLINK_TAG: u8 = b'l';

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Computes the SHA-256 fingerprint of the tree at `root` as lowercase hex.
///
/// Within each directory, files are visited by name first, then subdirectories by name. Each file
/// contributes its `/`-separated path relative to `root` and its full contents, both prefixed
/// with their length. Symlinks contribute their relative path and link target the same way and
/// are never followed. Files that cannot be
/// read are left out entirely.
///
/// The walk runs on the blocking thread pool.
pub async fn fingerprint(root: impl AsRef<Path>) -> FrostvaultResult<String> {
    let root = root.as_ref().to_path_buf();
    let digest = tokio::task::spawn_blocking(move || fingerprint_blocking(&root)).await?;
    Ok(digest)
}

/// Synchronous form of [`fingerprint`].
pub fn fingerprint_blocking(root: &Path) -> String {
    let mut hasher = Sha256::new();

    let walker = WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .sort_by(files_then_dirs);

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!("fingerprint skipping unreadable entry: {}", e);
                continue;
            }
        };

        let file_type = entry.file_type();
        if file_type.is_dir() {
            continue;
        }

        let relative = relative_key(root, entry.path());
        if file_type.is_symlink() {
            match std::fs::read_link(entry.path()) {
                Ok(link) => feed_entry(
                    &mut hasher,
                    SYMLINK_TAG,
                    &relative,
                    link.to_string_lossy().as_bytes(),
                ),
                Err(e) => tracing::debug!("fingerprint skipping {}: {}", relative, e),
            }
        } else if file_type.is_file() {
            match std::fs::read(entry.path()) {
                Ok(contents) => feed_entry(&mut hasher, FILE_TAG, &relative, &contents),
                Err(e) => tracing::debug!("fingerprint skipping {}: {}", relative, e),
            }
        }
    }

    hex::encode(hasher.finalize())
}

/// Feeds one entry as a tag byte, then the length-prefixed path, then the length-prefixed body.
/// The lengths keep neighbouring entries from running into each other.
fn feed_entry(hasher: &mut Sha256, tag: u8, relative: &str, body: &[u8]) {
    hasher.update([tag]);
    hasher.update((relative.len() as u64).to_le_bytes());
    hasher.update(relative.as_bytes());
    hasher.update((body.len() as u64).to_le_bytes());
    hasher.update(body);
}

fn files_then_dirs(a: &DirEntry, b: &DirEntry) -> Ordering {
    (a.file_type().is_dir(), a.file_name()).cmp(&(b.file_type().is_dir(), b.file_name()))
}

fn relative_key(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use tempfile::TempDir;
    use tokio::fs;

    use super::*;

    async fn populate(root: &Path) -> anyhow::Result<()> {
        fs::create_dir_all(root.join("etc/ssh")).await?;
        fs::write(root.join("etc/hosts"), b"127.0.0.1 localhost\n").await?;
        fs::write(root.join("etc/ssh/sshd_config"), b"PermitRootLogin no\n").await?;
        fs::write(root.join("motd"), b"hi").await?;
        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_fingerprint_is_deterministic_across_copies() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let a = temp_dir.path().join("a");
        let b = temp_dir.path().join("b");
        populate(&a).await?;
        populate(&b).await?;

        let first = fingerprint(&a).await?;
        assert_eq!(first, fingerprint(&a).await?);
        assert_eq!(first, fingerprint(&b).await?);
        assert_eq!(first.len(), 64);

        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_fingerprint_tracks_changes() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path().join("root");
        populate(&root).await?;
        let original = fingerprint(&root).await?;

        fs::write(root.join("etc/hosts"), b"10.0.0.1 gateway\n").await?;
        let modified = fingerprint(&root).await?;
        assert_ne!(original, modified);

        fs::write(root.join("etc/new"), b"").await?;
        let added = fingerprint(&root).await?;
        assert_ne!(modified, added);

        fs::remove_file(root.join("etc/new")).await?;
        assert_eq!(fingerprint(&root).await?, modified);

        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_fingerprint_sees_renames() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path().join("root");
        populate(&root).await?;
        let original = fingerprint(&root).await?;

        fs::rename(root.join("motd"), root.join("issue")).await?;

        assert_ne!(original, fingerprint(&root).await?);
        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_fingerprint_of_empty_and_missing_trees() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let empty = temp_dir.path().join("empty");
        fs::create_dir_all(&empty).await?;

        // SHA-256 of no input
        let nothing = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";
        assert_eq!(fingerprint(&empty).await?, nothing);
        assert_eq!(fingerprint(temp_dir.path().join("missing")).await?, nothing);

        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_entry_boundaries_are_part_of_the_fingerprint() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;

        // Without boundaries both trees would hash the bytes "abc"
        let joined = temp_dir.path().join("joined");
        fs::create_dir_all(&joined).await?;
        fs::write(joined.join("a"), b"bc").await?;

        let split = temp_dir.path().join("split");
        fs::create_dir_all(&split).await?;
        fs::write(split.join("a"), b"").await?;
        fs::write(split.join("bc"), b"").await?;

        assert_ne!(fingerprint(&joined).await?, fingerprint(&split).await?);

        // A file and a symlink with the same path and body differ too
        #[cfg(unix)]
        {
            let file = temp_dir.path().join("file");
            fs::create_dir_all(&file).await?;
            fs::write(file.join("x"), b"target").await?;

            let link = temp_dir.path().join("link");
            fs::create_dir_all(&link).await?;
            fs::symlink("target", link.join("x")).await?;

            assert_ne!(fingerprint(&file).await?, fingerprint(&link).await?);
        }

        Ok(())
    }

    #[test]
    fn test_files_are_visited_before_subdirectories() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();
        std::fs::create_dir_all(root.join("a"))?;
        std::fs::write(root.join("a/inner"), b"1")?;
        std::fs::write(root.join("b"), b"2")?;

        let mut expected = Sha256::new();
        feed_entry(&mut expected, FILE_TAG, "b", b"2");
        feed_entry(&mut expected, FILE_TAG, "a/inner", b"1");

        assert_eq!(fingerprint_blocking(root), hex::encode(expected.finalize()));
        Ok(())
    }
}
