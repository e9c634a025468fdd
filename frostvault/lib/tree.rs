//! Bulk duplication of directory trees.
//!
//! [`copy_tree`] stores snapshot copies and restores them. It can hardlink regular files (same
//! inode, no extra space) and falls back to a byte copy when the filesystem refuses the link for
//! one of a known set of reasons. Any other error surfaces. Trees on different filesystems are
//! copied byte for byte from the start.

use std::{io, path::Path};

use serde::Serialize;
use tokio::fs;
use typed_builder::TypedBuilder;

use crate::{utils::VCS_METADATA_DIR, FrostvaultError, FrostvaultResult};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// OS error codes meaning "this link cannot be made here" rather than "something is broken".
#[cfg(unix)]
const RECOVERABLE_LINK_ERRNOS: &[i32] = &[
    libc::EXDEV,
    libc::EPERM,
    libc::EACCES,
    libc::EMLINK,
    libc::ENOTSUP,
    libc::EOPNOTSUPP,
];

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// How regular files are duplicated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CopyStrategy {
    /// Hardlink, falling back to a byte copy on recoverable link errors.
    #[default]
    HardlinkOrCopy,

    /// Always copy bytes. The copy shares nothing with the source.
    Copy,
}

/// Options for [`copy_tree`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct CopyOptions {
    /// Skip `.git` subtrees. On unless turned off.
    #[builder(default = true)]
    pub skip_vcs_metadata: bool,

    /// How regular files are duplicated.
    #[builder(default)]
    pub strategy: CopyStrategy,
}

/// What a [`copy_tree`] call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CopyStats {
    /// Files duplicated as hardlinks.
    pub linked: usize,

    /// Files duplicated by copying bytes.
    pub copied: usize,

    /// Symlinks recreated.
    pub symlinks: usize,

    /// Directories created below the target root.
    pub directories: usize,
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Duplicates the directory tree at `source` into `target`.
///
/// The target root is created before any entry is processed. Symlinks are recreated, not
/// followed. Sockets, fifos and device nodes are skipped.
///
/// ## Errors
/// - `Storage` if `source` is not a directory
/// - `Storage` for any I/O failure other than a recoverable hardlink refusal
pub async fn copy_tree(
    source: impl AsRef<Path>,
    target: impl AsRef<Path>,
    options: &CopyOptions,
) -> FrostvaultResult<CopyStats> {
    let source = source.as_ref();
    let target = target.as_ref();

    let metadata = fs::metadata(source)
        .await
        .map_err(FrostvaultError::at(source))?;
    if !metadata.is_dir() {
        return Err(FrostvaultError::storage(
            source,
            io::Error::other("copy source is not a directory"),
        ));
    }

    fs::create_dir_all(target)
        .await
        .map_err(FrostvaultError::at(target))?;

    let strategy = effective_strategy(source, target, options.strategy).await;
    let mut stats = CopyStats::default();
    let mut stack = vec![source.to_path_buf()];

    while let Some(current) = stack.pop() {
        let relative = current.strip_prefix(source).unwrap_or(Path::new(""));
        let target_dir = target.join(relative);

        let mut entries = fs::read_dir(&current)
            .await
            .map_err(FrostvaultError::at(&current))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(FrostvaultError::at(&current))?
        {
            let path = entry.path();
            let dest = target_dir.join(entry.file_name());
            let file_type = entry.file_type().await.map_err(FrostvaultError::at(&path))?;

            if file_type.is_dir() {
                if options.skip_vcs_metadata && entry.file_name() == VCS_METADATA_DIR {
                    tracing::debug!("skipping version control metadata at {}", path.display());
                    continue;
                }

                fs::create_dir_all(&dest)
                    .await
                    .map_err(FrostvaultError::at(&dest))?;
                stats.directories += 1;
                stack.push(path);
            } else if file_type.is_symlink() {
                let link = fs::read_link(&path)
                    .await
                    .map_err(FrostvaultError::at(&path))?;
                make_symlink(&link, &dest, &path)
                    .await
                    .map_err(FrostvaultError::at(&dest))?;
                stats.symlinks += 1;
            } else if file_type.is_file() {
                duplicate_file(&path, &dest, strategy, &mut stats).await?;
            } else {
                tracing::warn!("skipping special file {}", path.display());
            }
        }
    }

    tracing::debug!(
        "copied tree {} -> {}: {} linked, {} copied, {} symlinks",
        source.display(),
        target.display(),
        stats.linked,
        stats.copied,
        stats.symlinks
    );

    Ok(stats)
}

/// Whether two existing paths live on the same filesystem.
#[cfg(unix)]
pub async fn same_filesystem(a: impl AsRef<Path>, b: impl AsRef<Path>) -> FrostvaultResult<bool> {
    use std::os::unix::fs::MetadataExt;

    let a = a.as_ref();
    let b = b.as_ref();
    let a_dev = fs::metadata(a).await.map_err(FrostvaultError::at(a))?.dev();
    let b_dev = fs::metadata(b).await.map_err(FrostvaultError::at(b))?.dev();
    Ok(a_dev == b_dev)
}

/// Downgrades hardlinking to a byte copy when `source` and `target` are on different
/// filesystems, where every link would be refused.
async fn effective_strategy(source: &Path, target: &Path, requested: CopyStrategy) -> CopyStrategy {
    if requested != CopyStrategy::HardlinkOrCopy {
        return requested;
    }

    #[cfg(unix)]
    if let Ok(false) = same_filesystem(source, target).await {
        tracing::debug!(
            "{} and {} are on different filesystems, copying bytes",
            source.display(),
            target.display()
        );
        return CopyStrategy::Copy;
    }

    requested
}

async fn duplicate_file(
    source: &Path,
    dest: &Path,
    strategy: CopyStrategy,
    stats: &mut CopyStats,
) -> FrostvaultResult<()> {
    if strategy == CopyStrategy::HardlinkOrCopy {
        match fs::hard_link(source, dest).await {
            Ok(()) => {
                stats.linked += 1;
                return Ok(());
            }
            Err(e) if is_recoverable_link_error(&e) => {
                tracing::debug!(
                    "hardlink {} refused ({}), copying bytes",
                    source.display(),
                    e
                );
            }
            Err(e) => return Err(FrostvaultError::storage(dest, e)),
        }
    }

    fs::copy(source, dest)
        .await
        .map_err(FrostvaultError::at(dest))?;
    stats.copied += 1;

    Ok(())
}

fn is_recoverable_link_error(err: &io::Error) -> bool {
    if matches!(
        err.kind(),
        io::ErrorKind::PermissionDenied | io::ErrorKind::Unsupported
    ) {
        return true;
    }

    #[cfg(unix)]
    if let Some(code) = err.raw_os_error() {
        return RECOVERABLE_LINK_ERRNOS.contains(&code);
    }

    false
}

#[cfg(unix)]
async fn make_symlink(link: &Path, dest: &Path, _source: &Path) -> io::Result<()> {
    fs::symlink(link, dest).await
}

#[cfg(windows)]
async fn make_symlink(link: &Path, dest: &Path, source: &Path) -> io::Result<()> {
    if fs::metadata(source).await.map(|m| m.is_dir()).unwrap_or(false) {
        fs::symlink_dir(link, dest).await
    } else {
        fs::symlink_file(link, dest).await
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl Default for CopyOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    async fn sample_tree(root: &Path) -> anyhow::Result<()> {
        fs::create_dir_all(root.join("etc/app")).await?;
        fs::create_dir_all(root.join(".git/objects")).await?;
        fs::write(root.join("etc/app/settings.conf"), b"verbose=true\n").await?;
        fs::write(root.join("README"), b"hello").await?;
        fs::write(root.join(".git/HEAD"), b"ref: refs/heads/main\n").await?;
        fs::write(root.join(".git/objects/ab"), b"blob").await?;
        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_copy_tree_skips_vcs_metadata_by_default() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let source = temp_dir.path().join("source");
        let target = temp_dir.path().join("target");
        sample_tree(&source).await?;

        let stats = copy_tree(&source, &target, &CopyOptions::default()).await?;

        assert!(!target.join(".git").exists());
        assert_eq!(
            fs::read(target.join("etc/app/settings.conf")).await?,
            b"verbose=true\n"
        );
        assert_eq!(fs::read(target.join("README")).await?, b"hello");
        assert_eq!(stats.linked + stats.copied, 2);

        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_copy_tree_keeps_vcs_metadata_on_request() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let source = temp_dir.path().join("source");
        let target = temp_dir.path().join("target");
        sample_tree(&source).await?;

        let options = CopyOptions::builder().skip_vcs_metadata(false).build();
        let stats = copy_tree(&source, &target, &options).await?;

        assert_eq!(fs::read(target.join(".git/objects/ab")).await?, b"blob");
        assert_eq!(stats.linked + stats.copied, 4);

        Ok(())
    }

    #[cfg(unix)]
    #[test_log::test(tokio::test)]
    async fn test_hardlinks_share_inodes_and_copies_do_not() -> anyhow::Result<()> {
        use std::os::unix::fs::MetadataExt;

        let temp_dir = TempDir::new()?;
        let source = temp_dir.path().join("source");
        sample_tree(&source).await?;

        let linked = temp_dir.path().join("linked");
        let stats = copy_tree(&source, &linked, &CopyOptions::default()).await?;
        let source_ino = fs::metadata(source.join("README")).await?.ino();
        if stats.linked > 0 {
            assert_eq!(fs::metadata(linked.join("README")).await?.ino(), source_ino);
        }

        let copied = temp_dir.path().join("copied");
        let options = CopyOptions::builder().strategy(CopyStrategy::Copy).build();
        let stats = copy_tree(&source, &copied, &options).await?;
        assert_eq!(stats.linked, 0);
        assert_eq!(stats.copied, 2);
        assert_ne!(fs::metadata(copied.join("README")).await?.ino(), source_ino);

        Ok(())
    }

    #[cfg(unix)]
    #[test_log::test(tokio::test)]
    async fn test_copy_tree_recreates_symlinks() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let source = temp_dir.path().join("source");
        let target = temp_dir.path().join("target");
        sample_tree(&source).await?;
        fs::symlink("etc/app/settings.conf", source.join("settings")).await?;

        let stats = copy_tree(&source, &target, &CopyOptions::default()).await?;

        assert_eq!(stats.symlinks, 1);
        assert_eq!(
            fs::read_link(target.join("settings")).await?,
            Path::new("etc/app/settings.conf")
        );

        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_copy_tree_creates_empty_target_root() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let source = temp_dir.path().join("empty");
        let target = temp_dir.path().join("a/b/target");
        fs::create_dir_all(&source).await?;

        let stats = copy_tree(&source, &target, &CopyOptions::default()).await?;

        assert!(target.is_dir());
        assert_eq!(stats, CopyStats::default());

        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_copy_tree_rejects_non_directory_source() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let source = temp_dir.path().join("file");
        fs::write(&source, b"not a dir").await?;

        let result = copy_tree(&source, temp_dir.path().join("target"), &CopyOptions::default()).await;

        assert!(matches!(result, Err(FrostvaultError::Storage { .. })));
        assert!(!temp_dir.path().join("target").exists());

        Ok(())
    }

    #[cfg(target_os = "linux")]
    #[test_log::test(tokio::test)]
    async fn test_strategy_follows_filesystem_boundaries() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let source = temp_dir.path().join("source");
        let target = temp_dir.path().join("target");
        fs::create_dir_all(&source).await?;
        fs::create_dir_all(&target).await?;

        assert!(same_filesystem(&source, &target).await?);
        assert_eq!(
            effective_strategy(&source, &target, CopyStrategy::HardlinkOrCopy).await,
            CopyStrategy::HardlinkOrCopy
        );

        // procfs is never the filesystem of a temporary directory
        assert!(!same_filesystem("/proc", &target).await?);
        assert_eq!(
            effective_strategy(Path::new("/proc"), &target, CopyStrategy::HardlinkOrCopy).await,
            CopyStrategy::Copy
        );
        assert_eq!(
            effective_strategy(&source, &target, CopyStrategy::Copy).await,
            CopyStrategy::Copy
        );

        Ok(())
    }

    #[test]
    fn test_recoverable_link_errors() {
        assert!(is_recoverable_link_error(&io::Error::from(
            io::ErrorKind::PermissionDenied
        )));
        assert!(!is_recoverable_link_error(&io::Error::from(
            io::ErrorKind::AlreadyExists
        )));

        #[cfg(unix)]
        assert!(is_recoverable_link_error(&io::Error::from_raw_os_error(
            libc::EXDEV
        )));
    }
}
