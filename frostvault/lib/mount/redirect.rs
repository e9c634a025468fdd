use std::{io, path::Path};

use async_trait::async_trait;
use tokio::fs;

use crate::{FrostvaultError, FrostvaultResult};

use super::{MountKind, Mounter};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Presents domains through symlinks. Used wherever overlays are unavailable.
#[derive(Debug, Default, Clone)]
pub struct RedirectMounter;

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl RedirectMounter {
    /// Creates the redirect backend.
    pub fn new() -> Self {
        Self
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Makes `target` a link to `source`, creating `target`'s parent if needed.
///
/// ## Errors
/// - `AlreadyExists` if anything, even a dangling link, exists at `target`
/// - `SourceMissing` if `source` does not exist
pub async fn create_redirect(
    source: impl AsRef<Path>,
    target: impl AsRef<Path>,
) -> FrostvaultResult<()> {
    let source = source.as_ref();
    let target = target.as_ref();

    if fs::symlink_metadata(target).await.is_ok() {
        return Err(FrostvaultError::AlreadyExists(target.to_path_buf()));
    }

    if !fs::try_exists(source)
        .await
        .map_err(FrostvaultError::at(source))?
    {
        return Err(FrostvaultError::SourceMissing(source.to_path_buf()));
    }

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(FrostvaultError::at(parent))?;
    }

    #[cfg(unix)]
    fs::symlink(source, target)
        .await
        .map_err(FrostvaultError::at(target))?;

    #[cfg(windows)]
    fs::symlink_dir(source, target)
        .await
        .map_err(FrostvaultError::at(target))?;

    tracing::info!(
        "redirected {} -> {}",
        target.display(),
        source.display()
    );

    Ok(())
}

/// Removes the link at `target`. Succeeds when nothing is there.
///
/// ## Errors
/// - `Storage` if `target` is a real file or directory rather than a link
pub async fn remove_redirect(target: impl AsRef<Path>) -> FrostvaultResult<()> {
    let target = target.as_ref();

    let metadata = match fs::symlink_metadata(target).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(FrostvaultError::storage(target, e)),
    };

    if !metadata.file_type().is_symlink() {
        return Err(FrostvaultError::storage(
            target,
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "refusing to remove a path that is not a redirect",
            ),
        ));
    }

    #[cfg(unix)]
    fs::remove_file(target)
        .await
        .map_err(FrostvaultError::at(target))?;

    #[cfg(windows)]
    fs::remove_dir(target)
        .await
        .map_err(FrostvaultError::at(target))?;

    tracing::info!("removed redirect {}", target.display());
    Ok(())
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

#[async_trait]
impl Mounter for RedirectMounter {
    fn kind(&self) -> MountKind {
        MountKind::Redirect
    }

    async fn overlay_supported(&self) -> bool {
        false
    }

    async fn mount_overlay(
        &self,
        _lower: &Path,
        _upper: &Path,
        _work: &Path,
        _mount_point: &Path,
    ) -> FrostvaultResult<()> {
        Err(FrostvaultError::MountUnsupported(
            "overlay mounts are unavailable on this platform".to_string(),
        ))
    }

    async fn unmount_overlay(&self, mount_point: &Path) -> FrostvaultResult<()> {
        if self.is_mount_point(mount_point).await? {
            return Err(FrostvaultError::UnmountFailed {
                mount_point: mount_point.to_path_buf(),
                reason: "the redirect backend cannot unmount overlays".to_string(),
            });
        }

        Ok(())
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
