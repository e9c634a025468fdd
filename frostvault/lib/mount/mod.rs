//! Platform operations that present a frozen domain read-write while keeping its base pristine.
//!
//! Two backends implement [`Mounter`]:
//! - [`OverlayMounter`]: a kernel overlay with the domain as lower layer (Linux, privileged)
//! - [`RedirectMounter`]: a symlink from the view to the domain (everywhere else)
//!
//! The backend is picked once by [`select_mounter`]. [`present`] and [`withdraw`] expose a domain
//! at its view path and fall back to a redirect when an overlay cannot be established.

#[cfg(target_os = "linux")]
mod overlay;
mod present;
mod redirect;

use std::{fmt, path::Path, sync::Arc};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::FrostvaultResult;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

#[cfg(target_os = "linux")]
pub use overlay::*;
pub use present::*;
pub use redirect::*;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The strategy used to present a frozen domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MountKind {
    /// A kernel overlay mount.
    Overlay,

    /// A symlink to the domain's live path.
    Redirect,
}

/// Mount operations of one platform backend.
#[async_trait]
pub trait Mounter: fmt::Debug + Send + Sync {
    /// The strategy this backend prefers.
    fn kind(&self) -> MountKind;

    /// Whether overlay mounts can be made here.
    async fn overlay_supported(&self) -> bool;

    /// Mounts an overlay of `lower` at `mount_point` with `upper` and `work` as writable layers.
    ///
    /// All four directories are created first.
    ///
    /// ## Errors
    /// - `MountUnsupported` if the platform has no overlay support
    /// - `MountFailed` if the OS rejects the mount
    async fn mount_overlay(
        &self,
        lower: &Path,
        upper: &Path,
        work: &Path,
        mount_point: &Path,
    ) -> FrostvaultResult<()>;

    /// Unmounts the overlay at `mount_point`. Succeeds when nothing is mounted there.
    async fn unmount_overlay(&self, mount_point: &Path) -> FrostvaultResult<()>;

    /// Whether `path` is the root of a mounted filesystem.
    async fn is_mount_point(&self, path: &Path) -> FrostvaultResult<bool> {
        is_mount_point(path).await
    }

    /// Makes `target` refer to `source`.
    async fn create_redirect(&self, source: &Path, target: &Path) -> FrostvaultResult<()> {
        create_redirect(source, target).await
    }

    /// Removes a redirect created by [`Mounter::create_redirect`].
    async fn remove_redirect(&self, target: &Path) -> FrostvaultResult<()> {
        remove_redirect(target).await
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Picks the mount backend for this machine.
///
/// The overlay backend is chosen on Linux when the kernel lists overlay support and the process
/// has the privileges to mount. Everything else gets the redirect backend.
pub async fn select_mounter() -> Arc<dyn Mounter> {
    #[cfg(target_os = "linux")]
    if OverlayMounter::probe().await {
        tracing::debug!("selected overlay mount backend");
        return Arc::new(OverlayMounter::new());
    }

    tracing::debug!("selected redirect mount backend");
    Arc::new(RedirectMounter::new())
}

/// Whether `path` is the root of a mounted filesystem, judged by comparing its device id with
/// its parent's. Missing paths and symlinks are never mount points.
pub async fn is_mount_point(path: impl AsRef<Path>) -> FrostvaultResult<bool> {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;

        use tokio::fs;

        use crate::FrostvaultError;

        let metadata = match fs::symlink_metadata(path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(FrostvaultError::storage(path, e)),
        };

        if !metadata.is_dir() {
            return Ok(false);
        }

        let parent = path.join("..");
        let parent_metadata = fs::metadata(&parent)
            .await
            .map_err(FrostvaultError::at(&parent))?;

        Ok(metadata.dev() != parent_metadata.dev() || metadata.ino() == parent_metadata.ino())
    }

    #[cfg(not(unix))]
    {
        let _ = path;
        Ok(false)
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl fmt::Display for MountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MountKind::Overlay => write!(f, "overlay"),
            MountKind::Redirect => write!(f, "redirect"),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
