use std::path::{Path, PathBuf};

use async_trait::async_trait;
use nix::mount::{self, MntFlags, MsFlags};
use tokio::fs;

use crate::{FrostvaultError, FrostvaultResult};

use super::{MountKind, Mounter};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// Where the kernel lists the filesystems it supports.
const PROC_FILESYSTEMS: &str = "/proc/filesystems";

/// The filesystem type name of kernel overlays.
const OVERLAY_FS_TYPE: &str = "overlay";

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Presents domains through kernel overlay mounts.
#[derive(Debug, Default, Clone)]
pub struct OverlayMounter;

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl OverlayMounter {
    /// Creates the overlay backend.
    pub fn new() -> Self {
        Self
    }

    /// Whether the kernel supports overlays and this process may mount them.
    pub async fn probe() -> bool {
        kernel_has_overlay().await && nix::unistd::geteuid().is_root()
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

async fn kernel_has_overlay() -> bool {
    match fs::read_to_string(PROC_FILESYSTEMS).await {
        Ok(contents) => contents
            .lines()
            .any(|line| line.split_whitespace().last() == Some(OVERLAY_FS_TYPE)),
        Err(e) => {
            tracing::debug!("could not read {}: {}", PROC_FILESYSTEMS, e);
            false
        }
    }
}

fn overlay_options(lower: &Path, upper: &Path, work: &Path) -> String {
    format!(
        "lowerdir={},upperdir={},workdir={}",
        lower.display(),
        upper.display(),
        work.display()
    )
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

#[async_trait]
impl Mounter for OverlayMounter {
    fn kind(&self) -> MountKind {
        MountKind::Overlay
    }

    async fn overlay_supported(&self) -> bool {
        Self::probe().await
    }

    async fn mount_overlay(
        &self,
        lower: &Path,
        upper: &Path,
        work: &Path,
        mount_point: &Path,
    ) -> FrostvaultResult<()> {
        if !kernel_has_overlay().await {
            return Err(FrostvaultError::MountUnsupported(
                "kernel does not list overlay support".to_string(),
            ));
        }

        for dir in [lower, upper, work, mount_point] {
            fs::create_dir_all(dir)
                .await
                .map_err(FrostvaultError::at(dir))?;
        }

        let options = overlay_options(lower, upper, work);
        let target: PathBuf = mount_point.to_path_buf();
        tracing::info!("mounting overlay at {} ({})", target.display(), options);

        let result = tokio::task::spawn_blocking(move || {
            mount::mount(
                Some(OVERLAY_FS_TYPE),
                &target,
                Some(OVERLAY_FS_TYPE),
                MsFlags::empty(),
                Some(options.as_str()),
            )
        })
        .await?;

        result.map_err(|errno| {
            tracing::error!("overlay mount at {} failed: {}", mount_point.display(), errno);
            FrostvaultError::MountFailed {
                mount_point: mount_point.to_path_buf(),
                reason: errno.to_string(),
            }
        })
    }

    async fn unmount_overlay(&self, mount_point: &Path) -> FrostvaultResult<()> {
        if !self.is_mount_point(mount_point).await? {
            return Ok(());
        }

        tracing::info!("unmounting overlay at {}", mount_point.display());
        let target = mount_point.to_path_buf();
        let result = tokio::task::spawn_blocking(move || {
            mount::umount2(&target, MntFlags::empty()).or_else(|errno| {
                tracing::warn!("unmount failed ({}), trying lazy unmount", errno);
                mount::umount2(&target, MntFlags::MNT_DETACH)
            })
        })
        .await?;

        result.map_err(|errno| FrostvaultError::UnmountFailed {
            mount_point: mount_point.to_path_buf(),
            reason: errno.to_string(),
        })
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
