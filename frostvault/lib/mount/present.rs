use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::fs;

use crate::{domain::Domain, utils::StorageLayout, FrostvaultError, FrostvaultResult};

use super::{MountKind, Mounter};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// How a frozen domain ended up exposed to applications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Presentation {
    /// The domain name.
    pub domain: String,

    /// Where applications see the domain.
    pub view: PathBuf,

    /// The strategy in effect.
    pub kind: MountKind,

    /// Set when an overlay was attempted and the redirect strategy was used instead.
    pub fallback: bool,
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Exposes `domain` at its view path.
///
/// An overlay is tried first when the backend supports it. If the overlay cannot be mounted the
/// domain is redirected instead and the result says so. A domain that is already presented is
/// left as is.
pub async fn present(
    mounter: &dyn Mounter,
    layout: &StorageLayout,
    domain: &Domain,
) -> FrostvaultResult<Presentation> {
    let name = domain.get_name();
    let view = layout.view_dir(name);

    if let Some(kind) = presentation_of(mounter, &view).await? {
        tracing::debug!("domain {} already presented at {} ({})", name, view.display(), kind);
        return Ok(Presentation {
            domain: name.clone(),
            view,
            kind,
            fallback: false,
        });
    }

    let mut fallback = false;
    if mounter.overlay_supported().await {
        let result = mounter
            .mount_overlay(
                domain.get_path(),
                &layout.upper_dir(name),
                &layout.work_dir(name),
                &view,
            )
            .await;

        match result {
            Ok(()) => {
                tracing::info!("domain {} presented at {} via overlay", name, view.display());
                return Ok(Presentation {
                    domain: name.clone(),
                    view,
                    kind: MountKind::Overlay,
                    fallback: false,
                });
            }
            Err(e @ (FrostvaultError::MountUnsupported(_) | FrostvaultError::MountFailed { .. })) => {
                tracing::warn!("overlay for domain {} unavailable, using redirect: {}", name, e);
                remove_empty_dir(&view).await?;
                fallback = true;
            }
            Err(e) => return Err(e),
        }
    }

    mounter.create_redirect(domain.get_path(), &view).await?;
    tracing::info!("domain {} presented at {} via redirect", name, view.display());

    Ok(Presentation {
        domain: name.clone(),
        view,
        kind: MountKind::Redirect,
        fallback,
    })
}

/// Tears down whatever presents `domain`. Returns the strategy that was removed, if any.
pub async fn withdraw(
    mounter: &dyn Mounter,
    layout: &StorageLayout,
    domain: &Domain,
) -> FrostvaultResult<Option<MountKind>> {
    let view = layout.view_dir(domain.get_name());

    let kind = presentation_of(mounter, &view).await?;
    match kind {
        Some(MountKind::Overlay) => {
            mounter.unmount_overlay(&view).await?;
            remove_empty_dir(&view).await?;
        }
        Some(MountKind::Redirect) => mounter.remove_redirect(&view).await?,
        None => {}
    }

    if let Some(kind) = kind {
        tracing::info!("withdrew {} presentation of domain {}", kind, domain.get_name());
    }

    Ok(kind)
}

/// Which strategy currently presents the view at `view`, if any.
pub async fn presentation_of(
    mounter: &dyn Mounter,
    view: &Path,
) -> FrostvaultResult<Option<MountKind>> {
    if mounter.is_mount_point(view).await? {
        return Ok(Some(MountKind::Overlay));
    }

    match fs::symlink_metadata(view).await {
        Ok(metadata) if metadata.file_type().is_symlink() => Ok(Some(MountKind::Redirect)),
        Ok(_) => Ok(None),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(FrostvaultError::storage(view, e)),
    }
}

/// Drops the overlay upper and work layers of the domain `name`.
pub async fn discard_layers(layout: &StorageLayout, name: &str) -> FrostvaultResult<()> {
    let layers = layout.layers_dir(name);
    match fs::remove_dir_all(&layers).await {
        Ok(()) => {
            tracing::debug!("discarded overlay layers of domain {}", name);
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(FrostvaultError::storage(&layers, e)),
    }
}

async fn remove_empty_dir(path: &Path) -> FrostvaultResult<()> {
    match fs::remove_dir(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(FrostvaultError::storage(path, e)),
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use tempfile::TempDir;

    use crate::{domain::DomainKind, mount::RedirectMounter};

    use super::*;

    /// Claims overlay support but every mount is rejected by the OS.
    #[derive(Debug)]
    struct RejectingOverlay;

    #[async_trait]
    impl Mounter for RejectingOverlay {
        fn kind(&self) -> MountKind {
            MountKind::Overlay
        }

        async fn overlay_supported(&self) -> bool {
            true
        }

        async fn mount_overlay(
            &self,
            lower: &Path,
            upper: &Path,
            work: &Path,
            mount_point: &Path,
        ) -> FrostvaultResult<()> {
            for dir in [lower, upper, work, mount_point] {
                fs::create_dir_all(dir).await?;
            }
            Err(FrostvaultError::MountFailed {
                mount_point: mount_point.to_path_buf(),
                reason: "operation not permitted".to_string(),
            })
        }

        async fn unmount_overlay(&self, _mount_point: &Path) -> FrostvaultResult<()> {
            Ok(())
        }
    }

    async fn sys_domain(layout: &StorageLayout) -> anyhow::Result<Domain> {
        let domain =
            Domain::with_default_policy(DomainKind::System, layout.domain_dir(DomainKind::System.as_str()));
        fs::create_dir_all(domain.get_path()).await?;
        fs::write(domain.get_path().join("hostname"), b"frost\n").await?;
        Ok(domain)
    }

    #[test_log::test(tokio::test)]
    async fn test_present_and_withdraw_with_redirect() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let layout = StorageLayout::new(temp_dir.path());
        let domain = sys_domain(&layout).await?;
        let mounter = RedirectMounter::new();

        let presentation = present(&mounter, &layout, &domain).await?;
        assert_eq!(presentation.kind, MountKind::Redirect);
        assert!(!presentation.fallback);
        assert_eq!(fs::read(presentation.view.join("hostname")).await?, b"frost\n");

        // Presenting twice keeps the existing view
        let again = present(&mounter, &layout, &domain).await?;
        assert_eq!(again.kind, MountKind::Redirect);

        assert_eq!(
            withdraw(&mounter, &layout, &domain).await?,
            Some(MountKind::Redirect)
        );
        assert_eq!(withdraw(&mounter, &layout, &domain).await?, None);
        assert!(domain.get_path().join("hostname").exists());

        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_present_falls_back_when_overlay_is_rejected() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let layout = StorageLayout::new(temp_dir.path());
        let domain = sys_domain(&layout).await?;

        let presentation = present(&RejectingOverlay, &layout, &domain).await?;

        assert_eq!(presentation.kind, MountKind::Redirect);
        assert!(presentation.fallback);
        assert_eq!(
            presentation_of(&RejectingOverlay, &presentation.view).await?,
            Some(MountKind::Redirect)
        );

        discard_layers(&layout, domain.get_name()).await?;
        assert!(!layout.layers_dir(domain.get_name()).exists());

        Ok(())
    }
}
