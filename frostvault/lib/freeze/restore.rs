use serde::Serialize;

use crate::{
    mount::{self, MountKind, Presentation},
    snapshot::{DomainRestore, RestoreReport},
    FrostvaultError, FrostvaultResult,
};

use super::FreezeOrchestrator;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Which snapshot [`FreezeOrchestrator::restore_snapshot`] restores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreTarget {
    /// A snapshot id, or the label of the oldest snapshot carrying it.
    Snapshot(String),

    /// The configured default snapshot.
    Default,
}

/// Result of [`FreezeOrchestrator::boot_restore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BootOutcome {
    /// Protection is thawed. Nothing was restored.
    SkippedThawed,

    /// No default snapshot is set. Nothing was restored.
    NoDefault,

    /// The default snapshot was restored.
    Restored {
        /// Per-domain outcome.
        report: RestoreReport,
    },
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl FreezeOrchestrator {
    /// Restores the frozen domains from `target`.
    ///
    /// Presented domains are withdrawn first. After the restore the overlay layers of restored
    /// domains are discarded and the withdrawn domains are presented again, even when the restore
    /// itself failed. A domain whose layers cannot be discarded or that cannot be presented again
    /// is reported as failed.
    ///
    /// ## Errors
    /// - `NoDefaultSet` if `target` is [`RestoreTarget::Default`] and no default is set
    /// - `SnapshotNotFound` if the snapshot or its stored copy does not exist
    ///
    /// Per-domain failures are reported in the [`RestoreReport`], not as errors.
    pub async fn restore_snapshot(&mut self, target: RestoreTarget) -> FrostvaultResult<RestoreReport> {
        self.ensure_initialized()?;

        let id = match &target {
            RestoreTarget::Snapshot(id_or_name) => {
                self.snapshots.resolve(id_or_name)?.get_id().clone()
            }
            RestoreTarget::Default => self
                .snapshots
                .default_snapshot()
                .ok_or(FrostvaultError::NoDefaultSet)?
                .get_id()
                .clone(),
        };

        let withdrawn = self.withdraw_domains().await?;

        let mut result = self
            .snapshots
            .restore(&id, &self.registry.frozen_paths())
            .await;

        if let Ok(report) = &mut result {
            for name in report.restored() {
                if let Err(e) = mount::discard_layers(&self.layout, &name).await {
                    tracing::warn!("could not discard layers of {}: {}", name, e);
                    report.record(
                        name,
                        DomainRestore::Failed {
                            reason: format!("restored but overlay layers were kept: {e}"),
                        },
                    );
                }
            }
        }

        // Every withdrawn domain is presented again, whatever happened above
        let mounter = self.mounter().await;
        for (name, _) in withdrawn {
            let presented = match self.registry.get(&name) {
                Ok(domain) => mount::present(mounter.as_ref(), &self.layout, domain)
                    .await
                    .map(|_| ()),
                Err(e) => Err(e),
            };

            if let Err(e) = presented {
                tracing::warn!("could not present {} again: {}", name, e);
                if let Ok(report) = &mut result {
                    report.record(
                        name,
                        DomainRestore::Failed {
                            reason: format!("could not be presented again: {e}"),
                        },
                    );
                }
            }
        }

        let report = result?;
        if report.is_success() {
            tracing::info!("restored snapshot {}", id);
        } else {
            tracing::warn!(
                "snapshot {} restored with failures in: {}",
                id,
                report.failed().join(", ")
            );
        }

        Ok(report)
    }

    /// The restore-on-boot entry point.
    ///
    /// Skips when thawed or when no default snapshot is set. Otherwise restores the default.
    ///
    /// ## Errors
    /// - `RestoreIncomplete` if any domain failed to restore
    pub async fn boot_restore(&mut self) -> FrostvaultResult<BootOutcome> {
        self.ensure_initialized()?;

        if self.state.is_thawed() {
            tracing::info!("thawed, skipping boot restore");
            return Ok(BootOutcome::SkippedThawed);
        }

        let Some(default) = self.snapshots.default_snapshot() else {
            tracing::info!("no default snapshot, skipping boot restore");
            return Ok(BootOutcome::NoDefault);
        };

        let id = default.get_id().clone();
        tracing::info!("boot restore of default snapshot {}", id);

        let report = self
            .restore_snapshot(RestoreTarget::Snapshot(id))
            .await?
            .into_result()?;

        Ok(BootOutcome::Restored { report })
    }

    /// Exposes every frozen domain at its view path.
    pub async fn present_domains(&mut self) -> FrostvaultResult<Vec<Presentation>> {
        self.ensure_initialized()?;
        let mounter = self.mounter().await;

        let mut presentations = Vec::new();
        for domain in self.registry.frozen() {
            presentations.push(mount::present(mounter.as_ref(), &self.layout, domain).await?);
        }

        Ok(presentations)
    }

    /// Tears down the presentation of every frozen domain. Returns the domains that were
    /// presented and how.
    pub async fn withdraw_domains(&mut self) -> FrostvaultResult<Vec<(String, MountKind)>> {
        self.ensure_initialized()?;
        let mounter = self.mounter().await;

        let mut withdrawn = Vec::new();
        for domain in self.registry.frozen() {
            if let Some(kind) = mount::withdraw(mounter.as_ref(), &self.layout, domain).await? {
                withdrawn.push((domain.get_name().clone(), kind));
            }
        }

        Ok(withdrawn)
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
