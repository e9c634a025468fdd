use std::sync::Arc;

use crate::{
    domain::DomainKind,
    vcs::{CommitOutcome, HistoryEntry, RepositoryStatus, VersionTracker},
    FrostvaultError, FrostvaultResult,
};

use super::FreezeOrchestrator;

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl FreezeOrchestrator {
    /// Commits every change in the config domain.
    ///
    /// ## Errors
    /// - `DomainNotFound` if no domain is version controlled
    pub async fn commit_config(&self, message: &str) -> FrostvaultResult<CommitOutcome> {
        self.ensure_initialized()?;
        let message = message.to_string();
        self.with_tracker(move |tracker| tracker.commit(&message))
            .await
    }

    /// Tags the current config commit.
    pub async fn tag_config(&self, name: &str, message: &str) -> FrostvaultResult<()> {
        self.ensure_initialized()?;
        let (name, message) = (name.to_string(), message.to_string());
        self.with_tracker(move |tracker| tracker.tag(&name, &message))
            .await
    }

    /// The `max_count` most recent config commits, newest first.
    pub async fn config_history(&self, max_count: usize) -> FrostvaultResult<Vec<HistoryEntry>> {
        self.ensure_initialized()?;
        self.with_tracker(move |tracker| tracker.history(max_count))
            .await
    }

    /// The state of the config repository.
    pub async fn config_status(&self) -> FrostvaultResult<RepositoryStatus> {
        self.ensure_initialized()?;
        self.with_tracker(|tracker| tracker.status()).await
    }

    /// Runs `f` against the config tracker on the blocking thread pool.
    async fn with_tracker<T, F>(&self, f: F) -> FrostvaultResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn VersionTracker) -> FrostvaultResult<T> + Send + 'static,
    {
        let tracker: Arc<dyn VersionTracker> = self
            .config_tracker()
            .ok_or_else(|| FrostvaultError::DomainNotFound(DomainKind::Config.to_string()))?;

        tokio::task::spawn_blocking(move || f(tracker.as_ref())).await?
    }
}
