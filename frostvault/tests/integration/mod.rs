mod freeze;
mod snapshot;
mod tree;

use std::{path::Path, sync::Arc};

use frostvault::{freeze::FreezeOrchestrator, mount::RedirectMounter};

//--------------------------------------------------------------------------------------------------
// Functions: Helpers
//--------------------------------------------------------------------------------------------------

/// Initializes an orchestrator at `base` that presents domains through symlinks.
pub(crate) async fn initialized_orchestrator(base: &Path) -> anyhow::Result<FreezeOrchestrator> {
    let mut orchestrator =
        FreezeOrchestrator::new(base).with_mounter(Arc::new(RedirectMounter::new()));
    orchestrator.init().await?;
    Ok(orchestrator)
}
