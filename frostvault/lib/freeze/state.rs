use serde::Serialize;
use tokio::fs;

use crate::{utils::StorageLayout, FrostvaultError, FrostvaultResult};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Whether frozen-domain protection is suspended.
///
/// Persisted as the presence of the `.thawed` marker under the base path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FreezeState {
    thawed: bool,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl FreezeState {
    /// Reads the flag from the marker under `layout`.
    pub async fn load(layout: &StorageLayout) -> FrostvaultResult<Self> {
        let marker = layout.thaw_marker();
        let thawed = fs::try_exists(&marker)
            .await
            .map_err(FrostvaultError::at(&marker))?;
        Ok(Self { thawed })
    }

    /// Persists the flag by creating or removing the marker.
    pub async fn save(&self, layout: &StorageLayout) -> FrostvaultResult<()> {
        let marker = layout.thaw_marker();
        if self.thawed {
            frostutils::create_marker(&marker).await?;
        } else {
            frostutils::remove_marker(&marker).await?;
        }
        Ok(())
    }

    /// Suspends protection.
    pub fn thaw(&mut self) {
        self.thawed = true;
    }

    /// Resumes protection.
    pub fn freeze(&mut self) {
        self.thawed = false;
    }

    /// Whether protection is suspended.
    pub fn is_thawed(&self) -> bool {
        self.thawed
    }

    /// Whether protection is in effect.
    pub fn is_frozen(&self) -> bool {
        !self.thawed
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test_log::test(tokio::test)]
    async fn test_state_round_trips_through_marker() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let layout = StorageLayout::new(temp_dir.path());

        let mut state = FreezeState::load(&layout).await?;
        assert!(state.is_frozen());

        state.thaw();
        state.save(&layout).await?;
        assert!(layout.thaw_marker().exists());
        assert!(FreezeState::load(&layout).await?.is_thawed());

        state.freeze();
        state.save(&layout).await?;
        assert!(!layout.thaw_marker().exists());
        assert!(FreezeState::load(&layout).await?.is_frozen());

        Ok(())
    }
}
