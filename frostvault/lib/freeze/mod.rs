//! The top-level freeze state machine.
//!
//! [`FreezeOrchestrator`] moves storage from uninitialized to initialized, coordinates snapshot
//! capture and restore across domains, tracks the freeze/thaw flag and exposes the restore-on-boot
//! entry point that boot services invoke.

mod history;
mod orchestrator;
mod restore;
mod state;
mod status;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use orchestrator::*;
pub use restore::*;
pub use state::*;
pub use status::*;
