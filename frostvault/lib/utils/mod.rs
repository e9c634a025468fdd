//! Utility functions and types.

mod disk;
mod path;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use disk::*;
pub use path::*;
