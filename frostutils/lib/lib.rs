//! `frostutils` is a library containing general utilities for the frostvault project.

#![warn(missing_docs)]

pub mod error;
pub mod fs;
pub mod path;
pub mod term;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use error::*;
pub use fs::*;
pub use path::*;
