//! Storage domains and the registry that persists them.
//!
//! A domain is a named storage area tagged with a reset policy. The set of domains is fixed: one
//! per [`DomainKind`], created at initialization from [`DomainKind::policy`] and persisted in
//! `domains.json`.

mod domain;
mod kind;
mod registry;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use domain::*;
pub use kind::*;
pub use registry::*;
