//! `frostvault` partitions a machine's persistent storage into policy-tagged domains and keeps
//! restorable snapshots of the frozen ones.
//!
//! # Overview
//!
//! A machine running frostvault can always be returned to a known-clean state, on demand or at
//! boot, while selected state keeps persisting or gets versioned:
//! - `sys` and `cfg` are frozen. They are captured by snapshots and rolled back on restore
//! - `cfg` is additionally versioned in a git history
//! - `user` persists across resets
//! - `cache` is always reset
//!
//! # Usage Example
//!
//! ```rust,no_run
//! use frostvault::freeze::{FreezeOrchestrator, RestoreTarget};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut orchestrator = FreezeOrchestrator::new("/var/lib/frostvault");
//!     orchestrator.init().await?;
//!
//!     let created = orchestrator.create_snapshot("clean", "fresh install").await?;
//!     orchestrator
//!         .set_default_snapshot(created.get_snapshot().get_id())
//!         .await?;
//!
//!     // Later, or at boot
//!     orchestrator.restore_snapshot(RestoreTarget::Default).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`domain`] - Domain kinds, policies and the persisted domain table
//! - [`mount`] - Overlay and redirect presentation of frozen domains
//! - [`tree`] - Bulk directory duplication
//! - [`snapshot`] - Capture, fingerprinting and restore of snapshots
//! - [`vcs`] - Version history of the config domain
//! - [`freeze`] - The top-level orchestrator
//! - [`cli`] - Command-line argument parsing

#![warn(missing_docs)]
#![allow(clippy::module_inception)]

mod error;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub mod cli;
pub mod config;
pub mod domain;
pub mod freeze;
pub mod mount;
pub mod snapshot;
pub mod tree;
pub mod utils;
pub mod vcs;

pub use error::*;
