//! Point-in-time copies of frozen domains.
//!
//! A [`Snapshot`] is an immutable record of what a set of domains contained at one instant. The
//! [`SnapshotStore`] owns the snapshot index (`snapshots.json`) and the stored copies under
//! `<base>/snapshots/<id>/<domain>/`. It never touches a domain's live path except during an
//! explicit [`SnapshotStore::restore`].

mod fingerprint;
mod report;
mod snapshot;
mod store;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use fingerprint::*;
pub use report::*;
pub use snapshot::*;
pub use store::*;
