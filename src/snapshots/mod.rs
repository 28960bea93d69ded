//! Persistence of the current snapshot.
//!
//! Exactly one [`Snapshot`] is stored under a fixed key. It is read and
//! replaced as a whole; there are no partial-field updates.

mod file;
mod memory;

pub use file::FileSnapshotStore;
pub use memory::MemorySnapshotStore;

use crate::error::Result;
use crate::types::Snapshot;

/// Logical key the snapshot is stored under.
pub const SNAPSHOT_KEY: &str = "productData";

/// Single-slot snapshot storage with overwrite semantics.
pub trait SnapshotStore: Send + Sync {
    /// Load the stored snapshot, if any.
    fn get(&self) -> Result<Option<Snapshot>>;

    /// Replace the stored snapshot.
    fn set(&self, snapshot: &Snapshot) -> Result<()>;

    /// Remove the stored snapshot. A later `get` returns `None`.
    fn clear(&self) -> Result<()>;
}
