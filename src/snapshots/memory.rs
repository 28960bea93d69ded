//! In-memory snapshot store.

use super::SnapshotStore;
use crate::error::Result;
use crate::types::Snapshot;
use parking_lot::Mutex;

/// Snapshot store kept in process memory. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    snapshot: Mutex<Option<Snapshot>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with `snapshot`.
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            snapshot: Mutex::new(Some(snapshot)),
        }
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn get(&self) -> Result<Option<Snapshot>> {
        Ok(self.snapshot.lock().clone())
    }

    fn set(&self, snapshot: &Snapshot) -> Result<()> {
        *self.snapshot.lock() = Some(snapshot.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.snapshot.lock() = None;
        Ok(())
    }
}
