//! In-memory snapshot store for tests and simulations.

use std::sync::{Arc, Mutex};

use wikirace_protocol::RoomSnapshot;

use crate::{SnapshotStore, StoreError};

/// Keeps snapshots in a shared `Vec`. Clones share the same storage, so a
/// test can hand one clone to the server and inspect the other.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Vec<RoomSnapshot>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored snapshots.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<RoomSnapshot>> {
        // A panic while holding this lock poisons it; the data itself is
        // still coherent for our purposes, so keep going.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self) -> Result<Vec<RoomSnapshot>, StoreError> {
        Ok(self.lock().clone())
    }

    fn store(&self, snapshots: &[RoomSnapshot]) -> Result<(), StoreError> {
        *self.lock() = snapshots.to_vec();
        Ok(())
    }
}
