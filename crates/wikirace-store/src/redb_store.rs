//! Durable snapshot store backed by redb.
//!
//! One table, keyed by room id, holding JSON blobs. Redb gives us ACID
//! commits, so a save interrupted mid-write leaves the previous set
//! intact.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableTable, TableDefinition};
use wikirace_protocol::RoomSnapshot;

use crate::{SnapshotStore, StoreError};

/// Table: room id → JSON-encoded [`RoomSnapshot`].
const SNAPSHOTS: TableDefinition<&str, &[u8]> = TableDefinition::new("room_snapshots");

/// Durable storage backed by a redb database file. Clone is cheap (Arc).
#[derive(Clone)]
pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    /// Opens or creates the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = Database::create(path.as_ref()).map_err(backend)?;

        // Make sure the table exists so a fresh database loads cleanly.
        let txn = db.begin_write().map_err(backend)?;
        txn.open_table(SNAPSHOTS).map(|_| ()).map_err(backend)?;
        txn.commit().map_err(backend)?;

        Ok(Self { db: Arc::new(db) })
    }
}

impl SnapshotStore for RedbStore {
    fn load(&self) -> Result<Vec<RoomSnapshot>, StoreError> {
        let txn = self.db.begin_read().map_err(backend)?;
        let table = txn.open_table(SNAPSHOTS).map_err(backend)?;

        let mut snapshots = Vec::new();
        for entry in table.iter().map_err(backend)? {
            let (key, value) = entry.map_err(backend)?;
            match serde_json::from_slice::<RoomSnapshot>(value.value()) {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(e) => {
                    tracing::warn!(
                        room_id = key.value(),
                        error = %e,
                        "skipping corrupt room snapshot"
                    );
                }
            }
        }
        Ok(snapshots)
    }

    fn store(&self, snapshots: &[RoomSnapshot]) -> Result<(), StoreError> {
        let txn = self.db.begin_write().map_err(backend)?;
        // Replace wholesale: rooms destroyed since the last save must not
        // come back from the dead on the next restart.
        txn.delete_table(SNAPSHOTS).map(|_| ()).map_err(backend)?;
        {
            let mut table = txn.open_table(SNAPSHOTS).map_err(backend)?;
            for snapshot in snapshots {
                let blob = serde_json::to_vec(snapshot).map_err(StoreError::Encode)?;
                table
                    .insert(snapshot.room_id.as_str(), blob.as_slice())
                    .map(|_| ())
                    .map_err(backend)?;
            }
        }
        txn.commit().map_err(backend)?;
        Ok(())
    }
}

fn backend(e: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(e.to_string())
}
