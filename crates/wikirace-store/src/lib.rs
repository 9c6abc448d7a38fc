//! Snapshot persistence for Wikirace rooms.
//!
//! The engine is in-memory; this crate exists only so a restart doesn't
//! wipe every live room. The contract is deliberately small: one bulk
//! `load` at startup, one bulk `store` on the shutdown signal. This is a
//! best-effort snapshot, not a transactional log — a crash between saves
//! loses whatever happened since the last one, and that's accepted.
//!
//! The trait is synchronous: it runs off the hot path, at process
//! boundaries only.

mod memory;
mod redb_store;

pub use memory::MemoryStore;
pub use redb_store::RedbStore;
use wikirace_protocol::RoomSnapshot;

/// Errors from the persistence backend. Callers log these and continue —
/// persistence failures are never fatal to startup or shutdown.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing database failed.
    #[error("snapshot store failure: {0}")]
    Backend(String),

    /// A snapshot could not be serialized.
    #[error("failed to encode snapshot: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Bulk save/restore of room snapshots.
pub trait SnapshotStore: Send + Sync + 'static {
    /// Loads every stored snapshot. Corrupt entries are skipped with a
    /// warning, not propagated — one bad room must not block a restart.
    fn load(&self) -> Result<Vec<RoomSnapshot>, StoreError>;

    /// Replaces the stored set with `snapshots`.
    fn store(&self, snapshots: &[RoomSnapshot]) -> Result<(), StoreError>;
}
