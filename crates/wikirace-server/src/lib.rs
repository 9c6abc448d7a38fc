//! The Wikirace game server.
//!
//! Ties the layers together: WebSocket transport → per-connection handler
//! → room registry/engine, with optional snapshot persistence and an
//! optional admin surface. The binary in `main.rs` is a thin wrapper so
//! integration tests can run the same server in-process.

pub mod admin;
mod error;
mod handler;
mod transport;

use std::sync::Arc;

pub use error::ServerError;
use handler::{ServerState, handle_connection};
use tokio::sync::Mutex;
pub use transport::{JoinQuery, WsListener, parse_join_query};
use wikirace_engine::RoomRegistry;
use wikirace_resolver::ArticleResolver;
use wikirace_store::SnapshotStore;

/// A bound game server, ready to accept connections.
pub struct WikiraceServer<R> {
    listener: WsListener,
    state: Arc<ServerState<R>>,
}

impl<R: ArticleResolver> WikiraceServer<R> {
    /// Binds the game listener and wires the shared state.
    pub async fn bind(addr: &str, resolver: R) -> Result<Self, ServerError> {
        let listener = WsListener::bind(addr).await?;
        let state = Arc::new(ServerState {
            registry: Arc::new(Mutex::new(RoomRegistry::new())),
            resolver,
        });
        Ok(Self { listener, state })
    }

    /// Returns the bound address (useful with a `:0` bind).
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// The shared room registry, for persistence, GC, and the admin surface.
    pub fn registry(&self) -> Arc<Mutex<RoomRegistry>> {
        Arc::clone(&self.state.registry)
    }

    /// Runs the accept loop. Each connection gets its own handler task;
    /// a failed accept is logged and the loop keeps serving.
    pub async fn run(mut self) -> Result<(), ServerError> {
        tracing::info!("Wikirace server running");
        loop {
            match self.listener.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}

/// Loads persisted rooms into the registry at startup. A load failure
/// means starting empty, never refusing to start.
pub async fn restore_rooms<S: SnapshotStore + ?Sized>(
    registry: &Mutex<RoomRegistry>,
    store: &S,
) {
    match store.load() {
        Ok(snapshots) => {
            let count = snapshots.len();
            let mut registry = registry.lock().await;
            for snapshot in snapshots {
                registry.restore(snapshot);
            }
            tracing::info!(rooms = count, "room snapshots restored");
        }
        Err(e) => {
            tracing::warn!(error = %e, "snapshot load failed, starting empty");
        }
    }
}

/// Saves every live room on the way down. Best-effort: a store failure is
/// logged and shutdown continues.
pub async fn save_rooms<S: SnapshotStore + ?Sized>(registry: &Mutex<RoomRegistry>, store: &S) {
    let snapshots = registry.lock().await.snapshot_all().await;
    let count = snapshots.len();
    match store.store(&snapshots) {
        Ok(()) => tracing::info!(rooms = count, "room snapshots saved"),
        Err(e) => tracing::warn!(error = %e, "snapshot save failed, skipping"),
    }
}
