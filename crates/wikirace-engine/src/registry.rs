//! Session registry: creates, tracks, and destroys room actors.
//!
//! The registry is the only shared structure across rooms and needs only
//! coarse synchronization — the server keeps it behind one async mutex,
//! and rooms are independent once created. Idle garbage collection runs on
//! its own schedule and reclaims any room whose `updated` timestamp is
//! stale, regardless of what its roster claims.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::Mutex;
use wikirace_protocol::{Mode, RoomId, RoomSnapshot, Round, RoomPhase, Rules, Username};

use crate::clock::now_millis;
use crate::error::GameError;
use crate::room::{PlayerSender, RoomHandle, RoomInfo, spawn_room};

/// Command channel size for each room actor.
const ROOM_CHANNEL_SIZE: usize = 64;

/// Parameters of a join handshake.
#[derive(Debug, Clone)]
pub struct JoinRequest {
    pub username: Username,
    /// Join this room; absent or unknown ids create a new room.
    pub room_id: Option<RoomId>,
    /// Wiki language for a newly created room (default "en").
    pub language: Option<String>,
    pub mode: Mode,
}

/// All active rooms, keyed by room id.
pub struct RoomRegistry {
    rooms: HashMap<RoomId, RoomHandle>,
}

impl RoomRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            rooms: HashMap::new(),
        }
    }

    /// Attaches a player to a room, creating the room first when the id is
    /// absent or unknown. Returns the handle the connection should keep.
    pub async fn join(
        &mut self,
        request: JoinRequest,
        sender: PlayerSender,
    ) -> Result<RoomHandle, GameError> {
        if let Some(room_id) = &request.room_id {
            if let Some(handle) = self.rooms.get(room_id) {
                let handle = handle.clone();
                handle.join(request.username, sender).await?;
                return Ok(handle);
            }
        }

        let room_id = match request.room_id {
            Some(id) if !id.as_str().is_empty() => id,
            _ => self.generate_room_id(),
        };
        let snapshot = new_room(
            room_id.clone(),
            request.username.clone(),
            request.language.unwrap_or_else(|| "en".to_string()),
            request.mode,
        );
        let handle = spawn_room(snapshot, ROOM_CHANNEL_SIZE);
        handle.join(request.username, sender).await?;
        self.rooms.insert(room_id.clone(), handle.clone());
        tracing::info!(%room_id, "room created");
        Ok(handle)
    }

    /// Detaches a player; destroys the room when it empties.
    pub async fn leave(&mut self, room_id: &RoomId, username: &Username) {
        let Some(handle) = self.rooms.get(room_id).cloned() else {
            return;
        };
        match handle.leave(username.clone()).await {
            Ok(true) => self.destroy(room_id).await,
            Ok(false) => {}
            // Actor already gone; drop the stale handle.
            Err(_) => {
                self.rooms.remove(room_id);
            }
        }
    }

    /// Shuts down a room and forgets it.
    pub async fn destroy(&mut self, room_id: &RoomId) {
        if let Some(handle) = self.rooms.remove(room_id) {
            let _ = handle.shutdown().await;
            tracing::info!(%room_id, "room destroyed");
        }
    }

    /// Looks up a room by id.
    pub fn get(&self, room_id: &RoomId) -> Option<RoomHandle> {
        self.rooms.get(room_id).cloned()
    }

    /// Number of active rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Metadata for every room. Rooms that fail to respond (shutting down)
    /// are skipped.
    pub async fn overview(&self) -> Vec<RoomInfo> {
        let mut infos = Vec::with_capacity(self.rooms.len());
        for handle in self.rooms.values() {
            if let Ok(info) = handle.info().await {
                infos.push(info);
            }
        }
        infos
    }

    /// Full snapshots of every room, for the shutdown save.
    pub async fn snapshot_all(&self) -> Vec<RoomSnapshot> {
        let mut snapshots = Vec::with_capacity(self.rooms.len());
        for handle in self.rooms.values() {
            if let Ok(snapshot) = handle.snapshot().await {
                snapshots.push(snapshot);
            }
        }
        snapshots
    }

    /// Revives a persisted room. A mid-round snapshot resumes with its
    /// deadline recomputed from the stored start timestamp.
    pub fn restore(&mut self, snapshot: RoomSnapshot) {
        let room_id = snapshot.room_id.clone();
        if self.rooms.contains_key(&room_id) {
            tracing::warn!(%room_id, "duplicate room snapshot ignored");
            return;
        }
        let handle = spawn_room(snapshot, ROOM_CHANNEL_SIZE);
        self.rooms.insert(room_id.clone(), handle);
        tracing::info!(%room_id, "room restored");
    }

    /// One garbage-collection pass: destroys every room idle for longer
    /// than `idle_after`, phantom rosters included. Returns the number of
    /// rooms reclaimed.
    pub async fn sweep_idle(&mut self, idle_after: Duration) -> usize {
        let now = now_millis();
        let idle_millis = idle_after.as_millis() as u64;
        let mut stale = Vec::new();
        for (room_id, handle) in &self.rooms {
            match handle.info().await {
                Ok(info) => {
                    if now.saturating_sub(info.updated) > idle_millis {
                        stale.push(room_id.clone());
                    }
                }
                // Unresponsive actor: reclaim it too.
                Err(_) => stale.push(room_id.clone()),
            }
        }
        for room_id in &stale {
            tracing::info!(%room_id, "idle room reclaimed");
            self.destroy(room_id).await;
        }
        stale.len()
    }

    /// Five-digit numeric id, retried on collision.
    fn generate_room_id(&self) -> RoomId {
        let mut rng = rand::rng();
        loop {
            let id = RoomId(rng.random_range(0..100_000u32).to_string());
            if !self.rooms.contains_key(&id) {
                return id;
            }
        }
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// A fresh lobby owned by its creator.
fn new_room(room_id: RoomId, host: Username, language: String, mode: Mode) -> RoomSnapshot {
    let now = now_millis();
    RoomSnapshot {
        room_id,
        mode,
        language,
        host,
        state: RoomPhase::Lobby,
        players: Vec::new(),
        current_round: Round::default(),
        current_state: HashMap::new(),
        rules: Rules::default(),
        leaderboard: Vec::new(),
        past_rounds: Vec::new(),
        created: now,
        updated: now,
    }
}

/// Spawns the periodic idle sweeper. Runs until the registry is dropped
/// by everything else (i.e. for the life of the process).
pub fn spawn_idle_sweeper(
    registry: Arc<Mutex<RoomRegistry>>,
    interval: Duration,
    idle_after: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The immediate first tick would sweep at startup, before restored
        // rooms have seen any traffic; skip it.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let reclaimed = registry.lock().await.sweep_idle(idle_after).await;
            if reclaimed > 0 {
                tracing::info!(reclaimed, "idle sweep finished");
            }
        }
    })
}
