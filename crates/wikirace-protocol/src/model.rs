//! The shared room data model.
//!
//! These types are used three ways: inside the engine as the room's live
//! state, on the wire in snapshots and events, and in the persistence layer
//! as the stored blob. All of them serialize with camelCase keys — that is
//! the shape the extension client speaks.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{RoomId, Username};

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// The lifecycle state of a room.
///
/// Only two states exist. Round completion is an instantaneous transition
/// back to `Lobby` plus a `finished` broadcast — there is no terminal state.
///
/// ```text
/// Lobby ──(host start)──→ Playing ──(deadline / all finished)──→ Lobby
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RoomPhase {
    /// Settings are mutable, no round is running.
    #[default]
    Lobby,
    /// A round is live; per-player progress is tracked in `current_state`.
    Playing,
}

/// Whether a room admits one player or many.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Solo practice room: a second join is rejected.
    Single,
    #[default]
    Multi,
}

impl std::str::FromStr for Mode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single" => Ok(Self::Single),
            "multi" => Ok(Self::Multi),
            _ => Err(()),
        }
    }
}

/// The scoring metric for a round.
///
/// `Unknown` absorbs unrecognized values from old or misbehaving clients
/// (`#[serde(other)]`); the scoring calculator falls back to clicks for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    #[default]
    Clicks,
    Time,
    Combined,
    #[serde(other)]
    Unknown,
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// The rules in effect for a room. Mutable by the host while in the lobby.
///
/// `allow_ctrlf` and `allow_nav` are enforced client-side (the server cannot
/// observe in-page search or address-bar use); the server only carries and
/// broadcasts them. Everything else is enforced server-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rules {
    /// Round length in seconds.
    pub time_limit: u64,
    pub metric: Metric,
    pub allow_ctrlf: bool,
    pub allow_disambiguation: bool,
    pub allow_back: bool,
    pub allow_nav: bool,
    pub allow_category: bool,
    /// Canonical titles that may not be visited (nor used as start/target).
    #[serde(default)]
    pub banned_articles: Vec<String>,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            time_limit: 120,
            metric: Metric::Clicks,
            allow_ctrlf: true,
            allow_disambiguation: true,
            allow_back: true,
            allow_nav: true,
            allow_category: false,
            banned_articles: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Round state
// ---------------------------------------------------------------------------

/// The current round: the article pair, timing, and the public per-player
/// result projection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Round {
    pub start: String,
    pub target: String,
    #[serde(default)]
    pub start_thumbnail: String,
    #[serde(default)]
    pub target_thumbnail: String,
    pub started: bool,
    /// Unix milliseconds when the round started. Survives restarts so the
    /// deadline can be recomputed rather than restarted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_timestamp: Option<u64>,
    /// Seconds remaining, as last computed by the ticker.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_left: Option<i64>,
    #[serde(default)]
    pub result: Vec<RoundResultEntry>,
}

impl Round {
    /// The reset applied on round completion: the article pair survives as
    /// a seed for the next round, everything else is cleared.
    pub fn reset_to_lobby(&self) -> Self {
        Self {
            start: self.start.clone(),
            target: self.target.clone(),
            start_thumbnail: self.start_thumbnail.clone(),
            target_thumbnail: self.target_thumbnail.clone(),
            ..Self::default()
        }
    }
}

/// The public projection of one player's progress, broadcast to the whole
/// room. Deliberately excludes `path` — other players' routes stay hidden
/// while the round is live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundResultEntry {
    pub username: Username,
    pub finished: bool,
    pub clicks: u32,
    pub time_taken: u64,
    pub score: i32,
}

// ---------------------------------------------------------------------------
// Per-player progress
// ---------------------------------------------------------------------------

/// One player's private progress within the active round.
///
/// `path` is append-only: it records every article visited, including
/// revisits via back-moves. `navigation_stack` mirrors the browser history
/// and shrinks on back-moves so a one-step "back" can be recognized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerProgress {
    pub path: Vec<String>,
    #[serde(default)]
    pub navigation_stack: Vec<String>,
    pub clicks: u32,
    #[serde(default)]
    pub backs: u32,
    pub finished: bool,
    pub time_taken: u64,
    pub score: i32,
}

impl PlayerProgress {
    /// Fresh progress at the round's start article. Every player starts a
    /// round with an identical copy of this.
    pub fn seeded(start: &str) -> Self {
        Self {
            path: vec![start.to_string()],
            navigation_stack: vec![start.to_string()],
            clicks: 0,
            backs: 0,
            finished: false,
            time_taken: 0,
            score: 0,
        }
    }

    /// The public projection of this progress.
    pub fn result_entry(&self, username: &Username) -> RoundResultEntry {
        RoundResultEntry {
            username: username.clone(),
            finished: self.finished,
            clicks: self.clicks,
            time_taken: self.time_taken,
            score: self.score,
        }
    }
}

// ---------------------------------------------------------------------------
// Leaderboard and round history
// ---------------------------------------------------------------------------

/// Cumulative score across all rounds of a room's lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub username: Username,
    pub score: i64,
}

/// One entry of a finished round: the public result plus the full path,
/// which becomes visible once the round is over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PastRoundEntry {
    #[serde(flatten)]
    pub result: RoundResultEntry,
    pub path: Vec<String>,
}

/// An immutable snapshot of a completed round, including the rules that
/// were in effect when it ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PastRound {
    pub start: String,
    pub target: String,
    pub rules: Rules,
    /// Sorted by score, descending.
    pub result: Vec<PastRoundEntry>,
}

// ---------------------------------------------------------------------------
// Room snapshot
// ---------------------------------------------------------------------------

/// The complete serializable state of a room.
///
/// This is the engine's live state, the persistence blob, and the admin
/// debug view, all in one shape. The `Init` event derives from it (with
/// other players' private progress stripped).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub room_id: RoomId,
    #[serde(default)]
    pub mode: Mode,
    pub language: String,
    pub host: Username,
    pub state: RoomPhase,
    pub players: Vec<Username>,
    pub current_round: Round,
    #[serde(default)]
    pub current_state: HashMap<Username, PlayerProgress>,
    pub rules: Rules,
    pub leaderboard: Vec<LeaderboardEntry>,
    #[serde(default)]
    pub past_rounds: Vec<PastRound>,
    /// Unix milliseconds.
    pub created: u64,
    /// Unix milliseconds; bumped by every handled operation, drives idle GC.
    pub updated: u64,
}
