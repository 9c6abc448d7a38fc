//! Wire protocol and shared data model for Wikirace.
//!
//! Everything in this crate travels "on the wire": the identity newtypes,
//! the room/round/progress model, the typed patch structs used for partial
//! updates, and the client/server frame enums. The JSON shapes here are the
//! contract with the browser extension, so they are pinned by tests.

mod codec;
mod error;
mod message;
mod model;
mod patch;
mod types;

pub use codec::{decode, encode};
pub use error::ProtocolError;
pub use message::{
    AckData, ClientCommand, FinishedState, InitState, Request, ServerEvent, ServerFrame,
    StartBroadcast,
};
pub use model::{
    LeaderboardEntry, Metric, Mode, PastRound, PastRoundEntry, PlayerProgress, RoomPhase,
    RoomSnapshot, Round, RoundResultEntry, Rules,
};
pub use patch::{RoomDelta, RoundDelta, RoundSetup, RulesPatch, SettingsPatch};
pub use types::{RoomId, Username};
