//! Client/server wire frames.
//!
//! The transport gives us per-connection request/response plus room-scoped
//! broadcast. A client sends [`Request`]s (a sequence number and a command);
//! the server answers every request with an [`ServerFrame::Ack`] carrying
//! the same sequence number, and pushes [`ServerFrame::Event`]s at any time
//! for broadcasts and the initial snapshot.

use serde::{Deserialize, Serialize};

use crate::{
    LeaderboardEntry, Mode, PastRound, PlayerProgress, RoomDelta, RoomId, RoomPhase, Round, Rules,
    SettingsPatch, Username,
};

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// A gameplay command. The join itself is not a command — it happens in the
/// connection handshake (query-string parameters).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    /// Host-only settings mutation while in the lobby.
    Update { patch: SettingsPatch },
    /// Host-only: start the round.
    Start,
    /// The player clicked a link to `article`.
    Click { article: String },
    /// The player navigated (browser back / anchor) to `article`.
    Navigate { article: String },
    /// Host-only: switch the room to another wiki language.
    ChangeLang { language: String },
}

/// A client request: a sequence number for ack correlation plus a command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub seq: u64,
    pub command: ClientCommand,
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// The full state sent to a connection right after it joins. Contains only
/// the joiner's own progress — never other players' paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitState {
    pub room_id: RoomId,
    pub mode: Mode,
    pub language: String,
    pub host: Username,
    pub state: RoomPhase,
    pub players: Vec<Username>,
    pub current_round: Round,
    pub rules: Rules,
    pub leaderboard: Vec<LeaderboardEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_round: Option<PastRound>,
    /// Present when joining a room that is mid-round.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_state: Option<PlayerProgress>,
}

/// The payload of the `start` broadcast. The seed progress is identical for
/// every player, so one copy serves the whole room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartBroadcast {
    pub state: RoomPhase,
    pub current_round: Round,
    pub current_state: PlayerProgress,
}

/// The payload of the `finished` broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishedState {
    pub state: RoomPhase,
    pub current_round: Round,
    pub leaderboard: Vec<LeaderboardEntry>,
    pub last_round: PastRound,
}

/// A server-initiated event, delivered outside the request/ack cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Full state snapshot, sent to the joining connection only.
    Init(InitState),
    /// The join was rejected; the connection will be closed.
    InitError { message: String },
    /// A validated partial update (settings, roster, ticker, results).
    Update { patch: RoomDelta },
    /// A round started.
    Start(StartBroadcast),
    /// A round completed.
    Finished(FinishedState),
    /// A human-readable room notification ("az joined", "az finished", …).
    Notification { message: String },
}

/// Typed ack payloads, keyed by the command that produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AckData {
    /// Echo of a validated settings patch (`update` / `change_lang`).
    Patch { patch: RoomDelta },
    /// The start payload (`start`).
    Start(StartBroadcast),
    /// The player's own full progress (`click` / `navigate`).
    Progress(PlayerProgress),
}

/// The top-level server frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Response to a [`Request`], matched by `seq`.
    Ack {
        seq: u64,
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<AckData>,
    },
    /// A pushed [`ServerEvent`].
    Event { event: ServerEvent },
}

impl ServerFrame {
    /// A successful ack with an optional payload.
    pub fn ok(seq: u64, data: Option<AckData>) -> Self {
        Self::Ack {
            seq,
            success: true,
            message: None,
            data,
        }
    }

    /// A failed ack carrying a user-facing message.
    pub fn err(seq: u64, message: impl Into<String>) -> Self {
        Self::Ack {
            seq,
            success: false,
            message: Some(message.into()),
            data: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_command_uses_snake_case_tags() {
        let cmd = ClientCommand::ChangeLang {
            language: "de".into(),
        };
        let json: serde_json::Value = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["type"], "change_lang");
        assert_eq!(json["language"], "de");
    }

    #[test]
    fn test_request_round_trip() {
        let req = Request {
            seq: 7,
            command: ClientCommand::Click {
                article: "Dog".into(),
            },
        };
        let bytes = serde_json::to_vec(&req).unwrap();
        let decoded: Request = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(req, decoded);
    }

    #[test]
    fn test_update_command_with_patch() {
        let json = r#"{
            "seq": 1,
            "command": {"type": "update", "patch": {"rules": {"timeLimit": 90}}}
        }"#;
        let req: Request = serde_json::from_str(json).unwrap();
        match req.command {
            ClientCommand::Update { patch } => {
                assert_eq!(patch.rules.unwrap().time_limit, Some(90));
            }
            other => panic!("expected update, got {other:?}"),
        }
    }

    #[test]
    fn test_ack_skips_absent_message_and_data() {
        let frame = ServerFrame::ok(3, None);
        let json = serde_json::to_string(&frame).unwrap();
        assert_eq!(json, r#"{"type":"ack","seq":3,"success":true}"#);
    }

    #[test]
    fn test_err_ack_carries_message() {
        let frame = ServerFrame::err(4, "Target article must not be banned!");
        let json: serde_json::Value = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Target article must not be banned!");
    }

    #[test]
    fn test_server_event_init_inlines_state_fields() {
        let event = ServerEvent::Init(InitState {
            room_id: RoomId::from("123"),
            mode: Mode::Multi,
            language: "en".into(),
            host: Username::from("azaky"),
            state: RoomPhase::Lobby,
            players: vec![Username::from("azaky")],
            current_round: Round::default(),
            rules: Rules::default(),
            leaderboard: vec![],
            last_round: None,
            current_state: None,
        });
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        // Internally tagged: the snapshot fields sit next to the tag.
        assert_eq!(json["type"], "init");
        assert_eq!(json["roomId"], "123");
        assert_eq!(json["state"], "lobby");
    }

    #[test]
    fn test_notification_event_round_trip() {
        let event = ServerEvent::Notification {
            message: "az has joined the room!".into(),
        };
        let bytes = serde_json::to_vec(&event).unwrap();
        let decoded: ServerEvent = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(event, decoded);
    }

    #[test]
    fn test_decode_unknown_command_type_returns_error() {
        let unknown = r#"{"seq": 1, "command": {"type": "teleport", "to": "Moon"}}"#;
        let result: Result<Request, _> = serde_json::from_str(unknown);
        assert!(result.is_err());
    }
}
