//! Core protocol types for pairhub's wire format.
//!
//! Everything in this module travels on the wire as JSON text frames.
//! Field names are camelCase; enum variants keep their Rust names so the
//! client can switch on them directly.

use std::fmt;

use serde::{Deserialize, Serialize};

use pairhub_games::{
    Color, ConnectFourSnapshot, GameEvent, GameSnapshot, PairMatchingSnapshot,
    RpsSnapshot,
};
pub use pairhub_transport::ConnectionId;

use crate::ProtocolError;

/// Protocol version a client must announce in its handshake.
pub const PROTOCOL_VERSION: u32 = 1;

/// HTTP-style codes carried by [`HubEvent::Error`].
pub mod error_code {
    pub const BAD_REQUEST: u16 = 400;
    pub const UNAUTHORIZED: u16 = 401;
    pub const NOT_FOUND: u16 = 404;
    pub const CONFLICT: u16 = 409;
}

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A player's stable identity inside a room.
///
/// Chosen by the client and opaque to the server. It survives reconnects:
/// a new connection presenting the same `PlayerId` takes over the old
/// seat.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

/// Reference to an account held by an external user store.
///
/// The server never looks inside; it only remembers which account a
/// connection authenticated as.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountRef(pub String);

impl fmt::Display for AccountRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies one room: a game type plus a room code.
///
/// The code is trimmed and uppercased, so `ab12` and ` AB12 ` name the
/// same room. The game type is kept as given; it is only checked when a
/// game starts. On the wire a key is the string `"{gameType}:{CODE}"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct RoomKey {
    game_type: String,
    code: String,
}

impl RoomKey {
    pub fn new(game_type: impl Into<String>, room_code: &str) -> Self {
        Self {
            game_type: game_type.into(),
            code: room_code.trim().to_uppercase(),
        }
    }

    pub fn game_type(&self) -> &str {
        &self.game_type
    }

    pub fn code(&self) -> &str {
        &self.code
    }
}

impl fmt::Display for RoomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.game_type, self.code)
    }
}

impl From<RoomKey> for String {
    fn from(key: RoomKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for RoomKey {
    type Error = ProtocolError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.split_once(':') {
            Some((game_type, code)) if !game_type.is_empty() => {
                Ok(Self::new(game_type, code))
            }
            _ => Err(ProtocolError::InvalidMessage(format!(
                "room key must look like 'gameType:CODE', got {s:?}"
            ))),
        }
    }
}

/// What a user is allowed to do in a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Holds one of the two seats and plays a color.
    Player,
    /// Watches; may only request snapshots.
    Spectator,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Player => write!(f, "player"),
            Self::Spectator => write!(f, "spectator"),
        }
    }
}

// ---------------------------------------------------------------------------
// HubRequest — client → server
// ---------------------------------------------------------------------------

/// Everything a client can ask the server to do.
///
/// Internally tagged by `"method"`:
/// `{"method": "JoinRoom", "gameType": "pair-matching", "roomCode": "xyz9", "playerId": "p1"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all_fields = "camelCase")]
pub enum HubRequest {
    /// Must be the first message on a connection.
    Handshake {
        version: u32,
        #[serde(default)]
        token: Option<String>,
    },

    /// Keep-alive. Echoed back in [`HubEvent::HeartbeatAck`].
    Heartbeat { client_time: u64 },

    CreateRoom { game_type: String, room_code: String },

    RoomExists { game_type: String, room_code: String },

    JoinRoom {
        game_type: String,
        room_code: String,
        player_id: PlayerId,
    },

    /// Rebinds a known identity to this connection. Never creates a seat.
    ReconnectToRoom {
        game_type: String,
        room_code: String,
        player_id: PlayerId,
    },

    /// A game command such as `MOVE:3`, `flip 2 1` or `CHOOSE:rock`.
    HandleCommand {
        game_type: String,
        room_code: String,
        player_id: PlayerId,
        command: String,
    },
}

impl HubRequest {
    /// Short name for logging.
    pub fn method(&self) -> &'static str {
        match self {
            Self::Handshake { .. } => "Handshake",
            Self::Heartbeat { .. } => "Heartbeat",
            Self::CreateRoom { .. } => "CreateRoom",
            Self::RoomExists { .. } => "RoomExists",
            Self::JoinRoom { .. } => "JoinRoom",
            Self::ReconnectToRoom { .. } => "ReconnectToRoom",
            Self::HandleCommand { .. } => "HandleCommand",
        }
    }
}

// ---------------------------------------------------------------------------
// HubEvent — server → client
// ---------------------------------------------------------------------------

/// Everything the server can tell a client.
///
/// Internally tagged by `"event"`. Game updates flatten their snapshot
/// into the event object:
/// `{"event": "ReceiveMove", "board": [...], "currentTurn": "yellow", "winner": null}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all_fields = "camelCase")]
pub enum HubEvent {
    // -- Connection lifecycle --
    HandshakeAck { connection_id: ConnectionId },

    HeartbeatAck { client_time: u64, server_time: u64 },

    /// The server is draining; the connection will close next.
    ServerShutdown,

    // -- Room lifecycle --
    RoomCreated { room_key: RoomKey, created: bool },

    RoomExistence { room_key: RoomKey, exists: bool },

    /// Sent to the joiner. `color` is `None` for spectators.
    JoinedRoom {
        room_key: RoomKey,
        role: Role,
        color: Option<Color>,
    },

    /// Sent to every connection in the room when the second player
    /// arrives. Happens once per room.
    StartGame { room_key: RoomKey },

    /// Sent to the reconnecting caller, with the state needed to redraw.
    Reconnected {
        room_key: RoomKey,
        role: Role,
        color: Option<Color>,
        game: Option<GameSnapshot>,
    },

    UnauthorizedReconnect { room_key: RoomKey },

    /// A room member lost its connection. Its seat is held for the
    /// grace period.
    PlayerDisconnected { room_key: RoomKey, player_id: PlayerId },

    // -- Game updates --
    ReceiveMove(ConnectFourSnapshot),
    GameReset(ConnectFourSnapshot),
    ReceiveBoard(PairMatchingSnapshot),
    ResetGame(PairMatchingSnapshot),
    ReceiveRpsState(RpsSnapshot),
    RpsReset(RpsSnapshot),

    // -- Errors --
    /// `code` follows HTTP conventions, see [`error_code`].
    Error { code: u16, message: String },
}

impl HubEvent {
    pub fn error(code: u16, message: impl Into<String>) -> Self {
        Self::Error {
            code,
            message: message.into(),
        }
    }
}

impl From<GameEvent> for HubEvent {
    fn from(event: GameEvent) -> Self {
        match event {
            GameEvent::ReceiveMove(s) => Self::ReceiveMove(s),
            GameEvent::GameReset(s) => Self::GameReset(s),
            GameEvent::ReceiveBoard(s) => Self::ReceiveBoard(s),
            GameEvent::ResetGame(s) => Self::ResetGame(s),
            GameEvent::ReceiveRpsState(s) => Self::ReceiveRpsState(s),
            GameEvent::RpsReset(s) => Self::RpsReset(s),
        }
    }
}

// ---------------------------------------------------------------------------
// Payload / Envelope
// ---------------------------------------------------------------------------

/// Either direction's content, adjacently tagged:
/// `{"type": "Request", "data": {"method": ...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Payload {
    Request(HubRequest),
    Event(HubEvent),
}

/// The top-level message wrapper. Every frame on the wire is one Envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Per-sender counter, starting at 1.
    pub seq: u64,

    /// Milliseconds since the sender started.
    pub timestamp: u64,

    pub payload: Payload,
}

impl Envelope {
    pub fn request(seq: u64, timestamp: u64, request: HubRequest) -> Self {
        Self {
            seq,
            timestamp,
            payload: Payload::Request(request),
        }
    }

    pub fn event(seq: u64, timestamp: u64, event: HubEvent) -> Self {
        Self {
            seq,
            timestamp,
            payload: Payload::Event(event),
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use pairhub_games::{GameInstance, GameType, Reply};

    use super::*;

    // =====================================================================
    // Identity types
    // =====================================================================

    #[test]
    fn test_player_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&PlayerId::new("p1")).unwrap();
        assert_eq!(json, "\"p1\"");
    }

    #[test]
    fn test_room_key_uppercases_and_trims_code() {
        let key = RoomKey::new("four-in-a-row", "  ab12 ");
        assert_eq!(key.code(), "AB12");
        assert_eq!(key.game_type(), "four-in-a-row");
        assert_eq!(key.to_string(), "four-in-a-row:AB12");
        assert_eq!(key, RoomKey::new("four-in-a-row", "AB12"));
    }

    #[test]
    fn test_room_key_game_type_is_verbatim() {
        assert_ne!(
            RoomKey::new("Four-In-A-Row", "x"),
            RoomKey::new("four-in-a-row", "x")
        );
    }

    #[test]
    fn test_room_key_serializes_as_string() {
        let key = RoomKey::new("pair-matching", "xyz9");
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"pair-matching:XYZ9\"");
        let back: RoomKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }

    #[test]
    fn test_room_key_rejects_missing_separator() {
        let result: Result<RoomKey, _> = serde_json::from_str("\"nocolon\"");
        assert!(result.is_err());
        let result: Result<RoomKey, _> = serde_json::from_str("\":CODE\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Spectator).unwrap(), "\"spectator\"");
    }

    // =====================================================================
    // HubRequest
    // =====================================================================

    #[test]
    fn test_request_join_room_json_format() {
        let req = HubRequest::JoinRoom {
            game_type: "pair-matching".into(),
            room_code: "XYZ9".into(),
            player_id: "p1".into(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["method"], "JoinRoom");
        assert_eq!(json["gameType"], "pair-matching");
        assert_eq!(json["roomCode"], "XYZ9");
        assert_eq!(json["playerId"], "p1");
    }

    #[test]
    fn test_request_handshake_token_is_optional() {
        let req: HubRequest =
            serde_json::from_str(r#"{"method":"Handshake","version":1}"#).unwrap();
        assert_eq!(
            req,
            HubRequest::Handshake {
                version: 1,
                token: None
            }
        );
    }

    #[test]
    fn test_request_handle_command_from_client_json() {
        let raw = r#"{
            "method": "HandleCommand",
            "gameType": "four-in-a-row",
            "roomCode": "ab12",
            "playerId": "p2",
            "command": "MOVE:3"
        }"#;
        let req: HubRequest = serde_json::from_str(raw).unwrap();
        assert_eq!(req.method(), "HandleCommand");
        let HubRequest::HandleCommand { command, .. } = req else {
            unreachable!()
        };
        assert_eq!(command, "MOVE:3");
    }

    #[test]
    fn test_request_unknown_method_fails() {
        let result: Result<HubRequest, _> =
            serde_json::from_str(r#"{"method":"FlyToMoon"}"#);
        assert!(result.is_err());
    }

    // =====================================================================
    // HubEvent
    // =====================================================================

    #[test]
    fn test_event_joined_room_json_format() {
        let event = HubEvent::JoinedRoom {
            room_key: RoomKey::new("four-in-a-row", "ab12"),
            role: Role::Player,
            color: Some(Color::Yellow),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "JoinedRoom");
        assert_eq!(json["roomKey"], "four-in-a-row:AB12");
        assert_eq!(json["role"], "player");
        assert_eq!(json["color"], "yellow");
    }

    #[test]
    fn test_event_game_update_flattens_snapshot() {
        let mut game = GameInstance::new(GameType::ConnectFour);
        let Reply::Broadcast(update) = game.apply(Color::Red, "MOVE:0") else {
            panic!("move should broadcast");
        };
        let event = HubEvent::from(update);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "ReceiveMove");
        assert_eq!(json["currentTurn"], "yellow");
        assert_eq!(json["board"][5][0], "red");

        let back: HubEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_event_reconnected_carries_tagged_snapshot() {
        let game = GameInstance::new(GameType::RockPaperScissors);
        let event = HubEvent::Reconnected {
            room_key: RoomKey::new("rock-paper-scissors", "r1"),
            role: Role::Player,
            color: Some(Color::Red),
            game: Some(game.snapshot()),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["game"]["gameType"], "rock-paper-scissors");
        assert_eq!(json["game"]["state"]["round"], 0);
    }

    #[test]
    fn test_event_error_helper() {
        let json = serde_json::to_value(HubEvent::error(error_code::NOT_FOUND, "no room"))
            .unwrap();
        assert_eq!(json["event"], "Error");
        assert_eq!(json["code"], 404);
        assert_eq!(json["message"], "no room");
    }

    #[test]
    fn test_event_unit_variant_json_format() {
        let json = serde_json::to_value(HubEvent::ServerShutdown).unwrap();
        assert_eq!(json, serde_json::json!({"event": "ServerShutdown"}));
    }

    // =====================================================================
    // Envelope
    // =====================================================================

    #[test]
    fn test_envelope_request_json_format() {
        let env = Envelope::request(1, 100, HubRequest::Heartbeat { client_time: 5 });
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["seq"], 1);
        assert_eq!(json["timestamp"], 100);
        assert_eq!(json["payload"]["type"], "Request");
        assert_eq!(json["payload"]["data"]["method"], "Heartbeat");
        assert_eq!(json["payload"]["data"]["clientTime"], 5);
    }

    #[test]
    fn test_envelope_event_decodes_from_raw_json() {
        let raw = r#"{
            "seq": 3,
            "timestamp": 42,
            "payload": {"type": "Event", "data": {"event": "HandshakeAck", "connectionId": 7}}
        }"#;
        let env: Envelope = serde_json::from_str(raw).unwrap();
        assert_eq!(
            env.payload,
            Payload::Event(HubEvent::HandshakeAck {
                connection_id: ConnectionId::new(7)
            })
        );
    }

    #[test]
    fn test_decode_wrong_shape_returns_error() {
        let result: Result<Envelope, _> = serde_json::from_str(r#"{"name":"hello"}"#);
        assert!(result.is_err());
    }
}
