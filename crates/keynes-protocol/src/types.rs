//! Identity types and the messages that travel on the wire.
//!
//! Every frame is an [`Envelope`] carrying either a [`ClientMessage`]
//! (client → server) or a [`ServerMessage`] (server → client). Both are
//! internally tagged JSON objects (`{"type": "JoinRoom", ...}`) so a
//! browser client can switch on `type` directly.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{GameState, ProtocolError};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A connection-scoped identifier for a player or spectator.
///
/// The server derives it from the transport's connection id, so it is
/// only meaningful for the lifetime of one connection. There is no
/// account behind it: a reconnecting client is a new `PlayerId`.
///
/// `#[serde(transparent)]` serializes `PlayerId(42)` as plain `42`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// Length of a room code.
pub const ROOM_ID_LEN: usize = 6;

/// Characters a room code is drawn from.
pub const ROOM_ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// A short, human-typeable room code such as `"K7Q2ZA"`.
///
/// Players share this code out of band to join each other, so it is a
/// string rather than a number. Lookups are exact: `"k7q2za"` is a
/// different (and invalid) code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Validates and wraps a room code.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidRoomId`] unless `code` is exactly
    /// [`ROOM_ID_LEN`] characters from [`ROOM_ID_ALPHABET`].
    pub fn parse(code: &str) -> Result<Self, ProtocolError> {
        if Self::is_valid(code) {
            Ok(Self(code.to_string()))
        } else {
            Err(ProtocolError::InvalidRoomId(code.to_string()))
        }
    }

    /// Returns `true` if `code` has the room-code shape.
    pub fn is_valid(code: &str) -> bool {
        code.len() == ROOM_ID_LEN
            && code.bytes().all(|b| ROOM_ID_ALPHABET.contains(&b))
    }

    /// The code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for RoomId {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// ---------------------------------------------------------------------------
// Directory
// ---------------------------------------------------------------------------

/// One row of the room directory: a lobby that can still be joined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomListEntry {
    pub room_id: RoomId,
    /// Number of seated players (spectators are not counted).
    pub player_count: usize,
    pub max_players: usize,
    /// Name of the current host, `"Unknown"` if the room has none.
    pub host_name: String,
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Actions a client can send.
///
/// Actions that address a room carry its `room_id`; the server never
/// infers the room from earlier messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Open a new room and become its host.
    CreateRoom { name: String },

    /// Enter an existing room as a player, or as a spectator when the
    /// room is full or already playing.
    JoinRoom { room_id: RoomId, name: String },

    /// Host only: leave the lobby and begin the introduction.
    StartGame { room_id: RoomId },

    /// Submit (or change) this round's number. Values above 100 are
    /// ignored by the session.
    PlayerChoice { room_id: RoomId, choice: u8 },

    /// Host only: return everyone to a fresh lobby.
    RestartGame { room_id: RoomId },

    /// Ask for the room directory.
    ListRooms,

    /// Keep-alive. `client_time` is echoed back for RTT measurement.
    Heartbeat { client_time: u64 },

    /// "I'm leaving." The server closes the connection, which removes
    /// the client from its room.
    Disconnect { reason: String },
}

/// Events the server sends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// First frame on every connection: who you are.
    Welcome {
        player_id: PlayerId,
        protocol_version: u32,
    },

    /// Sent once to the creator of a room.
    RoomCreated { room_id: RoomId },

    /// A new snapshot of a room the client belongs to.
    GameStateUpdate { state: GameState },

    /// The action referenced something that doesn't exist (an unknown
    /// room, usually). Only the caller receives this.
    Error { message: String },

    /// Reply to [`ClientMessage::ListRooms`].
    RoomList { rooms: Vec<RoomListEntry> },

    /// Reply to [`ClientMessage::Heartbeat`].
    HeartbeatAck { client_time: u64, server_time: u64 },
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// The top-level wire frame.
///
/// ```text
/// { "seq": 4, "timestamp": 15000, "payload": { "type": "...", ... } }
/// ```
///
/// `seq` and `timestamp` are filled in by the server for outbound
/// frames. Clients may omit both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Per-connection sequence number, starting at 0 with `Welcome`.
    #[serde(default)]
    pub seq: u64,

    /// Milliseconds since the connection was accepted.
    #[serde(default)]
    pub timestamp: u64,

    pub payload: T,
}

impl<T> Envelope<T> {
    /// Wraps a payload with zeroed metadata.
    pub fn new(payload: T) -> Self {
        Self {
            seq: 0,
            timestamp: 0,
            payload,
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! The client is written against these exact JSON shapes, so these
    //! tests pin the serde attributes down.

    use super::*;

    fn room(code: &str) -> RoomId {
        RoomId::parse(code).unwrap()
    }

    // =====================================================================
    // Identity types
    // =====================================================================

    #[test]
    fn test_player_id_serializes_as_plain_number() {
        let json = serde_json::to_string(&PlayerId(42)).unwrap();
        assert_eq!(json, "42");
    }

    #[test]
    fn test_player_id_display() {
        assert_eq!(PlayerId(7).to_string(), "P-7");
    }

    #[test]
    fn test_room_id_parse_accepts_uppercase_and_digits() {
        let id = room("AB12Z9");
        assert_eq!(id.as_str(), "AB12Z9");
        assert_eq!(id.to_string(), "AB12Z9");
    }

    #[test]
    fn test_room_id_parse_rejects_bad_shapes() {
        for bad in ["", "ABCDE", "ABCDEFG", "abcdef", "AB-123", "ÄBCDEF"] {
            assert!(
                matches!(RoomId::parse(bad), Err(ProtocolError::InvalidRoomId(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_room_id_from_str() {
        let id: RoomId = "QQQ111".parse().unwrap();
        assert_eq!(id, room("QQQ111"));
    }

    #[test]
    fn test_room_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&room("ABC123")).unwrap();
        assert_eq!(json, "\"ABC123\"");
    }

    // =====================================================================
    // ClientMessage
    // =====================================================================

    #[test]
    fn test_client_join_room_json_format() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"type": "JoinRoom", "room_id": "ABC123", "name": "Alice"}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            ClientMessage::JoinRoom {
                room_id: room("ABC123"),
                name: "Alice".into(),
            }
        );
    }

    #[test]
    fn test_client_player_choice_json_format() {
        let msg = ClientMessage::PlayerChoice {
            room_id: room("ABC123"),
            choice: 37,
        };
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["type"], "PlayerChoice");
        assert_eq!(json["room_id"], "ABC123");
        assert_eq!(json["choice"], 37);
    }

    #[test]
    fn test_client_player_choice_rejects_negative() {
        let result: Result<ClientMessage, _> = serde_json::from_str(
            r#"{"type": "PlayerChoice", "room_id": "ABC123", "choice": -1}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_client_list_rooms_is_tag_only() {
        let json = serde_json::to_string(&ClientMessage::ListRooms).unwrap();
        assert_eq!(json, r#"{"type":"ListRooms"}"#);
    }

    #[test]
    fn test_client_unknown_type_returns_error() {
        let result: Result<ClientMessage, _> =
            serde_json::from_str(r#"{"type": "FlipTable"}"#);
        assert!(result.is_err());
    }

    // =====================================================================
    // ServerMessage
    // =====================================================================

    #[test]
    fn test_server_welcome_json_format() {
        let msg = ServerMessage::Welcome {
            player_id: PlayerId(9),
            protocol_version: 1,
        };
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["type"], "Welcome");
        assert_eq!(json["player_id"], 9);
        assert_eq!(json["protocol_version"], 1);
    }

    #[test]
    fn test_server_room_list_json_format() {
        let msg = ServerMessage::RoomList {
            rooms: vec![RoomListEntry {
                room_id: room("ZZZ999"),
                player_count: 2,
                max_players: 5,
                host_name: "Alice".into(),
            }],
        };
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["type"], "RoomList");
        assert_eq!(json["rooms"][0]["room_id"], "ZZZ999");
        assert_eq!(json["rooms"][0]["host_name"], "Alice");
        assert_eq!(json["rooms"][0]["max_players"], 5);
    }

    #[test]
    fn test_server_game_state_update_embeds_state() {
        let msg = ServerMessage::GameStateUpdate {
            state: GameState::new(room("ABC123"), 300),
        };
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["type"], "GameStateUpdate");
        assert_eq!(json["state"]["room_id"], "ABC123");
        assert_eq!(json["state"]["phase"], "LOBBY");
    }

    // =====================================================================
    // Envelope
    // =====================================================================

    #[test]
    fn test_envelope_metadata_defaults_when_missing() {
        let json = r#"{ "payload": { "type": "ListRooms" } }"#;
        let env: Envelope<ClientMessage> = serde_json::from_str(json).unwrap();
        assert_eq!(env.seq, 0);
        assert_eq!(env.timestamp, 0);
        assert_eq!(env.payload, ClientMessage::ListRooms);
    }

    #[test]
    fn test_envelope_without_payload_returns_error() {
        let result: Result<Envelope<ClientMessage>, _> =
            serde_json::from_str(r#"{"seq": 1}"#);
        assert!(result.is_err());
    }
}
