//! Core protocol types for Greenvest's wire format.
//!
//! Field names are camelCase on the wire because the clients are browser
//! scripts. Numbers that come from players (investment amounts) are `f64`
//! and are never validated here.

use std::collections::BTreeMap;
use std::fmt;

use greenvest_transport::ConnectionId;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// The identity of a host or player: the transport connection it arrived on.
///
/// Serialized as a plain number so clients can compare it against the
/// impostor list in `gameStarted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl From<ConnectionId> for PlayerId {
    fn from(id: ConnectionId) -> Self {
        Self(id.into_inner())
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// The short code players type in to join a room.
///
/// Generated codes are four digits, but lookups accept any string: an
/// unknown code is simply "room not found".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RoomCode {
    fn from(code: &str) -> Self {
        Self(code.to_owned())
    }
}

impl From<String> for RoomCode {
    fn from(code: String) -> Self {
        Self(code)
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A player's allocation: sector name → amount.
///
/// Ordered so that snapshots serialize deterministically.
pub type Investments = BTreeMap<String, f64>;

/// The secret role dealt at game start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Investor,
    Impostor,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Investor => f.write_str("investor"),
            Self::Impostor => f.write_str("impostor"),
        }
    }
}

// ---------------------------------------------------------------------------
// Views — snapshots of room state as broadcast to clients
// ---------------------------------------------------------------------------

/// One entry of the player list in `updatePlayers`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub id: PlayerId,
    pub name: String,
    pub avatar: String,
    pub role: Role,
    pub investments: Investments,
    pub remaining: f64,
    pub connected: bool,
}

/// A sector as shown to clients.
///
/// `return` and `green` are the names the client scripts expect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorView {
    pub name: String,
    #[serde(rename = "return")]
    pub return_rate: f64,
    #[serde(rename = "green")]
    pub green_score: f64,
    pub locked: bool,
}

/// A player's final score in `gameEnded`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub name: String,
    pub role: Role,
    pub financial: f64,
    pub green: f64,
    pub total: f64,
}

// ---------------------------------------------------------------------------
// ClientEvent — client → coordinator
// ---------------------------------------------------------------------------

/// A named event sent by a client.
///
/// Internally tagged: `{ "type": "joinRoom", "roomCode": "4821", ... }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    /// Open a new room with the sender as host. Acked with the room code.
    CreateRoom { host_name: String },

    /// Join an existing room as a player. Acked with success or error.
    JoinRoom {
        room_code: RoomCode,
        player_name: String,
        #[serde(default)]
        avatar: String,
    },

    /// Host only: shuffle players, deal impostor roles.
    StartGame { room_code: RoomCode },

    /// Replace the sender's investment map.
    Invest {
        room_code: RoomCode,
        investments: Investments,
    },

    /// Host only: push a headline to everyone in the room.
    FlashNews { room_code: RoomCode, message: String },

    /// Host only: reveal sectors for investing.
    UnlockSectors { room_code: RoomCode },

    /// Host only: compute scores and announce the winner.
    EndGame { room_code: RoomCode },
}

impl ClientEvent {
    /// The event name as it appears on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateRoom { .. } => "createRoom",
            Self::JoinRoom { .. } => "joinRoom",
            Self::StartGame { .. } => "startGame",
            Self::Invest { .. } => "invest",
            Self::FlashNews { .. } => "flashNews",
            Self::UnlockSectors { .. } => "unlockSectors",
            Self::EndGame { .. } => "endGame",
        }
    }

    /// The room this event targets, if any.
    pub fn room_code(&self) -> Option<&RoomCode> {
        match self {
            Self::CreateRoom { .. } => None,
            Self::JoinRoom { room_code, .. }
            | Self::StartGame { room_code }
            | Self::Invest { room_code, .. }
            | Self::FlashNews { room_code, .. }
            | Self::UnlockSectors { room_code }
            | Self::EndGame { room_code } => Some(room_code),
        }
    }
}

// ---------------------------------------------------------------------------
// ServerEvent — coordinator → every member of a room
// ---------------------------------------------------------------------------

/// A broadcast to a room's members.
///
/// Adjacently tagged: `{ "event": "news", "data": { "message": "..." } }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    /// The full player list, in room order.
    UpdatePlayers { players: Vec<PlayerView> },

    /// The game started. Clients not listed in `impostors` are investors.
    GameStarted {
        sectors: Vec<SectorView>,
        impostors: Vec<PlayerId>,
    },

    /// A host headline, relayed verbatim.
    News { message: String },

    /// Sectors are open for investment.
    SectorsUnlocked { sectors: Vec<SectorView> },

    /// Final results. `winner` is absent only when the room had no players.
    GameEnded {
        scores: Vec<ScoreEntry>,
        winner: Option<ScoreEntry>,
        impostors: Vec<String>,
    },
}

impl ServerEvent {
    /// The event name as it appears on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Self::UpdatePlayers { .. } => "updatePlayers",
            Self::GameStarted { .. } => "gameStarted",
            Self::News { .. } => "news",
            Self::SectorsUnlocked { .. } => "sectorsUnlocked",
            Self::GameEnded { .. } => "gameEnded",
        }
    }
}

// ---------------------------------------------------------------------------
// Acknowledgements
// ---------------------------------------------------------------------------

/// The response to an event that carried an `ack` id.
///
/// Untagged to match what the client callbacks receive: a bare room code
/// for `createRoom`, `{ "success": true }` or `{ "error": "..." }` for
/// `joinRoom`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AckResponse {
    RoomCode(RoomCode),
    Success { success: bool },
    Error { error: String },
}

impl AckResponse {
    pub fn success() -> Self {
        Self::Success { success: true }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Envelopes
// ---------------------------------------------------------------------------

/// Every client frame. `ack` asks for an [`AckResponse`] with the same id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ack: Option<u64>,
    pub event: ClientEvent,
}

/// What a server frame carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerPayload {
    /// Reply to a client frame that asked for one.
    Ack { id: u64, response: AckResponse },

    /// A room broadcast.
    Event(ServerEvent),

    /// The client sent something we could not decode. `code` follows HTTP
    /// conventions.
    Error { code: u16, message: String },
}

/// Every server frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerEnvelope {
    /// Per-connection counter, starting at 1.
    pub seq: u64,

    /// Milliseconds since the connection was accepted.
    pub timestamp: u64,

    pub payload: ServerPayload,
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! The client scripts parse these shapes directly, so the tests pin
    //! the JSON layout rather than just round-tripping.

    use serde_json::json;

    use super::*;

    #[test]
    fn test_player_id_serializes_as_plain_number() {
        assert_eq!(serde_json::to_string(&PlayerId(42)).unwrap(), "42");
    }

    #[test]
    fn test_player_id_from_connection_id() {
        assert_eq!(PlayerId::from(ConnectionId::new(9)), PlayerId(9));
        assert_eq!(PlayerId(9).to_string(), "P-9");
    }

    #[test]
    fn test_room_code_serializes_as_string() {
        let code = RoomCode::from("0420");
        assert_eq!(serde_json::to_string(&code).unwrap(), "\"0420\"");
        assert_eq!(code.to_string(), "0420");
    }

    #[test]
    fn test_role_is_lowercase() {
        assert_eq!(serde_json::to_value(Role::Impostor).unwrap(), json!("impostor"));
        assert_eq!(Role::default(), Role::Investor);
    }

    #[test]
    fn test_create_room_decodes_from_camel_case() {
        let env: ClientEnvelope = serde_json::from_value(json!({
            "ack": 1,
            "event": { "type": "createRoom", "hostName": "Mira" }
        }))
        .unwrap();
        assert_eq!(env.ack, Some(1));
        assert_eq!(
            env.event,
            ClientEvent::CreateRoom {
                host_name: "Mira".into()
            }
        );
    }

    #[test]
    fn test_join_room_avatar_is_optional() {
        let event: ClientEvent = serde_json::from_value(json!({
            "type": "joinRoom", "roomCode": "1234", "playerName": "Team Rail"
        }))
        .unwrap();
        assert_eq!(
            event,
            ClientEvent::JoinRoom {
                room_code: RoomCode::from("1234"),
                player_name: "Team Rail".into(),
                avatar: String::new(),
            }
        );
    }

    #[test]
    fn test_invest_accepts_fractional_and_negative_amounts() {
        let event: ClientEvent = serde_json::from_value(json!({
            "type": "invest",
            "roomCode": "1234",
            "investments": { "Solar Parks (Rewa)": 12.5, "Nowhere": -3 }
        }))
        .unwrap();
        let ClientEvent::Invest { investments, .. } = event else {
            panic!("expected invest");
        };
        assert_eq!(investments["Solar Parks (Rewa)"], 12.5);
        assert_eq!(investments["Nowhere"], -3.0);
    }

    #[test]
    fn test_envelope_without_ack() {
        let env: ClientEnvelope = serde_json::from_value(json!({
            "event": { "type": "endGame", "roomCode": "1234" }
        }))
        .unwrap();
        assert_eq!(env.ack, None);
        assert_eq!(env.event.name(), "endGame");
        assert_eq!(env.event.room_code(), Some(&RoomCode::from("1234")));
    }

    #[test]
    fn test_unknown_client_event_is_rejected() {
        let result: Result<ClientEvent, _> =
            serde_json::from_value(json!({ "type": "stealFunds", "roomCode": "1" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_sector_view_uses_client_field_names() {
        let sector = SectorView {
            name: "Expressways (DMEDL)".into(),
            return_rate: 10.0,
            green_score: 4.0,
            locked: true,
        };
        assert_eq!(
            serde_json::to_value(&sector).unwrap(),
            json!({ "name": "Expressways (DMEDL)", "return": 10.0, "green": 4.0, "locked": true })
        );
    }

    #[test]
    fn test_game_started_json_format() {
        let event = ServerEvent::GameStarted {
            sectors: vec![],
            impostors: vec![PlayerId(3), PlayerId(5)],
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({ "event": "gameStarted", "data": { "sectors": [], "impostors": [3, 5] } })
        );
    }

    #[test]
    fn test_game_ended_without_winner_serializes_null() {
        let event = ServerEvent::GameEnded {
            scores: vec![],
            winner: None,
            impostors: vec![],
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "gameEnded");
        assert!(value["data"]["winner"].is_null());
    }

    #[test]
    fn test_player_view_json_format() {
        let view = PlayerView {
            id: PlayerId(2),
            name: "Team Solar".into(),
            avatar: "sun".into(),
            role: Role::Investor,
            investments: Investments::new(),
            remaining: 100.0,
            connected: true,
        };
        let value = serde_json::to_value(&view).unwrap();
        assert_eq!(value["id"], 2);
        assert_eq!(value["role"], "investor");
        assert_eq!(value["remaining"], 100.0);
        assert_eq!(value["connected"], true);
    }

    #[test]
    fn test_ack_responses_match_callback_shapes() {
        assert_eq!(
            serde_json::to_value(AckResponse::RoomCode(RoomCode::from("4821"))).unwrap(),
            json!("4821")
        );
        assert_eq!(
            serde_json::to_value(AckResponse::success()).unwrap(),
            json!({ "success": true })
        );
        assert_eq!(
            serde_json::to_value(AckResponse::error("Room doesn't exist")).unwrap(),
            json!({ "error": "Room doesn't exist" })
        );
    }

    #[test]
    fn test_ack_response_decodes_each_shape() {
        let code: AckResponse = serde_json::from_value(json!("1234")).unwrap();
        assert_eq!(code, AckResponse::RoomCode(RoomCode::from("1234")));
        let err: AckResponse = serde_json::from_value(json!({ "error": "full" })).unwrap();
        assert_eq!(err, AckResponse::error("full"));
    }

    #[test]
    fn test_server_envelope_ack_json_format() {
        let env = ServerEnvelope {
            seq: 4,
            timestamp: 250,
            payload: ServerPayload::Ack {
                id: 7,
                response: AckResponse::success(),
            },
        };
        assert_eq!(
            serde_json::to_value(&env).unwrap(),
            json!({
                "seq": 4,
                "timestamp": 250,
                "payload": { "type": "Ack", "data": { "id": 7, "response": { "success": true } } }
            })
        );
    }

    #[test]
    fn test_server_envelope_event_nests_event_tag() {
        let env = ServerEnvelope {
            seq: 1,
            timestamp: 0,
            payload: ServerPayload::Event(ServerEvent::News {
                message: "Monsoon delays rail works".into(),
            }),
        };
        let value = serde_json::to_value(&env).unwrap();
        assert_eq!(value["payload"]["type"], "Event");
        assert_eq!(value["payload"]["data"]["event"], "news");
        assert_eq!(
            value["payload"]["data"]["data"]["message"],
            "Monsoon delays rail works"
        );
    }
}
