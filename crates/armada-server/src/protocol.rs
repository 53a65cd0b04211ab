//! WebSocket protocol messages for Armada multiplayer.
//!
//! Payloads are strongly typed; anything that fails to deserialize is
//! rejected at the boundary and never reaches the match engine.

use armada_core::{AttackOutcome, Coord, MatchId, Ship, SideId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Register a new player, or log in if the name is known
    Reg { name: String, password: String },

    /// Open a room and wait for an opponent
    CreateRoom,

    /// Join an open room; a second player starts the match
    AddUserToRoom { room_id: Uuid },

    /// Submit this side's fleet layout
    AddShips { ships: Vec<Ship> },

    /// Fire at a cell on the opponent's board
    Attack { target: Coord },

    /// Let the server pick a random legal target and fire at it
    RandomAttack,

    /// Start a match against the built-in bot
    SinglePlay,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Registration/login succeeded
    Reg { name: String, player_id: Uuid },

    /// Current list of open rooms
    UpdateRoom { rooms: Vec<RoomInfo> },

    /// Leaderboard, sorted by wins
    UpdateWinners { winners: Vec<WinnerInfo> },

    /// A match was created; tells the player its per-match side id
    CreateGame { match_id: MatchId, side_id: SideId },

    /// Both fleets are placed; echoes the player's own layout
    StartGame { ships: Vec<Ship>, current_side: SideId },

    /// Whose move it is now
    Turn { current_side: SideId },

    /// An attack was resolved (sent to both players)
    Attack { outcome: AttackOutcome },

    /// The match is over
    Finish { winner_side: SideId },

    /// A request was rejected
    Error { message: String },
}

/// An open room waiting for a second player.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomInfo {
    pub room_id: Uuid,
    pub players: Vec<RoomPlayerInfo>,
}

/// A player inside a room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomPlayerInfo {
    pub player_id: Uuid,
    pub name: String,
}

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinnerInfo {
    pub name: String,
    pub wins: u32,
}
