//! Lobby bookkeeping: open rooms waiting for a second player.
//!
//! A room holds at most two players; the moment it fills it is consumed
//! and the pair is handed back so the caller can create the match.

use crate::protocol::{RoomInfo, RoomPlayerInfo};
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LobbyError {
    #[error("Room not found")]
    RoomNotFound,

    #[error("Cannot join your own room")]
    OwnRoom,
}

/// A player waiting in a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occupant {
    pub player_id: Uuid,
    pub name: String,
}

/// A room with one player waiting for an opponent.
#[derive(Debug, Clone)]
pub struct OpenRoom {
    pub id: Uuid,
    pub host: Occupant,
}

impl OpenRoom {
    pub fn to_info(&self) -> RoomInfo {
        RoomInfo {
            room_id: self.id,
            players: vec![RoomPlayerInfo {
                player_id: self.host.player_id,
                name: self.host.name.clone(),
            }],
        }
    }
}

/// All open rooms.
#[derive(Debug, Default)]
pub struct Lobby {
    rooms: HashMap<Uuid, OpenRoom>,
}

impl Lobby {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new room hosted by `player`. Any previous room of the same
    /// host is discarded so a player never waits in two rooms at once.
    pub fn create_room(&mut self, player_id: Uuid, name: String) -> Uuid {
        self.rooms.retain(|_, r| r.host.player_id != player_id);

        let room_id = Uuid::new_v4();
        self.rooms.insert(
            room_id,
            OpenRoom {
                id: room_id,
                host: Occupant { player_id, name },
            },
        );
        room_id
    }

    /// Join an open room. The room is consumed and both occupants are
    /// returned, host first.
    pub fn join_room(
        &mut self,
        room_id: Uuid,
        player_id: Uuid,
        name: String,
    ) -> Result<[Occupant; 2], LobbyError> {
        let host = self
            .rooms
            .get(&room_id)
            .map(|r| r.host.clone())
            .ok_or(LobbyError::RoomNotFound)?;
        if host.player_id == player_id {
            return Err(LobbyError::OwnRoom);
        }

        self.rooms.remove(&room_id);
        // The joiner's own waiting room, if any, is now stale
        self.rooms.retain(|_, r| r.host.player_id != player_id);

        Ok([host, Occupant { player_id, name }])
    }

    /// Drop every room hosted by `player` (disconnect, or match start).
    pub fn leave(&mut self, player_id: Uuid) {
        self.rooms.retain(|_, r| r.host.player_id != player_id);
    }

    /// Rooms still waiting for an opponent.
    pub fn open_rooms(&self) -> Vec<RoomInfo> {
        self.rooms.values().map(|r| r.to_info()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_list_rooms() {
        let mut lobby = Lobby::new();
        let host = Uuid::new_v4();

        let room_id = lobby.create_room(host, "alice".into());
        let rooms = lobby.open_rooms();
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].room_id, room_id);
        assert_eq!(rooms[0].players[0].name, "alice");
    }

    #[test]
    fn test_second_room_replaces_first() {
        let mut lobby = Lobby::new();
        let host = Uuid::new_v4();

        lobby.create_room(host, "alice".into());
        let second = lobby.create_room(host, "alice".into());

        let rooms = lobby.open_rooms();
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].room_id, second);
    }

    #[test]
    fn test_join_consumes_room() {
        let mut lobby = Lobby::new();
        let host = Uuid::new_v4();
        let joiner = Uuid::new_v4();

        let room_id = lobby.create_room(host, "alice".into());
        let pair = lobby.join_room(room_id, joiner, "bob".into()).unwrap();

        assert_eq!(pair[0].player_id, host);
        assert_eq!(pair[1].player_id, joiner);
        assert!(lobby.open_rooms().is_empty());

        assert_eq!(
            lobby.join_room(room_id, joiner, "bob".into()),
            Err(LobbyError::RoomNotFound)
        );
    }

    #[test]
    fn test_cannot_join_own_room() {
        let mut lobby = Lobby::new();
        let host = Uuid::new_v4();

        let room_id = lobby.create_room(host, "alice".into());
        assert_eq!(
            lobby.join_room(room_id, host, "alice".into()),
            Err(LobbyError::OwnRoom)
        );
        assert_eq!(lobby.open_rooms().len(), 1);
    }

    #[test]
    fn test_joiner_stale_room_dropped() {
        let mut lobby = Lobby::new();
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());

        let alices = lobby.create_room(alice, "alice".into());
        lobby.create_room(bob, "bob".into());

        lobby.join_room(alices, bob, "bob".into()).unwrap();
        assert!(lobby.open_rooms().is_empty());
    }
}
