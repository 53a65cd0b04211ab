//! Armada - a server-authoritative battleship match engine
//!
//! This crate owns everything that makes a two-player battleship match a
//! match: board state, fleet placement rules, attack resolution, sunk-ship
//! and game-over detection, and turn order. It performs no I/O and never
//! blocks; every operation is a synchronous call returning a value or a
//! [`GameError`].
//!
//! The surrounding service (accounts, rooms, transport) owns a
//! [`MatchRegistry`] and drives it with opaque [`MatchId`]/[`SideId`]
//! handles; it never mutates boards directly.
//!
//! # Modules
//!
//! - [`board`]: the 10×10 cell grid and its shot/sunk-scan algorithms
//! - [`fleet`]: ship types, fleet validation, random fleet generation
//! - [`game`]: the per-match state machine
//! - [`registry`]: the id -> match map handed to the surrounding service
//! - [`bot`]: a random opponent for single-player matches

pub mod board;
pub mod bot;
pub mod fleet;
pub mod game;
pub mod registry;

// Re-export commonly used types
pub use board::{Board, Cell, Coord, BOARD_SIZE};
pub use bot::Bot;
pub use fleet::{FleetError, Orientation, Ship, FLEET_CELLS, FLEET_COMPOSITION, FLEET_SHIPS};
pub use game::{
    AttackOutcome, ErrorClass, GameError, Match, MatchId, MatchPhase, MatchStatus,
    PlacementProgress, ShotStatus, SideId,
};
pub use registry::MatchRegistry;
