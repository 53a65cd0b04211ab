//! Match registry: the explicit id -> match map owned by the surrounding
//! service.
//!
//! The registry performs no locking of its own; the caller serializes
//! operations per match (or wraps the whole registry) as its concurrency
//! model requires.

use crate::board::Coord;
use crate::fleet::Ship;
use crate::game::{
    AttackOutcome, GameError, Match, MatchId, MatchStatus, PlacementProgress, SideId,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// All active matches, keyed by id.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct MatchRegistry {
    matches: HashMap<MatchId, Match>,
}

impl MatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new match between two sides.
    pub fn create_match(
        &mut self,
        id: MatchId,
        side_a: SideId,
        side_b: SideId,
    ) -> Result<&Match, GameError> {
        if self.matches.contains_key(&id) {
            return Err(GameError::DuplicateMatchId);
        }
        Ok(self.matches.entry(id).or_insert(Match::new(id, side_a, side_b)))
    }

    /// Look up a match.
    pub fn get(&self, id: MatchId) -> Result<&Match, GameError> {
        self.matches.get(&id).ok_or(GameError::MatchNotFound)
    }

    fn get_mut(&mut self, id: MatchId) -> Result<&mut Match, GameError> {
        self.matches.get_mut(&id).ok_or(GameError::MatchNotFound)
    }

    /// Submit a side's fleet.
    pub fn submit_fleet(
        &mut self,
        id: MatchId,
        side: SideId,
        ships: Vec<Ship>,
    ) -> Result<PlacementProgress, GameError> {
        self.get_mut(id)?.submit_fleet(side, ships)
    }

    /// Resolve an attack.
    pub fn attack(
        &mut self,
        id: MatchId,
        attacker: SideId,
        target: Coord,
    ) -> Result<AttackOutcome, GameError> {
        self.get_mut(id)?.attack(attacker, target)
    }

    /// Pick a random legal target for `attacker`.
    pub fn random_target<R: Rng + ?Sized>(
        &self,
        id: MatchId,
        attacker: SideId,
        rng: &mut R,
    ) -> Result<Coord, GameError> {
        self.get(id)?.random_target(attacker, rng)
    }

    /// Turn and completion snapshot for a match.
    pub fn status(&self, id: MatchId) -> Result<MatchStatus, GameError> {
        Ok(self.get(id)?.status())
    }

    /// Close a match with `winner`, on behalf of the caller's
    /// timeout/disconnect policy.
    pub fn force_finish(&mut self, id: MatchId, winner: SideId) -> Result<(), GameError> {
        self.get_mut(id)?.force_finish(winner)
    }

    /// Remove a match. The engine never expires matches on its own;
    /// retention is the caller's policy.
    pub fn remove_match(&mut self, id: MatchId) -> Result<Match, GameError> {
        self.matches.remove(&id).ok_or(GameError::MatchNotFound)
    }

    pub fn contains(&self, id: MatchId) -> bool {
        self.matches.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}
