//! Per-match state machine.
//!
//! A [`Match`] owns the two sides of one battleship game: their boards, the
//! turn marker, and the placement/battle/finished phase. All mutation goes
//! through its operations; callers never touch a board directly.

use crate::board::{Board, Cell, Coord};
use crate::fleet::{self, FleetError, Ship};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Opaque match identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchId(Uuid);

impl MatchId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Opaque per-match side identifier. Distinct from any global account id;
/// the caller decides how sides map to players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SideId(Uuid);

impl SideId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SideId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SideId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Broad classification of engine errors, for callers that only need to
/// know how to react rather than exactly what went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorClass {
    NotFound,
    InvalidState,
    InvalidInput,
    Exhausted,
}

/// Errors returned by match operations.
///
/// Every precondition violation has its own variant so the caller can
/// render an accurate message; none of them mutate match state.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GameError {
    #[error("match id already registered")]
    DuplicateMatchId,

    #[error("match not found")]
    MatchNotFound,

    #[error("side not found in this match")]
    SideNotFound,

    #[error("fleet already placed for this side")]
    AlreadyPlaced,

    #[error("both fleets must be placed before attacking")]
    PlacementIncomplete,

    #[error("not your turn")]
    NotYourTurn,

    #[error("coordinate out of bounds")]
    OutOfBounds,

    #[error("cell was already attacked")]
    CellAlreadyAttacked,

    #[error("match is already finished")]
    MatchFinished,

    #[error("malformed fleet: {0}")]
    MalformedFleet(#[from] FleetError),

    #[error("no legal targets remain")]
    NoLegalMoves,

    #[error("could not place a fleet within the retry budget")]
    UnplaceableFleet,
}

impl GameError {
    pub fn class(&self) -> ErrorClass {
        match self {
            GameError::MatchNotFound | GameError::SideNotFound => ErrorClass::NotFound,
            GameError::AlreadyPlaced
            | GameError::PlacementIncomplete
            | GameError::NotYourTurn
            | GameError::CellAlreadyAttacked
            | GameError::MatchFinished => ErrorClass::InvalidState,
            GameError::DuplicateMatchId
            | GameError::OutOfBounds
            | GameError::MalformedFleet(_) => ErrorClass::InvalidInput,
            GameError::NoLegalMoves | GameError::UnplaceableFleet => ErrorClass::Exhausted,
        }
    }
}

/// Match phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchPhase {
    /// Waiting for one or both fleets
    Placement,
    /// Both fleets placed, attacks accepted
    Battle,
    /// Winner decided, no further attacks
    Finished { winner: SideId },
}

/// How far fleet placement has progressed after a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlacementProgress {
    /// This side placed; the opponent has not
    AwaitingOpponent,
    /// Both sides placed; the match is now attackable
    BothFleetsReady,
}

/// Result of a resolved shot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShotStatus {
    /// Empty cell; turn passes to the defender
    Miss,
    /// Ship segment hit but the ship is still afloat; attacker keeps firing
    Shot,
    /// Last segment of a ship hit; attacker keeps firing
    Killed,
}

/// Outcome of a single attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackOutcome {
    pub status: ShotStatus,
    pub position: Coord,
    pub attacker: SideId,
    pub finished: bool,
    pub winner: Option<SideId>,
}

/// Snapshot of a match's turn and completion state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchStatus {
    pub turn: SideId,
    pub finished: bool,
    pub winner: Option<SideId>,
}

/// One side's board and (once submitted) fleet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SideState {
    board: Board,
    fleet: Option<Vec<Ship>>,
}

impl SideState {
    fn new() -> Self {
        Self {
            board: Board::new(),
            fleet: None,
        }
    }
}

/// A single two-player match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    id: MatchId,
    /// Explicit side -> board mapping; sides are never indexed positionally.
    sides: HashMap<SideId, SideState>,
    turn: SideId,
    phase: MatchPhase,
}

impl Match {
    /// Create a match between two sides. The first side moves first.
    pub fn new(id: MatchId, side_a: SideId, side_b: SideId) -> Self {
        debug_assert_ne!(side_a, side_b, "a match needs two distinct sides");
        let mut sides = HashMap::new();
        sides.insert(side_a, SideState::new());
        sides.insert(side_b, SideState::new());
        Self {
            id,
            sides,
            turn: side_a,
            phase: MatchPhase::Placement,
        }
    }

    pub fn id(&self) -> MatchId {
        self.id
    }

    pub fn turn(&self) -> SideId {
        self.turn
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, MatchPhase::Finished { .. })
    }

    pub fn winner(&self) -> Option<SideId> {
        match self.phase {
            MatchPhase::Finished { winner } => Some(winner),
            _ => None,
        }
    }

    /// The two side ids, in no particular order.
    pub fn side_ids(&self) -> impl Iterator<Item = SideId> + '_ {
        self.sides.keys().copied()
    }

    /// A side's own board.
    pub fn board(&self, side: SideId) -> Result<&Board, GameError> {
        self.sides
            .get(&side)
            .map(|s| &s.board)
            .ok_or(GameError::SideNotFound)
    }

    /// A side's submitted fleet, if any.
    pub fn fleet(&self, side: SideId) -> Result<Option<&[Ship]>, GameError> {
        self.sides
            .get(&side)
            .map(|s| s.fleet.as_deref())
            .ok_or(GameError::SideNotFound)
    }

    fn opponent_of(&self, side: SideId) -> Result<SideId, GameError> {
        if !self.sides.contains_key(&side) {
            return Err(GameError::SideNotFound);
        }
        self.sides
            .keys()
            .copied()
            .find(|&s| s != side)
            .ok_or(GameError::SideNotFound)
    }

    /// Accept a side's fleet, validate it, and stamp it onto that side's
    /// board. Each side may place exactly once.
    pub fn submit_fleet(
        &mut self,
        side: SideId,
        ships: Vec<Ship>,
    ) -> Result<PlacementProgress, GameError> {
        if self.is_finished() {
            return Err(GameError::MatchFinished);
        }
        let state = self.sides.get(&side).ok_or(GameError::SideNotFound)?;
        if state.fleet.is_some() {
            return Err(GameError::AlreadyPlaced);
        }

        let board = fleet::fleet_board(&ships)?;
        let state = self.sides.get_mut(&side).expect("side checked above");
        state.board = board;
        state.fleet = Some(ships);

        if self.sides.values().all(|s| s.fleet.is_some()) {
            self.phase = MatchPhase::Battle;
            Ok(PlacementProgress::BothFleetsReady)
        } else {
            Ok(PlacementProgress::AwaitingOpponent)
        }
    }

    /// Resolve an attack by `attacker` on the defender's board.
    ///
    /// A miss passes the turn to the defender; a shot or kill keeps it. A
    /// kill also floods the one-cell buffer around the destroyed run with
    /// misses so no future shot can be wasted there. The match finishes
    /// when no ship cell remains on the defender's board.
    pub fn attack(&mut self, attacker: SideId, target: Coord) -> Result<AttackOutcome, GameError> {
        if self.is_finished() {
            return Err(GameError::MatchFinished);
        }
        let defender = self.opponent_of(attacker)?;
        if self.phase == MatchPhase::Placement {
            return Err(GameError::PlacementIncomplete);
        }
        if attacker != self.turn {
            return Err(GameError::NotYourTurn);
        }
        if !target.in_bounds() {
            return Err(GameError::OutOfBounds);
        }

        let board = &mut self
            .sides
            .get_mut(&defender)
            .expect("defender exists")
            .board;

        let status = match board.cell(target) {
            Cell::Hit | Cell::Miss => return Err(GameError::CellAlreadyAttacked),
            Cell::Empty => {
                board.mark_miss(target);
                self.turn = defender;
                ShotStatus::Miss
            }
            Cell::Ship => {
                board.mark_hit(target);
                if board.is_run_destroyed(target) {
                    let run = board.run_cells(target);
                    board.flood_buffer(&run);
                    ShotStatus::Killed
                } else {
                    ShotStatus::Shot
                }
            }
        };

        if status != ShotStatus::Miss && board.ship_cells_remaining() == 0 {
            self.phase = MatchPhase::Finished { winner: attacker };
        }

        Ok(AttackOutcome {
            status,
            position: target,
            attacker,
            finished: self.is_finished(),
            winner: self.winner(),
        })
    }

    /// Pick a uniformly random untargeted cell on the defender's board.
    ///
    /// Used for auto-attack and bot play. The random source is injected so
    /// tests can be deterministic.
    pub fn random_target<R: Rng + ?Sized>(
        &self,
        attacker: SideId,
        rng: &mut R,
    ) -> Result<Coord, GameError> {
        let defender = self.opponent_of(attacker)?;
        let candidates = self.sides[&defender].board.untargeted_cells();
        candidates.choose(rng).copied().ok_or(GameError::NoLegalMoves)
    }

    /// Turn and completion snapshot.
    pub fn status(&self) -> MatchStatus {
        MatchStatus {
            turn: self.turn,
            finished: self.is_finished(),
            winner: self.winner(),
        }
    }

    /// Declare `winner` and close the match, on behalf of the caller's
    /// timeout/disconnect policy. The boards are left as they stand.
    pub fn force_finish(&mut self, winner: SideId) -> Result<(), GameError> {
        if self.is_finished() {
            return Err(GameError::MatchFinished);
        }
        if !self.sides.contains_key(&winner) {
            return Err(GameError::SideNotFound);
        }
        self.phase = MatchPhase::Finished { winner };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::BOARD_SIZE;
    use crate::fleet::Orientation;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn test_fleet() -> Vec<Ship> {
        vec![
            Ship::new(Coord::new(0, 0), Orientation::Horizontal, 4),
            Ship::new(Coord::new(0, 2), Orientation::Horizontal, 3),
            Ship::new(Coord::new(5, 2), Orientation::Horizontal, 3),
            Ship::new(Coord::new(0, 4), Orientation::Horizontal, 2),
            Ship::new(Coord::new(4, 4), Orientation::Horizontal, 2),
            Ship::new(Coord::new(8, 4), Orientation::Horizontal, 2),
            Ship::new(Coord::new(0, 6), Orientation::Horizontal, 1),
            Ship::new(Coord::new(3, 6), Orientation::Horizontal, 1),
            Ship::new(Coord::new(6, 6), Orientation::Horizontal, 1),
            Ship::new(Coord::new(9, 6), Orientation::Horizontal, 1),
        ]
    }

    fn battle_ready() -> (Match, SideId, SideId) {
        let (a, b) = (SideId::new(), SideId::new());
        let mut game = Match::new(MatchId::new(), a, b);
        game.submit_fleet(a, test_fleet()).unwrap();
        game.submit_fleet(b, test_fleet()).unwrap();
        (game, a, b)
    }

    #[test]
    fn test_first_side_moves_first() {
        let (a, b) = (SideId::new(), SideId::new());
        let game = Match::new(MatchId::new(), a, b);
        assert_eq!(game.turn(), a);
        assert_eq!(game.phase(), MatchPhase::Placement);
        assert_eq!(game.winner(), None);
        let _ = b;
    }

    #[test]
    fn test_placement_progress() {
        let (a, b) = (SideId::new(), SideId::new());
        let mut game = Match::new(MatchId::new(), a, b);

        assert_eq!(
            game.submit_fleet(a, test_fleet()),
            Ok(PlacementProgress::AwaitingOpponent)
        );
        assert_eq!(game.phase(), MatchPhase::Placement);

        assert_eq!(
            game.submit_fleet(b, test_fleet()),
            Ok(PlacementProgress::BothFleetsReady)
        );
        assert_eq!(game.phase(), MatchPhase::Battle);
        assert_eq!(game.board(a).unwrap().ship_cells_remaining(), 20);
    }

    #[test]
    fn test_placement_rejections() {
        let (a, b) = (SideId::new(), SideId::new());
        let mut game = Match::new(MatchId::new(), a, b);

        assert_eq!(
            game.submit_fleet(SideId::new(), test_fleet()),
            Err(GameError::SideNotFound)
        );

        game.submit_fleet(a, test_fleet()).unwrap();
        assert_eq!(
            game.submit_fleet(a, test_fleet()),
            Err(GameError::AlreadyPlaced)
        );

        // A rejected fleet leaves the side unplaced
        let mut bad = test_fleet();
        bad.pop();
        assert_eq!(
            game.submit_fleet(b, bad),
            Err(GameError::MalformedFleet(FleetError::WrongComposition))
        );
        assert_eq!(game.fleet(b).unwrap(), None);
        assert_eq!(game.phase(), MatchPhase::Placement);
    }

    #[test]
    fn test_attack_preconditions() {
        let (a, b) = (SideId::new(), SideId::new());
        let mut game = Match::new(MatchId::new(), a, b);

        assert_eq!(
            game.attack(a, Coord::new(0, 0)),
            Err(GameError::PlacementIncomplete)
        );

        game.submit_fleet(a, test_fleet()).unwrap();
        game.submit_fleet(b, test_fleet()).unwrap();

        assert_eq!(
            game.attack(SideId::new(), Coord::new(0, 0)),
            Err(GameError::SideNotFound)
        );
        assert_eq!(game.attack(b, Coord::new(0, 0)), Err(GameError::NotYourTurn));
        assert_eq!(
            game.attack(a, Coord::new(BOARD_SIZE, 0)),
            Err(GameError::OutOfBounds)
        );
    }

    #[test]
    fn test_miss_passes_turn() {
        let (mut game, a, b) = battle_ready();

        // (5,5) is empty in the test layout
        let outcome = game.attack(a, Coord::new(5, 5)).unwrap();
        assert_eq!(outcome.status, ShotStatus::Miss);
        assert!(!outcome.finished);
        assert_eq!(game.turn(), b);
    }

    #[test]
    fn test_shot_keeps_turn() {
        let (mut game, a, _b) = battle_ready();

        let outcome = game.attack(a, Coord::new(0, 0)).unwrap();
        assert_eq!(outcome.status, ShotStatus::Shot);
        assert_eq!(game.turn(), a);
    }

    #[test]
    fn test_repeat_attack_rejected_and_state_unchanged() {
        let (mut game, a, b) = battle_ready();

        game.attack(a, Coord::new(0, 0)).unwrap();
        let before = game.board(b).unwrap().clone();
        let turn_before = game.turn();

        assert_eq!(
            game.attack(a, Coord::new(0, 0)),
            Err(GameError::CellAlreadyAttacked)
        );
        assert_eq!(game.board(b).unwrap(), &before);
        assert_eq!(game.turn(), turn_before);

        // Same for a missed cell, by either side's next move
        game.attack(a, Coord::new(5, 5)).unwrap();
        assert_eq!(
            game.attack(b, Coord::new(5, 5)).ok(),
            Some(AttackOutcome {
                status: ShotStatus::Miss,
                position: Coord::new(5, 5),
                attacker: b,
                finished: false,
                winner: None,
            })
        );
    }

    #[test]
    fn test_kill_floods_buffer() {
        let (mut game, a, b) = battle_ready();

        // 1-cell ship at (0,6)
        let outcome = game.attack(a, Coord::new(0, 6)).unwrap();
        assert_eq!(outcome.status, ShotStatus::Killed);
        assert_eq!(game.turn(), a);

        let board = game.board(b).unwrap();
        for c in [
            Coord::new(1, 5),
            Coord::new(1, 6),
            Coord::new(1, 7),
            Coord::new(0, 5),
            Coord::new(0, 7),
        ] {
            assert_eq!(board.cell(c), Cell::Miss, "buffer not closed at {:?}", c);
        }
    }

    #[test]
    fn test_kill_of_longer_ship_requires_all_segments() {
        let (mut game, a, _b) = battle_ready();

        assert_eq!(game.attack(a, Coord::new(0, 0)).unwrap().status, ShotStatus::Shot);
        assert_eq!(game.attack(a, Coord::new(1, 0)).unwrap().status, ShotStatus::Shot);
        assert_eq!(game.attack(a, Coord::new(3, 0)).unwrap().status, ShotStatus::Shot);
        assert_eq!(
            game.attack(a, Coord::new(2, 0)).unwrap().status,
            ShotStatus::Killed
        );
    }

    #[test]
    fn test_win_and_no_further_attacks() {
        let (mut game, a, b) = battle_ready();

        // Sink everything; kills never yield the turn
        let mut last = None;
        for ship in test_fleet() {
            for cell in ship.cells() {
                last = Some(game.attack(a, cell).unwrap());
            }
        }

        let last = last.unwrap();
        assert_eq!(last.status, ShotStatus::Killed);
        assert!(last.finished);
        assert_eq!(last.winner, Some(a));
        assert_eq!(
            game.status(),
            MatchStatus {
                turn: a,
                finished: true,
                winner: Some(a),
            }
        );

        assert_eq!(
            game.attack(b, Coord::new(9, 9)),
            Err(GameError::MatchFinished)
        );
    }

    #[test]
    fn test_random_target_avoids_attacked_cells() {
        let (mut game, a, b) = battle_ready();
        let mut rng = StdRng::seed_from_u64(7);

        // Attack a few cells, then make sure they are never suggested again
        game.attack(a, Coord::new(0, 0)).unwrap();
        game.attack(a, Coord::new(5, 5)).unwrap();

        let attacked = [Coord::new(0, 0), Coord::new(5, 5)];
        for _ in 0..500 {
            let target = game.random_target(b, &mut rng).unwrap();
            assert!(target.in_bounds());
            // b targets a's board, untouched so far; a's own shots landed on b
            let _ = target;
        }
        for _ in 0..500 {
            let target = game.random_target(a, &mut rng).unwrap();
            assert!(!attacked.contains(&target));
        }
    }

    #[test]
    fn test_force_finish() {
        let (mut game, a, b) = battle_ready();

        assert_eq!(game.force_finish(SideId::new()), Err(GameError::SideNotFound));
        game.force_finish(b).unwrap();
        assert_eq!(game.winner(), Some(b));
        assert_eq!(game.force_finish(a), Err(GameError::MatchFinished));
        assert_eq!(
            game.attack(a, Coord::new(0, 0)),
            Err(GameError::MatchFinished)
        );
    }

    #[test]
    fn test_error_classes() {
        assert_eq!(GameError::MatchNotFound.class(), ErrorClass::NotFound);
        assert_eq!(GameError::NotYourTurn.class(), ErrorClass::InvalidState);
        assert_eq!(GameError::OutOfBounds.class(), ErrorClass::InvalidInput);
        assert_eq!(
            GameError::MalformedFleet(FleetError::TouchingShips).class(),
            ErrorClass::InvalidInput
        );
        assert_eq!(GameError::NoLegalMoves.class(), ErrorClass::Exhausted);
    }
}
