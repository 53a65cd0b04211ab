//! Ship placement rules: fleet composition, layout validation, and
//! randomized fleet generation.

use crate::board::{Board, Cell, Coord, BOARD_SIZE};
use crate::game::GameError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fixed fleet composition as `(length, count)` pairs:
/// one 4-cell, two 3-cell, three 2-cell, four 1-cell ships.
pub const FLEET_COMPOSITION: [(u8, u8); 4] = [(4, 1), (3, 2), (2, 3), (1, 4)];

/// Total number of ships in a fleet.
pub const FLEET_SHIPS: usize = 10;

/// Total number of cells a fleet occupies.
pub const FLEET_CELLS: usize = 20;

/// Placement attempts allowed per ship before generation gives up.
///
/// Rejection sampling on a 10×10 board with this fleet converges quickly;
/// the bound only exists so a pathological rng cannot loop forever.
pub const MAX_PLACEMENT_ATTEMPTS: u32 = 1_000;

/// Ways a submitted fleet layout can be illegal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum FleetError {
    #[error("fleet must be exactly 1x4, 2x3, 3x2 and 4x1 ships")]
    WrongComposition,

    #[error("a ship extends outside the board")]
    ShipOutOfBounds,

    #[error("ships overlap or touch each other")]
    TouchingShips,
}

/// Ship orientation on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// A single placed ship: anchor cell, orientation, and length.
///
/// Ships are immutable once placed; after stamping, the engine reasons
/// about the cell grid only and never needs ship identity again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ship {
    pub anchor: Coord,
    pub orientation: Orientation,
    pub length: u8,
}

impl Ship {
    pub fn new(anchor: Coord, orientation: Orientation, length: u8) -> Self {
        Self {
            anchor,
            orientation,
            length,
        }
    }

    /// Whether the whole footprint lies on the board.
    pub fn in_bounds(&self) -> bool {
        let (x, y) = (self.anchor.x as u16, self.anchor.y as u16);
        let end = self.length as u16;
        match self.orientation {
            Orientation::Horizontal => x + end <= BOARD_SIZE as u16 && y < BOARD_SIZE as u16,
            Orientation::Vertical => y + end <= BOARD_SIZE as u16 && x < BOARD_SIZE as u16,
        }
    }

    /// The cells this ship occupies, anchor first.
    pub fn cells(&self) -> Vec<Coord> {
        (0..self.length)
            .map(|i| match self.orientation {
                Orientation::Horizontal => {
                    Coord::new(self.anchor.x.saturating_add(i), self.anchor.y)
                }
                Orientation::Vertical => Coord::new(self.anchor.x, self.anchor.y.saturating_add(i)),
            })
            .collect()
    }
}

/// Whether `ship` fits on `board`: footprint in bounds, and footprint plus
/// its one-cell buffer over empty cells only.
fn can_place(board: &Board, ship: &Ship) -> bool {
    if !ship.in_bounds() {
        return false;
    }
    for cell in ship.cells() {
        for dy in -1..=1 {
            for dx in -1..=1 {
                if let Some(n) = cell.offset(dx, dy) {
                    if board.cell(n) != Cell::Empty {
                        return false;
                    }
                }
            }
        }
    }
    true
}

/// Validate a submitted fleet and stamp it onto a fresh board.
///
/// Checks the fixed composition, then places ships one by one, rejecting
/// any that leave the board or violate the one-cell no-adjacency buffer.
pub fn fleet_board(ships: &[Ship]) -> Result<Board, FleetError> {
    let mut expected: Vec<u8> = FLEET_COMPOSITION
        .iter()
        .flat_map(|&(length, count)| std::iter::repeat(length).take(count as usize))
        .collect();
    let mut submitted: Vec<u8> = ships.iter().map(|s| s.length).collect();
    expected.sort_unstable();
    submitted.sort_unstable();
    if submitted != expected {
        return Err(FleetError::WrongComposition);
    }

    let mut board = Board::new();
    for ship in ships {
        if !ship.in_bounds() {
            return Err(FleetError::ShipOutOfBounds);
        }
        if !can_place(&board, ship) {
            return Err(FleetError::TouchingShips);
        }
        board.stamp_ship(&ship.cells());
    }
    Ok(board)
}

/// Generate a legal random fleet by rejection sampling.
///
/// Each ship gets a random anchor and orientation, retried until its
/// footprint plus buffer is free. Larger ships are placed first while the
/// board is open. Fails with [`GameError::UnplaceableFleet`] if any ship
/// exhausts its retry budget.
pub fn generate_fleet<R: Rng + ?Sized>(rng: &mut R) -> Result<Vec<Ship>, GameError> {
    let mut ships = Vec::with_capacity(FLEET_SHIPS);
    let mut board = Board::new();

    for (length, count) in FLEET_COMPOSITION {
        for _ in 0..count {
            let mut attempts = 0;
            loop {
                let orientation = if rng.gen_bool(0.5) {
                    Orientation::Vertical
                } else {
                    Orientation::Horizontal
                };
                let anchor = Coord::new(rng.gen_range(0..BOARD_SIZE), rng.gen_range(0..BOARD_SIZE));
                let ship = Ship::new(anchor, orientation, length);

                if can_place(&board, &ship) {
                    board.stamp_ship(&ship.cells());
                    ships.push(ship);
                    break;
                }

                attempts += 1;
                if attempts >= MAX_PLACEMENT_ATTEMPTS {
                    return Err(GameError::UnplaceableFleet);
                }
            }
        }
    }

    Ok(ships)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// A known-good layout: every ship on its own row, spaced two apart.
    fn sample_fleet() -> Vec<Ship> {
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

    fn adjacency_violations(board: &Board) -> usize {
        // A ship cell may only touch other cells of its own straight run,
        // so any diagonal ship-ship contact is a violation.
        board
            .iter_coords()
            .filter(|&c| board.cell(c) == Cell::Ship)
            .flat_map(|c| {
                [(-1, -1), (1, -1), (-1, 1), (1, 1)]
                    .into_iter()
                    .filter_map(move |(dx, dy)| c.offset(dx, dy))
            })
            .filter(|&n| board.cell(n) == Cell::Ship)
            .count()
    }

    #[test]
    fn test_ship_cells() {
        let ship = Ship::new(Coord::new(2, 5), Orientation::Vertical, 3);
        assert_eq!(
            ship.cells(),
            vec![Coord::new(2, 5), Coord::new(2, 6), Coord::new(2, 7)]
        );
        assert!(ship.in_bounds());
        assert!(!Ship::new(Coord::new(8, 0), Orientation::Horizontal, 4).in_bounds());
        assert!(!Ship::new(Coord::new(0, 7), Orientation::Vertical, 4).in_bounds());
    }

    #[test]
    fn test_valid_fleet_stamps_twenty_cells() {
        let board = fleet_board(&sample_fleet()).unwrap();
        assert_eq!(board.ship_cells_remaining(), FLEET_CELLS);
        assert_eq!(adjacency_violations(&board), 0);
    }

    #[test]
    fn test_wrong_composition_rejected() {
        let mut ships = sample_fleet();
        ships.pop();
        assert_eq!(fleet_board(&ships), Err(FleetError::WrongComposition));

        // Right count, wrong lengths
        let mut ships = sample_fleet();
        ships[0].length = 3;
        assert_eq!(fleet_board(&ships), Err(FleetError::WrongComposition));
    }

    #[test]
    fn test_out_of_bounds_rejected() {
        let mut ships = sample_fleet();
        ships[0] = Ship::new(Coord::new(7, 0), Orientation::Horizontal, 4);
        assert_eq!(fleet_board(&ships), Err(FleetError::ShipOutOfBounds));
    }

    #[test]
    fn test_touching_ships_rejected() {
        let mut ships = sample_fleet();
        // Diagonal contact with the 4-ship at row 0
        ships[6] = Ship::new(Coord::new(4, 1), Orientation::Horizontal, 1);
        assert_eq!(fleet_board(&ships), Err(FleetError::TouchingShips));

        // Plain overlap
        let mut ships = sample_fleet();
        ships[6] = Ship::new(Coord::new(0, 0), Orientation::Horizontal, 1);
        assert_eq!(fleet_board(&ships), Err(FleetError::TouchingShips));
    }

    #[test]
    fn test_generate_fleet_many_seeds() {
        for seed in 0..1000 {
            let mut rng = StdRng::seed_from_u64(seed);
            let ships = generate_fleet(&mut rng).unwrap();
            assert_eq!(ships.len(), FLEET_SHIPS);

            // Generated fleets must pass the same validation as submissions
            let board = fleet_board(&ships).unwrap();
            assert_eq!(board.ship_cells_remaining(), FLEET_CELLS);
            assert_eq!(adjacency_violations(&board), 0, "seed {}", seed);
        }
    }
}
