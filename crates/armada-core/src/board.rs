//! Board representation and shot bookkeeping.
//!
//! A [`Board`] records one side's own ship placement together with the
//! opponent's attack history against it. All sunk-ship detection works
//! directly on the cell grid: ships are straight, one cell wide, and never
//! touch, so a contiguous run of `Hit`/`Ship` cells belongs to exactly one
//! ship.

use serde::{Deserialize, Serialize};

/// Board edge length. Boards are always square.
pub const BOARD_SIZE: u8 = 10;

/// The four axis directions used for walking ship runs.
const AXES: [(i8, i8); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// State of a single board cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cell {
    /// Never occupied, never attacked
    Empty,
    /// Occupied by an unhit ship segment
    Ship,
    /// Attacked, nothing there
    Miss,
    /// Attacked ship segment (the ship may still be afloat)
    Hit,
}

impl Cell {
    /// Whether this cell has already been attacked.
    pub fn is_attacked(self) -> bool {
        matches!(self, Cell::Miss | Cell::Hit)
    }
}

/// A zero-indexed board coordinate, `x` column and `y` row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coord {
    pub x: u8,
    pub y: u8,
}

impl Coord {
    pub fn new(x: u8, y: u8) -> Self {
        Self { x, y }
    }

    /// Check that the coordinate lies on the board.
    pub fn in_bounds(&self) -> bool {
        self.x < BOARD_SIZE && self.y < BOARD_SIZE
    }

    /// Offset by `(dx, dy)`, returning `None` if the result leaves the board.
    pub fn offset(&self, dx: i8, dy: i8) -> Option<Coord> {
        let x = self.x as i16 + dx as i16;
        let y = self.y as i16 + dy as i16;
        if (0..BOARD_SIZE as i16).contains(&x) && (0..BOARD_SIZE as i16).contains(&y) {
            Some(Coord::new(x as u8, y as u8))
        } else {
            None
        }
    }
}

/// A 10×10 grid of cells, indexed `[y][x]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    cells: [[Cell; BOARD_SIZE as usize]; BOARD_SIZE as usize],
}

impl Board {
    /// Create an all-empty board.
    pub fn new() -> Self {
        Self {
            cells: [[Cell::Empty; BOARD_SIZE as usize]; BOARD_SIZE as usize],
        }
    }

    /// Get the state of a cell. The coordinate must be in bounds.
    pub fn cell(&self, at: Coord) -> Cell {
        debug_assert!(at.in_bounds());
        self.cells[at.y as usize][at.x as usize]
    }

    fn set(&mut self, at: Coord, cell: Cell) {
        debug_assert!(at.in_bounds());
        self.cells[at.y as usize][at.x as usize] = cell;
    }

    /// Stamp ship segments onto the board.
    pub fn stamp_ship(&mut self, cells: &[Coord]) {
        for &c in cells {
            self.set(c, Cell::Ship);
        }
    }

    /// Record a miss on an empty cell.
    pub fn mark_miss(&mut self, at: Coord) {
        debug_assert_eq!(self.cell(at), Cell::Empty);
        self.set(at, Cell::Miss);
    }

    /// Record a hit on a ship cell.
    pub fn mark_hit(&mut self, at: Coord) {
        debug_assert_eq!(self.cell(at), Cell::Ship);
        self.set(at, Cell::Hit);
    }

    /// Whether the ship run through `at` is fully destroyed.
    ///
    /// Walks outward from `at` along all four axes; a run continues through
    /// `Hit` cells and stops at any non-ship boundary. Any `Ship` cell found
    /// along the way means a segment is still afloat. `at` itself must
    /// already be marked `Hit`.
    pub fn is_run_destroyed(&self, at: Coord) -> bool {
        debug_assert_eq!(self.cell(at), Cell::Hit);
        for (dx, dy) in AXES {
            let mut cursor = at;
            while let Some(next) = cursor.offset(dx, dy) {
                match self.cell(next) {
                    Cell::Ship => return false,
                    Cell::Hit => cursor = next,
                    Cell::Empty | Cell::Miss => break,
                }
            }
        }
        true
    }

    /// Collect every cell of the destroyed ship run through `at`.
    pub fn run_cells(&self, at: Coord) -> Vec<Coord> {
        let mut run = vec![at];
        for (dx, dy) in AXES {
            let mut cursor = at;
            while let Some(next) = cursor.offset(dx, dy) {
                if self.cell(next) != Cell::Hit {
                    break;
                }
                run.push(next);
                cursor = next;
            }
        }
        run
    }

    /// Mark every still-empty cell in the 3×3 neighborhood of `cells` as
    /// `Miss`, closing the buffer around a destroyed ship.
    pub fn flood_buffer(&mut self, cells: &[Coord]) {
        for &c in cells {
            for dy in -1..=1 {
                for dx in -1..=1 {
                    if let Some(n) = c.offset(dx, dy) {
                        if self.cell(n) == Cell::Empty {
                            self.set(n, Cell::Miss);
                        }
                    }
                }
            }
        }
    }

    /// Number of ship segments not yet hit.
    pub fn ship_cells_remaining(&self) -> usize {
        self.iter_coords()
            .filter(|&c| self.cell(c) == Cell::Ship)
            .count()
    }

    /// All cells that have not been attacked yet, in row-major order.
    pub fn untargeted_cells(&self) -> Vec<Coord> {
        self.iter_coords()
            .filter(|&c| !self.cell(c).is_attacked())
            .collect()
    }

    /// Iterate every coordinate on the board, row-major.
    pub fn iter_coords(&self) -> impl Iterator<Item = Coord> {
        (0..BOARD_SIZE).flat_map(|y| (0..BOARD_SIZE).map(move |x| Coord::new(x, y)))
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}
