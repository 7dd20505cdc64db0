//! Board geometry: cells, directions and the static adjacency tables
//!
//! The Push Fight board is a 4x8 grid with six holes. Cells are indexed
//! `row * 8 + col`, rows `a..d` top to bottom, columns `1..8` left to right:
//!
//! ```text
//!      1 2 3 4 5 6 7 8
//!   a  . . # # # # # .      rail above row a
//!   b  # # # # # # # #
//!   c  # # # # # # # #
//!   d  . # # # # # . .      rail below row d
//! ```
//!
//! The layout is point-symmetric: cell `i` mirrors to `31 - i`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// CONSTANTS
// ============================================================================

pub const ROWS: u8 = 4;
pub const COLS: u8 = 8;
pub const NUM_CELLS: usize = 32;
pub const NUM_VALID: usize = 26;

/// Bit mask of the 26 playable cells.
pub const VALID: u32 = 0x3EFF_FF7C;

/// Top row. Pushing up from here runs into the rail.
pub const RAIL_UP: u32 = 0x0000_007C;

/// Bottom row. Pushing down from here runs into the rail.
pub const RAIL_DOWN: u32 = 0x3E00_0000;

/// Orthogonal neighbour mask for every cell (zero for holes).
pub const NEIGHBORS: [u32; NUM_CELLS] = build_neighbors();

/// Step target for every (cell, direction), `NO_CELL` when the step leaves the board.
const STEPS: [[u8; 4]; NUM_CELLS] = build_steps();

/// Valid cells from which a piece can be pushed off the board (no rail in the way).
pub const BORDER: u32 = build_border();

/// Valid cell index -> dense ordinal in `0..26`.
const ORDINALS: [u8; NUM_CELLS] = build_ordinals();

const NO_CELL: u8 = u8::MAX;

// ============================================================================
// DIRECTION
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up = 0,
    Down = 1,
    Left = 2,
    Right = 3,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::Up, Direction::Down, Direction::Left, Direction::Right];

    pub fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    const fn delta(self) -> (i8, i8) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
            Direction::Right => (0, 1),
        }
    }
}

// ============================================================================
// CELL
// ============================================================================

/// A grid position in `0..32`. Only the 26 valid cells ever hold pieces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell(u8);

impl Cell {
    /// Build a cell from a raw index. Returns `None` for holes and out-of-range indices.
    pub const fn new(index: u8) -> Option<Cell> {
        if index < NUM_CELLS as u8 && VALID & (1 << index) != 0 {
            Some(Cell(index))
        } else {
            None
        }
    }

    pub const fn from_row_col(row: u8, col: u8) -> Option<Cell> {
        if row >= ROWS || col >= COLS {
            return None;
        }
        Cell::new(row * COLS + col)
    }

    /// Lowest set bit of a non-empty mask.
    pub fn from_mask(mask: u32) -> Cell {
        debug_assert!(mask != 0 && mask & !VALID == 0, "mask {mask:#x} is not a valid cell set");
        Cell(mask.trailing_zeros() as u8)
    }

    pub const fn index(self) -> u8 {
        self.0
    }

    pub const fn row(self) -> u8 {
        self.0 / COLS
    }

    pub const fn col(self) -> u8 {
        self.0 % COLS
    }

    pub const fn mask(self) -> u32 {
        1 << self.0
    }

    pub fn neighbors(self) -> u32 {
        NEIGHBORS[self.0 as usize]
    }

    /// The adjacent cell in `dir`, or `None` if that step leaves the board.
    pub fn step(self, dir: Direction) -> Option<Cell> {
        match STEPS[self.0 as usize][dir as usize] {
            NO_CELL => None,
            idx => Some(Cell(idx)),
        }
    }

    /// True when leaving the board from this cell in `dir` is blocked by a rail.
    pub fn is_railed(self, dir: Direction) -> bool {
        match dir {
            Direction::Up => RAIL_UP & self.mask() != 0,
            Direction::Down => RAIL_DOWN & self.mask() != 0,
            Direction::Left | Direction::Right => false,
        }
    }

    /// The point-symmetric counterpart of this cell.
    pub const fn mirror(self) -> Cell {
        Cell(NUM_CELLS as u8 - 1 - self.0)
    }

    /// Dense index in `0..26`, used by positional tables.
    pub fn ordinal(self) -> usize {
        ORDINALS[self.0 as usize] as usize
    }

    /// All valid cells in index order.
    pub fn all() -> impl Iterator<Item = Cell> {
        cells(VALID)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", (b'a' + self.row()) as char, self.col() + 1)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CellParseError {
    #[error("cell notation must be a row letter a-d followed by a column 1-8, got {0:?}")]
    Malformed(String),
    #[error("cell {0} is a hole in the board")]
    Hole(String),
}

impl FromStr for Cell {
    type Err = CellParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.trim().as_bytes();
        let [row, col] = bytes else {
            return Err(CellParseError::Malformed(s.to_string()));
        };
        let row = row.to_ascii_lowercase();
        if !(b'a'..=b'd').contains(&row) || !(b'1'..=b'8').contains(col) {
            return Err(CellParseError::Malformed(s.to_string()));
        }
        Cell::from_row_col(row - b'a', col - b'1').ok_or_else(|| CellParseError::Hole(s.to_string()))
    }
}

/// Iterate the cells of a bit mask, lowest index first.
pub fn cells(mut mask: u32) -> impl Iterator<Item = Cell> {
    std::iter::from_fn(move || {
        if mask == 0 {
            return None;
        }
        let idx = mask.trailing_zeros() as u8;
        mask &= mask - 1;
        Some(Cell(idx))
    })
}

/// Union of the neighbour masks of every cell in `mask`.
pub fn neighbors_of(mask: u32) -> u32 {
    cells(mask).fold(0, |acc, c| acc | c.neighbors())
}

// ============================================================================
// TABLE CONSTRUCTION
// ============================================================================

const fn step_index(idx: usize, dir: Direction) -> u8 {
    let (dr, dc) = dir.delta();
    let row = (idx / COLS as usize) as i8 + dr;
    let col = (idx % COLS as usize) as i8 + dc;
    if row < 0 || row >= ROWS as i8 || col < 0 || col >= COLS as i8 {
        return NO_CELL;
    }
    let target = (row as usize) * COLS as usize + col as usize;
    if VALID & (1 << target) == 0 {
        NO_CELL
    } else {
        target as u8
    }
}

const fn build_steps() -> [[u8; 4]; NUM_CELLS] {
    let mut table = [[NO_CELL; 4]; NUM_CELLS];
    let mut idx = 0;
    while idx < NUM_CELLS {
        if VALID & (1 << idx) != 0 {
            table[idx] = [
                step_index(idx, Direction::Up),
                step_index(idx, Direction::Down),
                step_index(idx, Direction::Left),
                step_index(idx, Direction::Right),
            ];
        }
        idx += 1;
    }
    table
}

const fn build_neighbors() -> [u32; NUM_CELLS] {
    let steps = build_steps();
    let mut table = [0u32; NUM_CELLS];
    let mut idx = 0;
    while idx < NUM_CELLS {
        let mut d = 0;
        while d < 4 {
            if steps[idx][d] != NO_CELL {
                table[idx] |= 1 << steps[idx][d];
            }
            d += 1;
        }
        idx += 1;
    }
    table
}

const fn build_border() -> u32 {
    let steps = build_steps();
    let mut mask = 0u32;
    let mut idx = 0;
    while idx < NUM_CELLS {
        if VALID & (1 << idx) != 0 {
            let bit = 1u32 << idx;
            let open_up = steps[idx][0] == NO_CELL && RAIL_UP & bit == 0;
            let open_down = steps[idx][1] == NO_CELL && RAIL_DOWN & bit == 0;
            let open_side = steps[idx][2] == NO_CELL || steps[idx][3] == NO_CELL;
            if open_up || open_down || open_side {
                mask |= bit;
            }
        }
        idx += 1;
    }
    mask
}

const fn build_ordinals() -> [u8; NUM_CELLS] {
    let mut table = [NO_CELL; NUM_CELLS];
    let mut next = 0u8;
    let mut idx = 0;
    while idx < NUM_CELLS {
        if VALID & (1 << idx) != 0 {
            table[idx] = next;
            next += 1;
        }
        idx += 1;
    }
    table
}

// ============================================================================
// TESTS
// ============================================================================
