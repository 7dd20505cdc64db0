//! Bit-packed board state
//!
//! Four piece layers (white circles, white squares, black circles, black
//! squares) plus the anchor, each a `u32` over the 32-cell grid. The whole
//! board is `Copy`, so search code snapshots and restores it by value.

use serde::{Deserialize, Serialize};

use crate::topology::{cells, Cell, Direction, VALID};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Pieces each player starts with. Dropping below this loses the game.
pub const PIECES_PER_PLAYER: u32 = 5;

const WHITE_CIRCLE: usize = 0;
const WHITE_SQUARE: usize = 1;
const BLACK_CIRCLE: usize = 2;
const BLACK_SQUARE: usize = 3;

// ============================================================================
// PLAYER / RESULT
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Player {
    White = 0,
    Black = 1,
}

impl Player {
    pub fn opponent(self) -> Self {
        match self {
            Player::White => Player::Black,
            Player::Black => Player::White,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// +1 for White, -1 for Black. Scores are always from White's side.
    pub fn sign(self) -> f32 {
        match self {
            Player::White => 1.0,
            Player::Black => -1.0,
        }
    }

    fn circle_layer(self) -> usize {
        match self {
            Player::White => WHITE_CIRCLE,
            Player::Black => BLACK_CIRCLE,
        }
    }

    fn square_layer(self) -> usize {
        match self {
            Player::White => WHITE_SQUARE,
            Player::Black => BLACK_SQUARE,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameResult {
    Ongoing,
    WhiteWins,
    BlackWins,
}

impl GameResult {
    pub fn winner(self) -> Option<Player> {
        match self {
            GameResult::Ongoing => None,
            GameResult::WhiteWins => Some(Player::White),
            GameResult::BlackWins => Some(Player::Black),
        }
    }
}

// ============================================================================
// BOARD
// ============================================================================

/// Complete game position. Equality and hashing cover all five layers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Board {
    layers: [u32; 4],
    anchor: u32,
}

impl Board {
    // ========================================================================
    // CONSTRUCTORS
    // ========================================================================

    /// Build a position from explicit piece lists. Panics on overlapping
    /// placements, since that is a broken fixture rather than a game state.
    pub fn from_cells(
        white_circles: &[Cell],
        white_squares: &[Cell],
        black_circles: &[Cell],
        black_squares: &[Cell],
    ) -> Self {
        let mut board = Board::default();
        let groups = [
            (WHITE_CIRCLE, white_circles),
            (WHITE_SQUARE, white_squares),
            (BLACK_CIRCLE, black_circles),
            (BLACK_SQUARE, black_squares),
        ];
        for (layer, group) in groups {
            for &cell in group {
                assert!(board.is_empty(cell.mask()), "cell {cell} placed twice");
                board.layers[layer] |= cell.mask();
            }
        }
        board
    }

    /// Place the anchor on `cell`, as if a square had just pushed from there.
    pub fn with_anchor(mut self, cell: Cell) -> Self {
        self.anchor = cell.mask();
        self
    }

    /// The standard opening: White on the left half, Black mirrored on the right.
    ///
    /// No square touches another piece, so neither side can push before
    /// sliding. No piece stands on `BORDER`, so nothing can be knocked off on
    /// the first turn.
    pub fn default_setup() -> Self {
        let c = |idx: u8| Cell::from_mask(1 << idx);
        // circles a4 c4 d4, squares b3 c2
        let white_circles = [c(3), c(19), c(27)];
        let white_squares = [c(10), c(17)];
        let black_circles = white_circles.map(Cell::mirror);
        let black_squares = white_squares.map(Cell::mirror);
        Board::from_cells(&white_circles, &white_squares, &black_circles, &black_squares)
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    pub fn pieces(&self, player: Player) -> u32 {
        self.layers[player.circle_layer()] | self.layers[player.square_layer()]
    }

    pub fn circles(&self, player: Player) -> u32 {
        self.layers[player.circle_layer()]
    }

    pub fn squares(&self, player: Player) -> u32 {
        self.layers[player.square_layer()]
    }

    pub fn occupied(&self) -> u32 {
        self.layers.iter().fold(0, |acc, layer| acc | layer)
    }

    pub fn empty_cells(&self) -> u32 {
        VALID & !self.occupied()
    }

    pub fn anchor(&self) -> Option<Cell> {
        (self.anchor != 0).then(|| Cell::from_mask(self.anchor))
    }

    pub fn piece_count(&self, player: Player) -> u32 {
        self.pieces(player).count_ones()
    }

    pub fn owns_piece(&self, mask: u32, player: Player) -> bool {
        self.pieces(player) & mask != 0
    }

    pub fn owner(&self, cell: Cell) -> Option<Player> {
        if self.owns_piece(cell.mask(), Player::White) {
            Some(Player::White)
        } else if self.owns_piece(cell.mask(), Player::Black) {
            Some(Player::Black)
        } else {
            None
        }
    }

    pub fn is_square(&self, mask: u32) -> bool {
        (self.layers[WHITE_SQUARE] | self.layers[BLACK_SQUARE]) & mask != 0
    }

    pub fn is_empty(&self, mask: u32) -> bool {
        self.occupied() & mask == 0
    }

    pub fn is_valid(&self, mask: u32) -> bool {
        mask != 0 && mask & !VALID == 0
    }

    pub fn is_anchored(&self, mask: u32) -> bool {
        self.anchor & mask != 0
    }

    /// The player who has won, if either side is missing a piece.
    pub fn check_winner(&self) -> Option<Player> {
        if self.piece_count(Player::White) < PIECES_PER_PLAYER {
            Some(Player::Black)
        } else if self.piece_count(Player::Black) < PIECES_PER_PLAYER {
            Some(Player::White)
        } else {
            None
        }
    }

    pub fn result(&self) -> GameResult {
        match self.check_winner() {
            None => GameResult::Ongoing,
            Some(Player::White) => GameResult::WhiteWins,
            Some(Player::Black) => GameResult::BlackWins,
        }
    }

    // ========================================================================
    // SNAPSHOTS
    // ========================================================================

    pub fn get_state(&self) -> Board {
        *self
    }

    pub fn restore_state(&mut self, other: &Board) {
        *self = *other;
    }

    // ========================================================================
    // MUTATION
    // ========================================================================

    /// Move the piece on `src` to `dst`. Reachability is the caller's job;
    /// occupancy preconditions are asserted.
    pub fn slide(&mut self, src: Cell, dst: Cell) {
        assert!(!self.is_empty(src.mask()), "slide from empty cell {src}");
        assert!(self.is_empty(dst.mask()), "slide onto occupied cell {dst}");
        self.move_piece(src.mask(), dst.mask());
    }

    /// Push the line in front of the square on `src` one step along `dir`.
    ///
    /// Every piece in the contiguous line moves one cell; the last piece
    /// either fills the first empty cell or falls off the board. The anchor
    /// moves to the cell the square now occupies. Returns the cell whose
    /// piece fell off, if any.
    pub fn push(&mut self, src: Cell, dir: Direction) -> Option<Cell> {
        assert!(self.is_square(src.mask()), "push from {src}, which holds no square");

        let mut chain: Vec<Cell> = Vec::with_capacity(8);
        let mut current = src.step(dir);
        let terminus = loop {
            match current {
                Some(cell) if !self.is_empty(cell.mask()) => {
                    assert!(!self.is_anchored(cell.mask()), "push from {src} moves anchored piece at {cell}");
                    chain.push(cell);
                    current = cell.step(dir);
                }
                other => break other,
            }
        };
        let (first, last) = match (chain.first(), chain.last()) {
            (Some(&first), Some(&last)) => (first, last),
            _ => panic!("push from {src} {dir:?} has nothing to push"),
        };

        let removed = match terminus {
            Some(open) => {
                self.move_piece(last.mask(), open.mask());
                None
            }
            None => {
                assert!(!last.is_railed(dir), "push from {src} {dir:?} runs into the rail");
                self.remove_piece(last.mask());
                Some(last)
            }
        };
        for pair in chain.windows(2).rev() {
            self.move_piece(pair[0].mask(), pair[1].mask());
        }
        self.move_piece(src.mask(), first.mask());
        self.anchor = first.mask();

        removed
    }

    fn move_piece(&mut self, from: u32, to: u32) {
        for layer in self.layers.iter_mut() {
            if *layer & from != 0 {
                *layer = (*layer & !from) | to;
                return;
            }
        }
    }

    fn remove_piece(&mut self, mask: u32) {
        for layer in self.layers.iter_mut() {
            *layer &= !mask;
        }
    }

    /// Iterate `(cell, owner, is_square)` for every piece on the board.
    pub fn iter_pieces(&self) -> impl Iterator<Item = (Cell, Player, bool)> + '_ {
        [Player::White, Player::Black].into_iter().flat_map(move |player| {
            cells(self.pieces(player)).map(move |cell| (cell, player, self.is_square(cell.mask())))
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================
