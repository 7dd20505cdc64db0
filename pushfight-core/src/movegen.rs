//! Move generation
//!
//! A turn is up to two slides followed by exactly one push. Slides travel
//! any distance through connected empty cells, so destinations come from a
//! flood fill over the empty-cell graph rather than single steps.
//!
//! ## Architecture
//! - Level 2: `next_moves` / `next_states` (full turn enumeration)
//! - Level 3: `legal_slides`, `legal_pushes`, `is_valid_push`
//! - Level 4: `ComponentMap` flood fill helpers

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::board::{Board, Player, PIECES_PER_PLAYER};
use crate::topology::{cells, neighbors_of, Cell, Direction};

// ============================================================================
// MOVE TYPES
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Slide {
    pub from: Cell,
    pub to: Cell,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Push {
    pub from: Cell,
    pub dir: Direction,
}

/// One complete turn: zero to two slides, then a push.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TurnMove {
    pub slides: [Option<Slide>; 2],
    pub push: Push,
}

impl TurnMove {
    /// Replay this turn on `board`. The move must be legal there.
    pub fn apply(&self, board: &mut Board) {
        for slide in self.slides.iter().flatten() {
            board.slide(slide.from, slide.to);
        }
        board.push(self.push.from, self.push.dir);
    }
}

// ============================================================================
// CONNECTED COMPONENTS (Level 4)
// ============================================================================

/// Flood fill of `start` through the cells of `open`.
pub fn flood_fill(start: u32, open: u32) -> u32 {
    let mut reached = start & open;
    let mut frontier = reached;
    while frontier != 0 {
        frontier = neighbors_of(frontier) & open & !reached;
        reached |= frontier;
    }
    reached
}

/// Partition of a cell set into its connected components.
///
/// Built fresh per call; nothing is cached between generator invocations.
#[derive(Clone, Debug, Default)]
pub struct ComponentMap {
    components: Vec<u32>,
}

impl ComponentMap {
    /// Label every connected component of `mask`.
    pub fn of(mut mask: u32) -> Self {
        let mut components = Vec::new();
        while mask != 0 {
            let seed = mask & mask.wrapping_neg();
            let component = flood_fill(seed, mask);
            components.push(component);
            mask &= !component;
        }
        Self { components }
    }

    /// Components of the empty cells on `board`.
    pub fn of_empty(board: &Board) -> Self {
        Self::of(board.empty_cells())
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.components.iter().copied()
    }

    /// Union of every component that touches one of the cells in `mask`.
    pub fn touching(&self, mask: u32) -> u32 {
        let border = neighbors_of(mask);
        self.components
            .iter()
            .filter(|&&component| component & border != 0)
            .fold(0, |acc, component| acc | component)
    }
}

// ============================================================================
// SLIDES (Level 3)
// ============================================================================

/// Every empty cell reachable from `src` through empty cells.
pub fn slide_destinations(board: &Board, src: Cell) -> u32 {
    let empty = board.empty_cells();
    flood_fill(src.neighbors() & empty, empty)
}

/// All slides for `player`. The first entry is always `None`, the skip action.
pub fn legal_slides(board: &Board, player: Player) -> Vec<Option<Slide>> {
    let components = ComponentMap::of_empty(board);
    let mut slides = vec![None];
    for from in cells(board.pieces(player)) {
        for to in cells(components.touching(from.mask())) {
            slides.push(Some(Slide { from, to }));
        }
    }
    slides
}

// ============================================================================
// PUSHES (Level 3)
// ============================================================================

/// True if a square on `src` could push along `dir`.
///
/// The line must start with a piece, contain no anchored piece, and end in
/// either an empty cell or an open board edge.
pub fn is_valid_push(board: &Board, src: Cell, dir: Direction) -> bool {
    let mut cell = match src.step(dir) {
        Some(first) if !board.is_empty(first.mask()) => first,
        _ => return false,
    };
    loop {
        if board.is_anchored(cell.mask()) {
            return false;
        }
        match cell.step(dir) {
            None => return !cell.is_railed(dir),
            Some(next) if board.is_empty(next.mask()) => return true,
            Some(next) => cell = next,
        }
    }
}

pub fn legal_pushes(board: &Board, player: Player) -> Vec<Push> {
    cells(board.squares(player))
        .flat_map(|from| Direction::ALL.into_iter().map(move |dir| Push { from, dir }))
        .filter(|push| is_valid_push(board, push.from, push.dir))
        .collect()
}

// ============================================================================
// FULL TURNS (Level 2)
// ============================================================================

/// Every distinct board `player` can reach in one turn, paired with one move
/// that reaches it.
///
/// Slide sequences are explored ply by ply with duplicate intermediate
/// boards dropped. Moves that knock out one of the mover's own pieces are
/// discarded unless the mover was already short of pieces.
pub fn next_moves(board: &Board, player: Player) -> Vec<(TurnMove, Board)> {
    let already_losing = board.piece_count(player) < PIECES_PER_PLAYER;

    let mut seen: FxHashSet<Board> = FxHashSet::default();
    seen.insert(*board);
    let mut positions: Vec<(Board, [Option<Slide>; 2])> = vec![(*board, [None, None])];
    let mut frontier = positions.clone();

    for ply in 0..2 {
        let mut next_frontier = Vec::new();
        for (position, slides) in &frontier {
            for slide in legal_slides(position, player).into_iter().flatten() {
                let mut after = *position;
                after.slide(slide.from, slide.to);
                if seen.insert(after) {
                    let mut sequence = *slides;
                    sequence[ply] = Some(slide);
                    next_frontier.push((after, sequence));
                }
            }
        }
        positions.extend_from_slice(&next_frontier);
        frontier = next_frontier;
    }

    let mut results: FxHashSet<Board> = FxHashSet::default();
    let mut moves = Vec::new();
    for (position, slides) in positions {
        for push in legal_pushes(&position, player) {
            let mut after = position;
            after.push(push.from, push.dir);
            if !already_losing && after.piece_count(player) < PIECES_PER_PLAYER {
                continue;
            }
            if results.insert(after) {
                moves.push((TurnMove { slides, push }, after));
            }
        }
    }
    moves
}

/// Every distinct board `player` can reach in one turn.
pub fn next_states(board: &Board, player: Player) -> Vec<Board> {
    next_moves(board, player).into_iter().map(|(_, b)| b).collect()
}

// ============================================================================
// TESTS
// ============================================================================
