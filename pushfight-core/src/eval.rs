//! Position evaluation

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::board::{Board, Player, PIECES_PER_PLAYER};
use crate::movegen::ComponentMap;
use crate::topology::{cells, neighbors_of, Cell, NUM_VALID, VALID};

/// Win value, returned for any board where a side has lost a piece
pub const WIN_VALUE: f32 = 1000.0;

/// Raw scores are divided by this so ordinary positions land in roughly [-1, 1]
pub const NORMALIZER: f32 = 100.0;

/// Distance charged for a circle when its player owns no territory at all
pub const MAX_TERRITORY_DISTANCE: u32 = 8;

/// Number of component weights in the short weight-vector form
pub const COMPONENT_COUNT: usize = 5;

/// Default positional values, indexed by cell ordinal (row a, b, c, d).
/// Point-symmetric, so Black reading the mirrored cell sees the same table.
#[rustfmt::skip]
pub const DEFAULT_POSITION_TABLE: [f32; NUM_VALID] = [
    0.0, 0.5, 1.0, 1.0, 0.5,
    -2.0, 0.5, 1.5, 2.0, 2.0, 1.5, 0.5, -2.0,
    -2.0, 0.5, 1.5, 2.0, 2.0, 1.5, 0.5, -2.0,
    0.5, 1.0, 1.0, 0.5, 0.0,
];

#[derive(Debug, Error, PartialEq)]
pub enum HeuristicsError {
    #[error("expected {short} component weights or {full} weights with a position table, got {got}")]
    WeightCount { short: usize, full: usize, got: usize },
}

/// Heuristic weights for position evaluation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Heuristics {
    /// Reachable slide destinations per piece
    pub mobility: f32,
    /// Positional table lookups
    pub position: f32,
    /// Penalty per piece group beyond the first
    pub groups: f32,
    /// Penalty per lone circle
    pub isolation: f32,
    /// Penalty per step from a circle to friendly territory
    pub territory: f32,
    /// Per-cell values seen from White's side
    #[serde(default = "default_position_table")]
    pub position_table: [f32; NUM_VALID],
}

fn default_position_table() -> [f32; NUM_VALID] {
    DEFAULT_POSITION_TABLE
}

impl Default for Heuristics {
    fn default() -> Self {
        Self {
            mobility: 0.5,
            position: 1.0,
            groups: 2.0,
            isolation: 3.0,
            territory: 1.5,
            position_table: DEFAULT_POSITION_TABLE,
        }
    }
}

impl Heuristics {
    /// Build from a flat weight vector, as produced by offline tuning.
    ///
    /// Accepts the five component weights alone (default position table) or
    /// the five weights followed by all 26 table values.
    pub fn from_weights(weights: &[f32]) -> Result<Self, HeuristicsError> {
        let full = COMPONENT_COUNT + NUM_VALID;
        if weights.len() != COMPONENT_COUNT && weights.len() != full {
            return Err(HeuristicsError::WeightCount {
                short: COMPONENT_COUNT,
                full,
                got: weights.len(),
            });
        }

        let mut position_table = DEFAULT_POSITION_TABLE;
        if weights.len() == full {
            position_table.copy_from_slice(&weights[COMPONENT_COUNT..]);
        }

        Ok(Self {
            mobility: weights[0],
            position: weights[1],
            groups: weights[2],
            isolation: weights[3],
            territory: weights[4],
            position_table,
        })
    }

    /// Flatten to the full weight vector understood by [`Heuristics::from_weights`]
    pub fn to_weights(&self) -> Vec<f32> {
        let mut weights = vec![self.mobility, self.position, self.groups, self.isolation, self.territory];
        weights.extend_from_slice(&self.position_table);
        weights
    }

    /// Load from JSON: either a `Heuristics` object or a bare weight array
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading heuristics from {}", path.display()))?;

        if let Ok(heuristics) = serde_json::from_str::<Heuristics>(&content) {
            return Ok(heuristics);
        }

        let weights: Vec<f32> = serde_json::from_str(&content)
            .with_context(|| format!("{} is neither a heuristics object nor a weight array", path.display()))?;
        Ok(Self::from_weights(&weights)?)
    }

    fn position_value(&self, cell: Cell, player: Player) -> f32 {
        let cell = match player {
            Player::White => cell,
            Player::Black => cell.mirror(),
        };
        self.position_table[cell.ordinal()]
    }
}

/// Per-player feature counts that feed the weighted sum
#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Features {
    mobility: u32,
    position: f32,
    groups: u32,
    isolated: u32,
    territory_distance: u32,
}

/// Evaluate position from White's perspective (positive = White is better)
pub fn evaluate(board: &Board, heuristics: &Heuristics) -> f32 {
    if board.piece_count(Player::White) != PIECES_PER_PLAYER {
        return -WIN_VALUE;
    }
    if board.piece_count(Player::Black) != PIECES_PER_PLAYER {
        return WIN_VALUE;
    }

    let empty = ComponentMap::of_empty(board);
    let territory = territories(board, &empty);

    let white = features(board, Player::White, &empty, territory[Player::White.index()], heuristics);
    let black = features(board, Player::Black, &empty, territory[Player::Black.index()], heuristics);

    let mut score = 0.0f32;
    score += heuristics.mobility * (white.mobility as f32 - black.mobility as f32);
    score += heuristics.position * (white.position - black.position);
    score += heuristics.groups * (black.groups as f32 - white.groups as f32);
    score += heuristics.isolation * (black.isolated as f32 - white.isolated as f32);
    score += heuristics.territory * (black.territory_distance as f32 - white.territory_distance as f32);

    score / NORMALIZER
}

/// Evaluate with depth bonus for preferring faster wins
pub fn evaluate_with_depth(board: &Board, heuristics: &Heuristics, depth: u32) -> f32 {
    match board.check_winner() {
        Some(winner) => winner.sign() * (WIN_VALUE + depth as f32),
        None => evaluate(board, heuristics),
    }
}

fn features(
    board: &Board,
    player: Player,
    empty: &ComponentMap,
    owned: u32,
    heuristics: &Heuristics,
) -> Features {
    let pieces = board.pieces(player);
    let circles = board.circles(player);
    let mut f = Features::default();

    for cell in cells(pieces) {
        f.mobility += empty.touching(cell.mask()).count_ones();
        f.position += heuristics.position_value(cell, player);
    }

    let groups = ComponentMap::of(pieces);
    // A single group is the ideal shape; only extra groups count against
    f.groups = groups.len().saturating_sub(1) as u32;
    f.isolated = groups
        .iter()
        .filter(|&group| group.count_ones() == 1 && group & circles != 0)
        .count() as u32;

    for circle in cells(circles) {
        if circle.neighbors() & owned == 0 {
            f.territory_distance += distance_to(circle, owned);
        }
    }

    f
}

/// Empty-cell territory owned by each player, indexed by `Player::index`.
///
/// A region belongs to whoever has more pieces bordering it; ties belong to nobody.
fn territories(board: &Board, empty: &ComponentMap) -> [u32; 2] {
    let mut owned = [0u32; 2];
    for region in empty.iter() {
        let border = neighbors_of(region);
        let white = (border & board.pieces(Player::White)).count_ones();
        let black = (border & board.pieces(Player::Black)).count_ones();
        if white > black {
            owned[Player::White.index()] |= region;
        } else if black > white {
            owned[Player::Black.index()] |= region;
        }
    }
    owned
}

/// Breadth-first step count over valid cells from `from` to the nearest cell in `target`
fn distance_to(from: Cell, target: u32) -> u32 {
    if target == 0 {
        return MAX_TERRITORY_DISTANCE;
    }
    let mut reached = from.mask();
    let mut frontier = reached;
    let mut steps = 0;
    while frontier & target == 0 {
        frontier = neighbors_of(frontier) & VALID & !reached;
        if frontier == 0 || steps >= MAX_TERRITORY_DISTANCE {
            return MAX_TERRITORY_DISTANCE;
        }
        reached |= frontier;
        steps += 1;
    }
    steps
}
