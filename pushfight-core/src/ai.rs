//! CPU-based Alpha-Beta AI
//!
//! One minimax driver with a pluggable cutoff policy:
//! - `Vanilla`: plain alpha-beta
//! - `Stochastic`: softened cutoff, then a weighted draw among the top five root moves
//! - `Scout`: NegaScout-style null-window tests after the first child
//!
//! White maximises, Black minimises. Scores are always from White's side.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::agent::{Agent, AgentError};
use crate::board::{Board, Player};
use crate::eval::{evaluate, evaluate_with_depth, Heuristics, WIN_VALUE};
use crate::movegen::next_states;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Selection probabilities for the best five root moves of the stochastic search
pub const TOP_CHOICE_WEIGHTS: [f64; 5] = [0.50, 0.20, 0.15, 0.10, 0.05];

/// Default cutoff slack for the stochastic search
pub const DEFAULT_THRESHOLD: f32 = 0.05;

/// Width of the scout test window
const NULL_WINDOW: f32 = 1e-4;

// ============================================================================
// POLICY
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CutoffPolicy {
    Vanilla,
    Stochastic { threshold: f32 },
    Scout,
}

// ============================================================================
// ALPHA-BETA AI
// ============================================================================

/// Alpha-Beta AI player
pub struct AlphaBetaAI {
    pub depth: u32,
    pub heuristics: Heuristics,
    pub policy: CutoffPolicy,
    rng: ChaCha8Rng,
    nodes: u64,
}

impl AlphaBetaAI {
    pub fn new(depth: u32, heuristics: Heuristics) -> Self {
        Self::with_policy(depth, heuristics, CutoffPolicy::Vanilla)
    }

    pub fn with_policy(depth: u32, heuristics: Heuristics, policy: CutoffPolicy) -> Self {
        Self {
            depth,
            heuristics,
            policy,
            rng: ChaCha8Rng::seed_from_u64(42),
            nodes: 0,
        }
    }

    pub fn stochastic(depth: u32, heuristics: Heuristics) -> Self {
        Self::with_policy(depth, heuristics, CutoffPolicy::Stochastic { threshold: DEFAULT_THRESHOLD })
    }

    pub fn scout(depth: u32, heuristics: Heuristics) -> Self {
        Self::with_policy(depth, heuristics, CutoffPolicy::Scout)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        self
    }

    /// Nodes visited by the most recent search
    pub fn nodes_searched(&self) -> u64 {
        self.nodes
    }

    /// Evaluate a position
    pub fn evaluate(&self, board: &Board) -> f32 {
        evaluate(board, &self.heuristics)
    }

    /// Search `depth` plies and return the chosen next board for `player`.
    pub fn choose_move(&mut self, board: &Board, depth: u32, player: Player) -> Result<Board, AgentError> {
        let children = next_states(board, player);
        if children.is_empty() {
            return Err(AgentError::NoLegalMoves { player });
        }
        let depth = depth.max(1);
        self.nodes = 0;

        let (index, value) = match self.policy {
            CutoffPolicy::Stochastic { threshold } => self.sample_top_choice(&children, depth, player, threshold),
            CutoffPolicy::Vanilla | CutoffPolicy::Scout => self.best_child(&children, depth, player),
        };

        tracing::debug!(
            policy = ?self.policy,
            depth,
            candidates = children.len(),
            nodes = self.nodes,
            value,
            "alpha-beta search finished"
        );

        Ok(children[index])
    }

    /// Minimax value of `board` with `player` to move, as seen by this search.
    pub fn root_value(&mut self, board: &Board, depth: u32, player: Player) -> f32 {
        let children = next_states(board, player);
        if children.is_empty() {
            return no_move_value(player, depth);
        }
        self.nodes = 0;
        self.best_child(&children, depth.max(1), player).1
    }

    // ========================================================================
    // ROOT SELECTION
    // ========================================================================

    /// Best root move. Under `Scout` every child after the first gets a
    /// null-window test first, exactly like interior nodes.
    fn best_child(&mut self, children: &[Board], depth: u32, player: Player) -> (usize, f32) {
        let mut alpha = f32::NEG_INFINITY;
        let mut beta = f32::INFINITY;
        let mut best = (0, worst_for(player));

        for (i, child) in children.iter().enumerate() {
            let value = if i > 0 && self.policy == CutoffPolicy::Scout {
                self.scout_child(child, depth - 1, alpha, beta, player)
            } else {
                self.search(child, depth - 1, alpha, beta, player.opponent())
            };
            if is_better(player, value, best.1) {
                best = (i, value);
            }
            match player {
                Player::White => alpha = alpha.max(value),
                Player::Black => beta = beta.min(value),
            }
        }

        best
    }

    /// Score every root move, then draw one of the best five by fixed weights.
    fn sample_top_choice(
        &mut self,
        children: &[Board],
        depth: u32,
        player: Player,
        threshold: f32,
    ) -> (usize, f32) {
        let mut scored: Vec<(usize, f32)> = children
            .iter()
            .enumerate()
            .map(|(i, child)| {
                let value = self.alphabeta(
                    child,
                    depth - 1,
                    f32::NEG_INFINITY,
                    f32::INFINITY,
                    player.opponent(),
                    threshold,
                );
                (i, value)
            })
            .collect();

        scored.sort_by(|a, b| {
            let order = a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal);
            match player {
                Player::White => order.reverse(),
                Player::Black => order,
            }
        });

        let top = scored.len().min(TOP_CHOICE_WEIGHTS.len());
        let weights = &TOP_CHOICE_WEIGHTS[..top];
        let total: f64 = weights.iter().sum();
        let mut roll = self.rng.gen::<f64>() * total;
        for (rank, weight) in weights.iter().enumerate() {
            if roll < *weight {
                return scored[rank];
            }
            roll -= weight;
        }
        scored[top - 1]
    }

    // ========================================================================
    // TREE SEARCH
    // ========================================================================

    fn search(&mut self, board: &Board, depth: u32, alpha: f32, beta: f32, player: Player) -> f32 {
        match self.policy {
            CutoffPolicy::Vanilla => self.alphabeta(board, depth, alpha, beta, player, 0.0),
            CutoffPolicy::Stochastic { threshold } => self.alphabeta(board, depth, alpha, beta, player, threshold),
            CutoffPolicy::Scout => self.scout_search(board, depth, alpha, beta, player),
        }
    }

    /// Fail-soft alpha-beta. A non-zero `slack` delays cutoffs so that
    /// near-optimal siblings are still looked at.
    fn alphabeta(
        &mut self,
        board: &Board,
        depth: u32,
        mut alpha: f32,
        mut beta: f32,
        player: Player,
        slack: f32,
    ) -> f32 {
        self.nodes += 1;
        if depth == 0 || board.check_winner().is_some() {
            return evaluate_with_depth(board, &self.heuristics, depth);
        }
        let children = next_states(board, player);
        if children.is_empty() {
            return no_move_value(player, depth);
        }

        let mut best = worst_for(player);
        for child in &children {
            let value = self.alphabeta(child, depth - 1, alpha, beta, player.opponent(), slack);
            match player {
                Player::White => {
                    best = best.max(value);
                    alpha = alpha.max(value);
                }
                Player::Black => {
                    best = best.min(value);
                    beta = beta.min(value);
                }
            }
            if alpha - slack >= beta {
                break;
            }
        }
        best
    }

    /// Scout search: the first child gets the full window, later children a
    /// null-window test, re-searched only when the result lands inside (alpha, beta).
    fn scout_search(&mut self, board: &Board, depth: u32, mut alpha: f32, mut beta: f32, player: Player) -> f32 {
        self.nodes += 1;
        if depth == 0 || board.check_winner().is_some() {
            return evaluate_with_depth(board, &self.heuristics, depth);
        }
        let children = next_states(board, player);
        if children.is_empty() {
            return no_move_value(player, depth);
        }

        let mut best = worst_for(player);
        for (i, child) in children.iter().enumerate() {
            let value = if i == 0 {
                self.scout_search(child, depth - 1, alpha, beta, player.opponent())
            } else {
                self.scout_child(child, depth - 1, alpha, beta, player)
            };

            match player {
                Player::White => {
                    best = best.max(value);
                    alpha = alpha.max(value);
                }
                Player::Black => {
                    best = best.min(value);
                    beta = beta.min(value);
                }
            }
            if alpha >= beta {
                break;
            }
        }
        best
    }

    /// Null-window test of `child` on the side of the window `player` is
    /// trying to improve, re-searched with the full window when the result
    /// lands strictly inside (alpha, beta).
    fn scout_child(&mut self, child: &Board, depth: u32, alpha: f32, beta: f32, player: Player) -> f32 {
        let (lo, hi) = match player {
            Player::White => (alpha, alpha + NULL_WINDOW),
            Player::Black => (beta - NULL_WINDOW, beta),
        };
        let bound = self.scout_search(child, depth, lo, hi, player.opponent());
        if bound > alpha && bound < beta {
            self.scout_search(child, depth, alpha, beta, player.opponent())
        } else {
            bound
        }
    }
}

impl Agent for AlphaBetaAI {
    fn name(&self) -> String {
        let kind = match self.policy {
            CutoffPolicy::Vanilla => "alphabeta",
            CutoffPolicy::Stochastic { .. } => "stochastic",
            CutoffPolicy::Scout => "scout",
        };
        format!("{kind}:{}", self.depth)
    }

    fn next_state(&mut self, board: &Board, turn: Player) -> Result<Board, AgentError> {
        self.choose_move(board, self.depth, turn)
    }
}

// ============================================================================
// REFERENCE MINIMAX
// ============================================================================

/// Full minimax without pruning. Slow; exists to check the pruned searches.
pub fn minimax(board: &Board, depth: u32, player: Player, heuristics: &Heuristics) -> f32 {
    if depth == 0 || board.check_winner().is_some() {
        return evaluate_with_depth(board, heuristics, depth);
    }
    let children = next_states(board, player);
    if children.is_empty() {
        return no_move_value(player, depth);
    }
    let values = children
        .iter()
        .map(|child| minimax(child, depth - 1, player.opponent(), heuristics));
    match player {
        Player::White => values.fold(f32::NEG_INFINITY, f32::max),
        Player::Black => values.fold(f32::INFINITY, f32::min),
    }
}

// ============================================================================
// HELPERS
// ============================================================================

/// A side that cannot push has lost.
fn no_move_value(player: Player, depth: u32) -> f32 {
    -player.sign() * (WIN_VALUE + depth as f32)
}

fn worst_for(player: Player) -> f32 {
    match player {
        Player::White => f32::NEG_INFINITY,
        Player::Black => f32::INFINITY,
    }
}

fn is_better(player: Player, candidate: f32, current: f32) -> bool {
    match player {
        Player::White => candidate > current,
        Player::Black => candidate < current,
    }
}

// ============================================================================
// TESTS
// ============================================================================
