//! MCTS Search Loop
//!
//! Implements the core MCTS algorithm:
//! 1. Selection - Use UCT (or FPU) to descend the DAG
//! 2. Expansion - Add one child node
//! 3. Simulation - Rollout or heuristic leaf value
//! 4. Backpropagation - Update node visits and edge statistics
//!
//! ## Architecture
//! - Level 2: Search loop coordination
//! - Level 3: Individual MCTS phases
//! - Level 4: Utilities

use std::time::{Duration, Instant};

use rand_chacha::ChaCha8Rng;

use pushfight_core::{evaluate, Board, Heuristics, Player, TurnMove};

use crate::rollout::{simulate, DefaultPolicy, PlayedMove, RolloutLimits};
use crate::tree::{MctsTree, NodeId};
use crate::{Budget, LeafEval, MctsConfig, Selection};

// ============================================================================
// SEARCH RESULT
// ============================================================================

/// Result of MCTS search
#[derive(Debug)]
pub struct SearchResult {
    /// The final DAG after search
    pub tree: MctsTree,
    /// Iterations performed
    pub iterations: u32,
    pub elapsed: Duration,
    /// Statistics for each expanded root move
    pub move_stats: Vec<MoveStatistics>,
}

/// Statistics for a single move at root
#[derive(Clone, Debug)]
pub struct MoveStatistics {
    pub mv: TurnMove,
    pub board: Board,
    pub plays: u32,
    pub average: f32,
}

impl SearchResult {
    /// The root move with the best average reward, with its resulting board
    pub fn best_move(&self) -> Option<(TurnMove, Board)> {
        self.tree
            .best_move()
            .map(|(mv, child)| (mv, self.tree.get(child).board))
    }

    /// Get all moves sorted by plays
    pub fn moves_by_plays(&self) -> Vec<(TurnMove, u32)> {
        let mut moves: Vec<_> = self.move_stats.iter().map(|s| (s.mv, s.plays)).collect();
        moves.sort_by(|a, b| b.1.cmp(&a.1));
        moves
    }
}

/// Path walked by one selection pass
#[derive(Debug, Default)]
struct Descent {
    path: Vec<NodeId>,
    moves: Vec<PlayedMove>,
    /// Selection stepped onto a node already on the path
    cycled: bool,
}

// ============================================================================
// SEARCH LOOP (Level 2 - Main Coordination)
// ============================================================================

/// Run MCTS from `board` with `turn` to move.
///
/// Level 2 function - coordinates the search phases until the budget is spent.
/// At least one iteration always runs.
pub fn run_search(
    board: &Board,
    turn: Player,
    config: &MctsConfig,
    heuristics: &Heuristics,
    policy: &mut dyn DefaultPolicy,
    rng: &mut ChaCha8Rng,
) -> SearchResult {
    let start = Instant::now();
    let mut tree = MctsTree::new(*board, turn);
    let mut iterations = 0u32;

    loop {
        run_single_iteration(&mut tree, config, heuristics, policy, rng);
        iterations += 1;

        let done = match config.budget {
            Budget::Iterations(limit) => iterations >= limit,
            Budget::Time(limit) => start.elapsed() >= limit,
        };
        if done {
            break;
        }
    }

    let move_stats = collect_move_statistics(&tree);
    SearchResult {
        tree,
        iterations,
        elapsed: start.elapsed(),
        move_stats,
    }
}

/// Single MCTS iteration
///
/// Level 3 function - implements one complete MCTS cycle.
fn run_single_iteration(
    tree: &mut MctsTree,
    config: &MctsConfig,
    heuristics: &Heuristics,
    policy: &mut dyn DefaultPolicy,
    rng: &mut ChaCha8Rng,
) {
    // Phase 1 + 2: Selection and expansion
    let mut descent = select(tree, config, rng);

    // Phase 3: Simulation
    let reward = if descent.cycled {
        0.0
    } else {
        let leaf = *descent.path.last().unwrap_or(&NodeId::ROOT);
        evaluate_leaf(tree, leaf, &mut descent.moves, config, heuristics, policy, rng)
    };

    // Phase 4: Backpropagation
    tree.backpropagate(&descent.path, reward);
    policy.record(&descent.moves, reward);
}

// ============================================================================
// SELECTION (Level 3)
// ============================================================================

/// Descend from the root, expanding at most one new child.
fn select(tree: &mut MctsTree, config: &MctsConfig, rng: &mut ChaCha8Rng) -> Descent {
    let mut descent = Descent {
        path: vec![tree.root()],
        ..Descent::default()
    };
    let mut current = tree.root();

    loop {
        tree.generate_moves(current, rng);
        let node = tree.get(current);
        if node.is_terminal() {
            break;
        }
        let turn = node.turn;
        let has_unexplored = !node.unexplored.is_empty();
        let best = tree.select_child(current, config.exploration);

        let expand = match config.selection {
            Selection::Uct => has_unexplored,
            // Unexplored moves compete with known children at a fixed urgency
            Selection::Fpu { urgency } => {
                has_unexplored && best.map_or(true, |(_, _, score)| urgency > score)
            }
        };

        let step = if expand {
            tree.expand(current).map(|(mv, child)| (mv, child, true))
        } else {
            best.map(|(mv, child, _)| (mv, child, false))
        };
        let Some((mv, child, expanded)) = step else {
            break;
        };

        descent.moves.push((turn, mv));
        descent.cycled = descent.path.contains(&child);
        descent.path.push(child);
        if expanded || descent.cycled {
            break;
        }
        current = child;
    }

    descent
}

// ============================================================================
// LEAF EVALUATION (Level 3)
// ============================================================================

/// Value of the selected leaf, in [-1, 1] from White's side
fn evaluate_leaf(
    tree: &MctsTree,
    leaf: NodeId,
    moves: &mut Vec<PlayedMove>,
    config: &MctsConfig,
    heuristics: &Heuristics,
    policy: &mut dyn DefaultPolicy,
    rng: &mut ChaCha8Rng,
) -> f32 {
    let node = tree.get(leaf);
    if let Some(reward) = node.terminal_reward() {
        return reward;
    }

    let limits = RolloutLimits {
        max_turns: config.max_rollout_turns,
        repetition_limit: config.repetition_limit,
    };
    let previous = moves.last().map(|(_, mv)| *mv);
    let mut rollout = |moves: &mut Vec<PlayedMove>| {
        let result = simulate(&node.board, node.turn, previous, policy, limits, rng);
        moves.extend_from_slice(&result.history);
        result.reward
    };

    match config.leaf {
        LeafEval::Rollout => rollout(moves),
        LeafEval::Heuristic => heuristic_value(&node.board, heuristics),
        LeafEval::Blend { weight } => {
            let weight = weight.clamp(0.0, 1.0);
            weight * heuristic_value(&node.board, heuristics) + (1.0 - weight) * rollout(moves)
        }
    }
}

/// Static evaluation squeezed into the reward range
fn heuristic_value(board: &Board, heuristics: &Heuristics) -> f32 {
    evaluate(board, heuristics).clamp(-1.0, 1.0)
}

// ============================================================================
// STATISTICS COLLECTION (Level 4 - Utilities)
// ============================================================================

/// Collect statistics for root moves
fn collect_move_statistics(tree: &MctsTree) -> Vec<MoveStatistics> {
    tree.move_statistics()
        .into_iter()
        .map(|(mv, child, edge)| MoveStatistics {
            mv,
            board: tree.get(child).board,
            plays: edge.plays,
            average: edge.average(),
        })
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
