//! Push Fight MCTS - Monte Carlo Tree Search agents
//!
//! This crate provides one MCTS driver with pluggable parts:
//! - Tree policy (UCT, or First-Play-Urgency)
//! - Default policy for rollouts (uniform, biased, MAST, last-good-reply)
//! - Leaf evaluation (rollout, heuristic seed, or a blend)
//! - Backpropagation over a transposition-aware DAG

pub mod rollout;
pub mod search;
pub mod tree;

use std::time::Duration;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use pushfight_core::{Agent, AgentError, Board, Heuristics, Player};

use crate::rollout::{build_policy, DefaultPolicy};
pub use crate::search::{run_search, MoveStatistics, SearchResult};

// ============================================================================
// CONFIGURATION
// ============================================================================

pub const DEFAULT_EXPLORATION: f32 = 1.0;
pub const DEFAULT_FPU_URGENCY: f32 = 1.0;
pub const DEFAULT_BIAS: f64 = 0.7;
pub const DEFAULT_MAST_TEMPERATURE: f64 = 1.0;
pub const DEFAULT_BLEND_WEIGHT: f32 = 0.5;
pub const MAX_ROLLOUT_TURNS: u32 = 200;
pub const REPETITION_LIMIT: u32 = 5;

/// How long a search may run
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Budget {
    Iterations(u32),
    Time(Duration),
}

/// Tree policy
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Selection {
    /// Expand every child before descending, then UCT
    Uct,
    /// Unexplored children score `urgency` and compete with UCT scores
    Fpu { urgency: f32 },
}

/// Default (rollout) policy
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PolicyKind {
    Uniform,
    Biased { bias: f64 },
    Mast { temperature: f64 },
    LastGoodReply,
}

/// How a freshly expanded leaf gets its value
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LeafEval {
    Rollout,
    /// Static evaluation clamped to [-1, 1] instead of a rollout
    Heuristic,
    /// `weight * heuristic + (1 - weight) * rollout`
    Blend { weight: f32 },
}

/// MCTS configuration
#[derive(Clone, Debug)]
pub struct MctsConfig {
    pub budget: Budget,
    pub exploration: f32,
    pub selection: Selection,
    pub policy: PolicyKind,
    pub leaf: LeafEval,
    pub max_rollout_turns: u32,
    pub repetition_limit: u32,
    pub seed: u64,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self::vanilla(Budget::Iterations(1000))
    }
}

impl MctsConfig {
    /// Plain UCT with uniform rollouts
    pub fn vanilla(budget: Budget) -> Self {
        Self {
            budget,
            exploration: DEFAULT_EXPLORATION,
            selection: Selection::Uct,
            policy: PolicyKind::Uniform,
            leaf: LeafEval::Rollout,
            max_rollout_turns: MAX_ROLLOUT_TURNS,
            repetition_limit: REPETITION_LIMIT,
            seed: 42,
        }
    }

    pub fn fpu(budget: Budget) -> Self {
        Self {
            selection: Selection::Fpu { urgency: DEFAULT_FPU_URGENCY },
            ..Self::vanilla(budget)
        }
    }

    pub fn mast(budget: Budget) -> Self {
        Self {
            policy: PolicyKind::Mast { temperature: DEFAULT_MAST_TEMPERATURE },
            ..Self::vanilla(budget)
        }
    }

    pub fn biased(budget: Budget) -> Self {
        Self {
            policy: PolicyKind::Biased { bias: DEFAULT_BIAS },
            ..Self::vanilla(budget)
        }
    }

    pub fn lgr1(budget: Budget) -> Self {
        Self {
            policy: PolicyKind::LastGoodReply,
            ..Self::vanilla(budget)
        }
    }

    /// Heuristic value instead of a rollout
    pub fn seeded(budget: Budget) -> Self {
        Self {
            leaf: LeafEval::Heuristic,
            ..Self::vanilla(budget)
        }
    }

    /// Heuristic value blended with a rollout
    pub fn weighted_seeded(budget: Budget) -> Self {
        Self {
            leaf: LeafEval::Blend { weight: DEFAULT_BLEND_WEIGHT },
            ..Self::vanilla(budget)
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn label(&self) -> &'static str {
        match (self.selection, self.policy, self.leaf) {
            (Selection::Fpu { .. }, _, _) => "mcts-fpu",
            (_, PolicyKind::Biased { .. }, _) => "mcts-biased",
            (_, PolicyKind::Mast { .. }, _) => "mcts-mast",
            (_, PolicyKind::LastGoodReply, _) => "mcts-lgr1",
            (_, _, LeafEval::Heuristic) => "mcts-seeded",
            (_, _, LeafEval::Blend { .. }) => "mcts-wseeded",
            _ => "mcts",
        }
    }
}

// ============================================================================
// AGENT
// ============================================================================

/// MCTS player
pub struct MctsAgent {
    config: MctsConfig,
    heuristics: Heuristics,
    policy: Box<dyn DefaultPolicy>,
    rng: ChaCha8Rng,
}

impl MctsAgent {
    pub fn new(config: MctsConfig) -> Self {
        Self {
            policy: build_policy(config.policy),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            heuristics: Heuristics::default(),
            config,
        }
    }

    /// Heuristics used by seeded leaf evaluation
    pub fn with_heuristics(mut self, heuristics: Heuristics) -> Self {
        self.heuristics = heuristics;
        self
    }

    pub fn config(&self) -> &MctsConfig {
        &self.config
    }

    /// Run a full search from `board` and return the statistics
    pub fn search(&mut self, board: &Board, turn: Player) -> SearchResult {
        run_search(board, turn, &self.config, &self.heuristics, self.policy.as_mut(), &mut self.rng)
    }
}

impl Agent for MctsAgent {
    fn name(&self) -> String {
        match self.config.budget {
            Budget::Iterations(n) => format!("{}:{n}", self.config.label()),
            Budget::Time(t) => format!("{}:{}ms", self.config.label(), t.as_millis()),
        }
    }

    fn new_game(&mut self, _turn: Player) {
        self.policy.reset();
    }

    fn next_state(&mut self, board: &Board, turn: Player) -> Result<Board, AgentError> {
        let result = self.search(board, turn);

        tracing::debug!(
            agent = %self.name(),
            iterations = result.iterations,
            nodes = result.tree.len(),
            root_moves = result.move_stats.len(),
            elapsed_ms = result.elapsed.as_millis() as u64,
            "mcts search finished"
        );

        result
            .best_move()
            .map(|(_, next)| next)
            .ok_or(AgentError::NoLegalMoves { player: turn })
    }
}

// ============================================================================
// TESTS
// ============================================================================
