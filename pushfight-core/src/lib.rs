//! Push Fight Core - Game engine and AI
//!
//! This crate provides the core game logic for Push Fight:
//! - Board geometry (4x8 bitboard with holes and rails)
//! - Board state, slides and pushes
//! - Turn-level move generation with deduplication
//! - Position evaluation with tunable heuristics
//! - CPU-based alpha-beta AI (vanilla, stochastic, scout)

pub mod topology;
pub mod board;
pub mod movegen;
pub mod eval;
pub mod agent;
pub mod ai;

// Re-exports for convenient access
pub use topology::{Cell, CellParseError, Direction, BORDER, NUM_CELLS, NUM_VALID, VALID};
pub use board::{Board, GameResult, Player, PIECES_PER_PLAYER};
pub use movegen::{next_moves, next_states, Push, Slide, TurnMove};
pub use eval::{evaluate, evaluate_with_depth, Heuristics, HeuristicsError, NORMALIZER, WIN_VALUE};
pub use agent::{Agent, AgentError, RandomAgent};
pub use ai::{minimax, AlphaBetaAI, CutoffPolicy};
