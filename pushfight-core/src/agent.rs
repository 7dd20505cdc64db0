//! The contract every game-playing agent implements

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

use crate::board::{Board, Player};
use crate::movegen::next_states;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AgentError {
    /// The move generator produced nothing. Push Fight always leaves a push
    /// available in a live game, so this means a broken invariant upstream.
    #[error("{player:?} has no legal move")]
    NoLegalMoves { player: Player },
}

/// A move-choosing strategy, driven one turn at a time by a game driver.
pub trait Agent {
    /// Short label for logs and reports
    fn name(&self) -> String;

    /// Reset any per-game state (reply tables, move statistics, ...)
    fn new_game(&mut self, _turn: Player) {}

    /// Pick the board that results from `turn` playing on `board`.
    /// The caller's board is never touched.
    fn next_state(&mut self, board: &Board, turn: Player) -> Result<Board, AgentError>;

    /// Play a turn in place
    fn agent_move(&mut self, board: &mut Board, turn: Player) -> Result<(), AgentError> {
        let next = self.next_state(board, turn)?;
        board.restore_state(&next);
        Ok(())
    }
}

/// Picks uniformly among all reachable boards
pub struct RandomAgent {
    rng: ChaCha8Rng,
}

impl RandomAgent {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl Agent for RandomAgent {
    fn name(&self) -> String {
        "random".to_string()
    }

    fn next_state(&mut self, board: &Board, turn: Player) -> Result<Board, AgentError> {
        next_states(board, turn)
            .choose(&mut self.rng)
            .copied()
            .ok_or(AgentError::NoLegalMoves { player: turn })
    }
}
