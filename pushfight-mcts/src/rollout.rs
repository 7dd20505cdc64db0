//! Rollout (simulation) strategies for MCTS
//!
//! A rollout plays a position out with a default policy until someone loses a
//! piece, a board repeats too often, or the turn cap is hit.
//!
//! ## Architecture
//! - Level 2: `simulate` - the rollout loop
//! - Level 3: `DefaultPolicy` implementations (uniform, biased, MAST, LGR1)
//! - Level 4: Move-table bookkeeping

use rand::distributions::WeightedIndex;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rustc_hash::FxHashMap;

use pushfight_core::{next_moves, Board, Player, TurnMove, BORDER};

use crate::tree::EdgeStats;
use crate::PolicyKind;

/// A move played during a simulation, tagged with who played it
pub type PlayedMove = (Player, TurnMove);

// ============================================================================
// ROLLOUT RESULT
// ============================================================================

/// Result of a rollout simulation
#[derive(Clone, Debug)]
pub struct RolloutResult {
    /// +1 White win, -1 Black win, 0 tie
    pub reward: f32,
    /// Number of turns played
    pub turns: u32,
    /// Every move of the rollout, in order
    pub history: Vec<PlayedMove>,
}

/// Stopping rules for a rollout
#[derive(Clone, Copy, Debug)]
pub struct RolloutLimits {
    pub max_turns: u32,
    /// A board seen this many times ends the rollout in a tie
    pub repetition_limit: u32,
}

// ============================================================================
// ROLLOUT LOOP (Level 2)
// ============================================================================

/// Play `board` out from `turn` with `policy`.
///
/// `previous` is the move that led to `board`, if known; reply-based policies
/// use it for their first choice. The side to move loses when it has no
/// legal move.
pub fn simulate(
    board: &Board,
    turn: Player,
    previous: Option<TurnMove>,
    policy: &mut dyn DefaultPolicy,
    limits: RolloutLimits,
    rng: &mut ChaCha8Rng,
) -> RolloutResult {
    let mut current = *board;
    let mut turn = turn;
    let mut previous = previous;
    let mut history = Vec::new();
    let mut seen: FxHashMap<Board, u32> = FxHashMap::default();
    let mut turns = 0;

    let reward = loop {
        if let Some(winner) = current.check_winner() {
            break winner.sign();
        }

        let count = seen.entry(current).or_insert(0);
        *count += 1;
        if *count >= limits.repetition_limit || turns >= limits.max_turns {
            break 0.0;
        }

        let moves = next_moves(&current, turn);
        if moves.is_empty() {
            break -turn.sign();
        }

        let (mv, next) = moves[policy.choose(&current, turn, &moves, previous, rng)];
        history.push((turn, mv));
        current = next;
        previous = Some(mv);
        turn = turn.opponent();
        turns += 1;
    };

    RolloutResult { reward, turns, history }
}

// ============================================================================
// DEFAULT POLICIES (Level 3)
// ============================================================================

/// Chooses moves during rollouts and learns from finished simulations
pub trait DefaultPolicy {
    /// Index into `moves` of the move to play
    fn choose(
        &mut self,
        board: &Board,
        turn: Player,
        moves: &[(TurnMove, Board)],
        previous: Option<TurnMove>,
        rng: &mut ChaCha8Rng,
    ) -> usize;

    /// Learn from one simulation: its full move history (tree part included)
    /// and the reward it ended with.
    fn record(&mut self, _history: &[PlayedMove], _reward: f32) {}

    /// Forget anything learned; called at the start of each game
    fn reset(&mut self) {}
}

/// Build the policy a config asks for
pub fn build_policy(kind: PolicyKind) -> Box<dyn DefaultPolicy> {
    match kind {
        PolicyKind::Uniform => Box::new(UniformPolicy),
        PolicyKind::Biased { bias } => Box::new(BiasedPolicy { bias }),
        PolicyKind::Mast { temperature } => Box::new(MastPolicy::new(temperature)),
        PolicyKind::LastGoodReply => Box::new(LastGoodReply::default()),
    }
}

/// Uniform random policy - all moves equally likely
#[derive(Clone, Copy, Debug, Default)]
pub struct UniformPolicy;

impl DefaultPolicy for UniformPolicy {
    fn choose(
        &mut self,
        _board: &Board,
        _turn: Player,
        moves: &[(TurnMove, Board)],
        _previous: Option<TurnMove>,
        rng: &mut ChaCha8Rng,
    ) -> usize {
        rng.gen_range(0..moves.len())
    }
}

/// Heavy playout policy
///
/// Always takes a winning push when there is one. Otherwise, with probability
/// `bias`, plays a move that leaves the fewest own pieces on the board's edge
/// cells; the rest of the time it plays uniformly.
#[derive(Clone, Copy, Debug)]
pub struct BiasedPolicy {
    pub bias: f64,
}

impl DefaultPolicy for BiasedPolicy {
    fn choose(
        &mut self,
        _board: &Board,
        turn: Player,
        moves: &[(TurnMove, Board)],
        _previous: Option<TurnMove>,
        rng: &mut ChaCha8Rng,
    ) -> usize {
        if let Some(winning) = moves.iter().position(|(_, b)| b.check_winner() == Some(turn)) {
            return winning;
        }

        if rng.gen_bool(self.bias.clamp(0.0, 1.0)) {
            let exposure = |b: &Board| (b.pieces(turn) & BORDER).count_ones();
            let safest = moves.iter().map(|(_, b)| exposure(b)).min().unwrap_or(0);
            let safe: Vec<usize> = (0..moves.len()).filter(|&i| exposure(&moves[i].1) == safest).collect();
            if let Some(&choice) = safe.choose(rng) {
                return choice;
            }
        }

        rng.gen_range(0..moves.len())
    }
}

/// Move-Average Sampling Technique
///
/// Keeps a global table of average reward per (player, move). Moves never seen
/// before are tried first; otherwise moves are drawn with Gibbs weights
/// `exp(sign * avg / temperature)`.
#[derive(Clone, Debug)]
pub struct MastPolicy {
    pub temperature: f64,
    table: FxHashMap<PlayedMove, EdgeStats>,
}

impl MastPolicy {
    pub fn new(temperature: f64) -> Self {
        Self {
            temperature,
            table: FxHashMap::default(),
        }
    }

    pub fn stats(&self, turn: Player, mv: TurnMove) -> Option<EdgeStats> {
        self.table.get(&(turn, mv)).copied()
    }
}

impl DefaultPolicy for MastPolicy {
    fn choose(
        &mut self,
        _board: &Board,
        turn: Player,
        moves: &[(TurnMove, Board)],
        _previous: Option<TurnMove>,
        rng: &mut ChaCha8Rng,
    ) -> usize {
        let unseen: Vec<usize> = (0..moves.len())
            .filter(|&i| !self.table.contains_key(&(turn, moves[i].0)))
            .collect();
        if let Some(&choice) = unseen.choose(rng) {
            return choice;
        }

        let sign = turn.sign() as f64;
        let weights: Vec<f64> = moves
            .iter()
            .map(|(mv, _)| {
                let avg = self.table.get(&(turn, *mv)).map_or(0.0, |s| s.average() as f64);
                (sign * avg / self.temperature).exp()
            })
            .collect();

        match WeightedIndex::new(&weights) {
            Ok(dist) => dist.sample(rng),
            Err(_) => rng.gen_range(0..moves.len()),
        }
    }

    fn record(&mut self, history: &[PlayedMove], reward: f32) {
        for played in history {
            self.table.entry(*played).or_default().record(reward);
        }
    }

    fn reset(&mut self) {
        self.table.clear();
    }
}

/// Last-Good-Reply (LGR-1)
///
/// Each player remembers, per opponent move, the reply it played in the most
/// recent simulation it won. That reply is replayed whenever it is legal.
#[derive(Clone, Debug, Default)]
pub struct LastGoodReply {
    replies: [FxHashMap<TurnMove, TurnMove>; 2],
}

impl LastGoodReply {
    pub fn reply(&self, turn: Player, previous: TurnMove) -> Option<TurnMove> {
        self.replies[turn.index()].get(&previous).copied()
    }
}

impl DefaultPolicy for LastGoodReply {
    fn choose(
        &mut self,
        _board: &Board,
        turn: Player,
        moves: &[(TurnMove, Board)],
        previous: Option<TurnMove>,
        rng: &mut ChaCha8Rng,
    ) -> usize {
        let remembered = previous
            .and_then(|prev| self.reply(turn, prev))
            .and_then(|reply| moves.iter().position(|(mv, _)| *mv == reply));
        remembered.unwrap_or_else(|| rng.gen_range(0..moves.len()))
    }

    fn record(&mut self, history: &[PlayedMove], reward: f32) {
        let winner = if reward > 0.0 {
            Player::White
        } else if reward < 0.0 {
            Player::Black
        } else {
            return;
        };
        for pair in history.windows(2) {
            let (_, prev) = pair[0];
            let (player, reply) = pair[1];
            if player == winner {
                self.replies[winner.index()].insert(prev, reply);
            }
        }
    }

    fn reset(&mut self) {
        for table in &mut self.replies {
            table.clear();
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pushfight_core::Cell;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(42)
    }

    fn cells_of(list: &[&str]) -> Vec<Cell> {
        list.iter().map(|s| s.parse().unwrap()).collect()
    }

    /// White can knock c8 off the right edge this turn
    fn winning_position() -> Board {
        Board::from_cells(
            &cells_of(&["a3", "a4", "a5", "d2"]),
            &cells_of(&["c6"]),
            &cells_of(&["c7", "d4", "d5", "a7"]),
            &cells_of(&["c8"]),
        )
    }

    fn limits(max_turns: u32) -> RolloutLimits {
        RolloutLimits { max_turns, repetition_limit: 5 }
    }

    #[test]
    fn test_turn_cap_is_a_tie() {
        let board = Board::default_setup();
        let result = simulate(&board, Player::White, None, &mut UniformPolicy, limits(0), &mut rng());
        assert_eq!(result.reward, 0.0);
        assert_eq!(result.turns, 0);
        assert!(result.history.is_empty());
    }

    #[test]
    fn test_repetition_is_a_tie() {
        let board = Board::default_setup();
        let tight = RolloutLimits { max_turns: 200, repetition_limit: 1 };
        let result = simulate(&board, Player::White, None, &mut UniformPolicy, tight, &mut rng());
        assert_eq!(result.reward, 0.0);
    }

    #[test]
    fn test_uniform_rollout_finishes() {
        let board = Board::default_setup();
        let result = simulate(&board, Player::White, None, &mut UniformPolicy, limits(6), &mut rng());
        assert!(result.turns <= 6);
        assert_eq!(result.history.len(), result.turns as usize);
        assert!([-1.0, 0.0, 1.0].contains(&result.reward));
        assert_eq!(result.history.first().map(|(p, _)| *p), Some(Player::White));
    }

    #[test]
    fn test_biased_policy_takes_the_win() {
        let board = winning_position();
        let mut policy = BiasedPolicy { bias: 0.7 };
        let result = simulate(&board, Player::White, None, &mut policy, limits(10), &mut rng());
        assert_eq!(result.reward, 1.0);
        assert_eq!(result.turns, 1);
    }

    #[test]
    fn test_biased_policy_prefers_safe_moves() {
        // Nothing is won from the opening, so every pick must be a safest move
        let board = Board::default_setup();
        let moves = next_moves(&board, Player::White);
        assert!(moves.iter().all(|(_, b)| b.check_winner().is_none()));
        let exposure = |b: &Board| (b.pieces(Player::White) & BORDER).count_ones();
        let safest = moves.iter().map(|(_, b)| exposure(b)).min().unwrap();

        let mut policy = BiasedPolicy { bias: 1.0 };
        let mut r = rng();
        for _ in 0..10 {
            let i = policy.choose(&board, Player::White, &moves, None, &mut r);
            assert_eq!(exposure(&moves[i].1), safest);
        }
    }

    #[test]
    fn test_biased_policy_win_beats_safety() {
        let board = winning_position();
        let moves = next_moves(&board, Player::White);
        let mut policy = BiasedPolicy { bias: 1.0 };
        let mut r = rng();
        for _ in 0..10 {
            let i = policy.choose(&board, Player::White, &moves, None, &mut r);
            assert_eq!(moves[i].1.check_winner(), Some(Player::White));
        }
    }

    #[test]
    fn test_mast_tries_unseen_moves_first() {
        let board = Board::default_setup();
        let moves = next_moves(&board, Player::White);
        let mut policy = MastPolicy::new(1.0);
        policy.record(&[(Player::White, moves[0].0)], 1.0);

        let pair = [moves[0], moves[1]];
        let mut r = rng();
        for _ in 0..10 {
            assert_eq!(policy.choose(&board, Player::White, &pair, None, &mut r), 1);
        }

        assert_eq!(policy.stats(Player::White, moves[0].0).map(|s| s.plays), Some(1));
        policy.reset();
        assert!(policy.stats(Player::White, moves[0].0).is_none());
    }

    #[test]
    fn test_mast_favours_rewarded_moves() {
        let board = Board::default_setup();
        let moves = next_moves(&board, Player::White);
        let pair = [moves[0], moves[1]];
        let mut policy = MastPolicy::new(0.1);
        for _ in 0..5 {
            policy.record(&[(Player::White, moves[0].0)], 1.0);
            policy.record(&[(Player::White, moves[1].0)], -1.0);
        }

        let mut r = rng();
        let picks = (0..50)
            .filter(|_| policy.choose(&board, Player::White, &pair, None, &mut r) == 0)
            .count();
        assert!(picks > 45);
    }

    #[test]
    fn test_lgr_replays_winning_reply() {
        let board = Board::default_setup();
        let white_moves = next_moves(&board, Player::White);
        let opening = white_moves[0];
        let black_moves = next_moves(&opening.1, Player::Black);
        let reply = black_moves[black_moves.len() / 2].0;

        let mut policy = LastGoodReply::default();
        policy.record(&[(Player::White, opening.0), (Player::Black, reply)], -1.0);
        assert_eq!(policy.reply(Player::Black, opening.0), Some(reply));
        assert_eq!(policy.reply(Player::White, opening.0), None);

        let i = policy.choose(&opening.1, Player::Black, &black_moves, Some(opening.0), &mut rng());
        assert_eq!(black_moves[i].0, reply);

        policy.reset();
        assert_eq!(policy.reply(Player::Black, opening.0), None);
    }

    #[test]
    fn test_lgr_ignores_ties() {
        let board = Board::default_setup();
        let moves = next_moves(&board, Player::White);
        let mut policy = LastGoodReply::default();
        policy.record(&[(Player::White, moves[0].0), (Player::Black, moves[1].0)], 0.0);
        assert_eq!(policy.reply(Player::Black, moves[0].0), None);
    }
}
