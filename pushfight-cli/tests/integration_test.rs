//! Integration tests for the Push Fight engine
//!
//! Tests the full stack: board rules, move generation, alpha-beta and MCTS agents

use pushfight_core::{
    ai::{minimax, AlphaBetaAI, CutoffPolicy},
    eval::{Heuristics, WIN_VALUE},
    movegen::{legal_pushes, legal_slides, next_states, slide_destinations},
    topology::{cells, Cell, Direction, VALID},
    Agent, Board, GameResult, Player, RandomAgent, PIECES_PER_PLAYER,
};
use pushfight_mcts::{Budget, MctsAgent, MctsConfig};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

// ============================================================================
// TEST FIXTURES
// ============================================================================

fn cell(s: &str) -> Cell {
    s.parse().unwrap()
}

/// White shoves b5 along to b6, Black answers by shoving c4 back to c3.
/// No Black piece is left on an edge cell, so White cannot win next turn.
fn opening_exchange() -> Board {
    let mut board = Board::default_setup();
    board.slide(cell("b3"), cell("b4"));
    board.push(cell("b4"), Direction::Right);
    board.slide(cell("c6"), cell("c5"));
    board.push(cell("c5"), Direction::Left);
    board
}

/// Two more pushes leave Black's b7, b8 line hanging over the right edge
fn white_to_win() -> Board {
    let mut board = opening_exchange();
    board.push(cell("b5"), Direction::Right);
    board.push(cell("c4"), Direction::Left);
    board
}

/// White walled in along row d; every push but d3 up loses d2 to the d1 hole
fn sparse_position() -> Board {
    Board::from_cells(
        &[cell("d2"), cell("d4"), cell("d5")],
        &[cell("c4"), cell("d3")],
        &[cell("c2"), cell("c3"), cell("c5")],
        &[cell("b4"), cell("d6")],
    )
    .with_anchor(cell("d6"))
}

/// Independent BFS over `Cell::step` through empty cells
fn reachable_through_empty(board: &Board, from: Cell) -> Vec<Cell> {
    let mut seen = vec![from];
    let mut queue = vec![from];
    while let Some(current) = queue.pop() {
        for dir in Direction::ALL {
            if let Some(next) = current.step(dir) {
                if board.is_empty(next.mask()) && !seen.contains(&next) {
                    seen.push(next);
                    queue.push(next);
                }
            }
        }
    }
    seen.retain(|c| *c != from);
    seen
}

/// Play random turns, handing every position to `check`
fn random_game(seed: u64, max_turns: u32, mut check: impl FnMut(&Board, Player)) -> Board {
    let mut board = Board::default_setup();
    let mut agents = [RandomAgent::new(seed), RandomAgent::new(seed + 1)];
    let mut turn = Player::White;
    for _ in 0..max_turns {
        check(&board, turn);
        if board.check_winner().is_some() {
            break;
        }
        agents[turn.index()].agent_move(&mut board, turn).unwrap();
        turn = turn.opponent();
    }
    board
}

// ============================================================================
// GAME LOGIC TESTS
// ============================================================================

#[test]
fn test_scripted_game_end_to_end() {
    let mut board = Board::default_setup();
    assert!(legal_pushes(&board, Player::White).is_empty());
    assert!(legal_slides(&board, Player::White).len() > 1);
    assert_eq!(board.result(), GameResult::Ongoing);

    // White: slide b3 -> b4, push b5 into b6
    let before = board;
    board.slide(cell("b3"), cell("b4"));
    board.push(cell("b4"), Direction::Right);
    assert!(next_states(&before, Player::White).contains(&board));
    assert_eq!(board.anchor(), Some(cell("b5")));

    // Black: slide c6 -> c5, push c4 back into c3
    let before = board;
    board.slide(cell("c6"), cell("c5"));
    board.push(cell("c5"), Direction::Left);
    assert!(next_states(&before, Player::Black).contains(&board));
    assert_eq!(board.anchor(), Some(cell("c4")));
    assert_eq!(board, opening_exchange());

    // White: push b6, b7 along row b
    let before = board;
    assert_eq!(board.push(cell("b5"), Direction::Right), None);
    assert!(next_states(&before, Player::White).contains(&board));

    // Black: push c3, c2 along row c
    let before = board;
    assert_eq!(board.push(cell("c4"), Direction::Left), None);
    assert!(next_states(&before, Player::Black).contains(&board));
    assert_eq!(board.check_winner(), None);

    // White: b8 goes off the right edge
    let before = board;
    let removed = board.push(cell("b6"), Direction::Right);
    assert_eq!(removed, Some(cell("b8")));
    assert!(next_states(&before, Player::White).contains(&board));

    assert_eq!(board.check_winner(), Some(Player::White));
    assert_eq!(board.result(), GameResult::WhiteWins);
    assert_eq!(board.piece_count(Player::Black), PIECES_PER_PLAYER - 1);
}

#[test]
fn test_piece_count_invariant() {
    for seed in 0..3 {
        random_game(seed, 60, |board, _| {
            match board.check_winner() {
                None => {
                    assert_eq!(board.piece_count(Player::White), PIECES_PER_PLAYER);
                    assert_eq!(board.piece_count(Player::Black), PIECES_PER_PLAYER);
                }
                Some(winner) => {
                    assert_eq!(board.piece_count(winner), PIECES_PER_PLAYER);
                    assert!(board.piece_count(winner.opponent()) < PIECES_PER_PLAYER);
                }
            }
            assert_eq!(board.occupied() & !VALID, 0);
        });
    }
}

#[test]
fn test_slide_reachability() {
    random_game(11, 12, |board, turn| {
        for piece in cells(board.pieces(turn)) {
            let expected = reachable_through_empty(board, piece);
            let got: Vec<Cell> = cells(slide_destinations(board, piece)).collect();
            assert_eq!(got.len(), expected.len());
            for dest in got {
                assert!(board.is_empty(dest.mask()));
                assert!(board.is_valid(dest.mask()));
                assert!(expected.contains(&dest));
            }
        }
    });
}

#[test]
fn test_suicidal_moves_excluded() {
    random_game(5, 20, |board, turn| {
        if board.check_winner().is_some() {
            return;
        }
        for next in next_states(board, turn) {
            assert_eq!(next.piece_count(turn), PIECES_PER_PLAYER);
        }
    });
}

#[test]
fn test_push_determinism_and_round_trip() {
    let board = opening_exchange();
    for push in legal_pushes(&board, Player::White) {
        let mut a = board;
        let mut b = board;
        a.push(push.from, push.dir);
        b.push(push.from, push.dir);
        assert_eq!(a, b);
    }

    let mut b = board;
    let snapshot = b.get_state();
    b.restore_state(&snapshot);
    assert_eq!(b, board);
    b.slide(cell("a4"), cell("a3"));
    assert_eq!(snapshot, board);
}

// ============================================================================
// ALPHA-BETA AI TESTS
// ============================================================================

#[test]
fn test_alphabeta_matches_minimax() {
    let h = Heuristics::default();
    let board = opening_exchange();
    let reference = minimax(&board, 1, Player::White, &h);
    assert!(reference.abs() < WIN_VALUE);

    let mut vanilla = AlphaBetaAI::new(1, h.clone());
    assert_eq!(vanilla.root_value(&board, 1, Player::White), reference);

    let mut scout = AlphaBetaAI::scout(1, h);
    assert_eq!(scout.root_value(&board, 1, Player::White), reference);
}

#[test]
fn test_pruned_searches_match_minimax_at_depth_two() {
    let h = Heuristics::default();
    let board = sparse_position();
    let reference = minimax(&board, 2, Player::White, &h);
    assert!(reference.abs() < WIN_VALUE);

    for policy in [CutoffPolicy::Vanilla, CutoffPolicy::Scout, CutoffPolicy::Stochastic { threshold: 0.0 }] {
        let mut ai = AlphaBetaAI::with_policy(2, h.clone(), policy);
        assert_eq!(ai.root_value(&board, 2, Player::White), reference, "{policy:?}");
    }
}

#[test]
fn test_alphabeta_takes_the_win() {
    let board = white_to_win();
    let mut ai = AlphaBetaAI::new(1, Heuristics::default());
    let next = ai.choose_move(&board, 1, Player::White).unwrap();
    assert_eq!(next.check_winner(), Some(Player::White));
}

#[test]
fn test_stochastic_stays_in_the_top_five() {
    let h = Heuristics::default();
    let board = opening_exchange();
    let mut values: Vec<f32> = next_states(&board, Player::White)
        .iter()
        .map(|s| minimax(s, 0, Player::Black, &h))
        .collect();
    values.sort_by(|a, b| b.partial_cmp(a).unwrap());
    assert!(values[0] < WIN_VALUE);

    for seed in 0..6 {
        let mut ai = AlphaBetaAI::stochastic(1, h.clone()).with_seed(seed);
        let next = ai.choose_move(&board, 1, Player::White).unwrap();
        assert!(minimax(&next, 0, Player::Black, &h) >= values[4]);
    }
}

#[test]
fn test_agents_play_legal_games() {
    let mut board = Board::default_setup();
    let mut white: Box<dyn Agent> = Box::new(AlphaBetaAI::stochastic(1, Heuristics::default()).with_seed(3));
    let mut black: Box<dyn Agent> = Box::new(RandomAgent::new(4));
    white.new_game(Player::White);
    black.new_game(Player::White);

    let mut turn = Player::White;
    for _ in 0..6 {
        if board.check_winner().is_some() {
            break;
        }
        let legal = next_states(&board, turn);
        let agent = match turn {
            Player::White => &mut white,
            Player::Black => &mut black,
        };
        let next = agent.next_state(&board, turn).unwrap();
        assert!(legal.contains(&next));
        board = next;
        turn = turn.opponent();
    }
}

// ============================================================================
// MCTS TESTS
// ============================================================================

#[test]
fn test_mcts_variants_return_legal_states() {
    let board = opening_exchange();
    let legal = next_states(&board, Player::White);
    let budget = Budget::Iterations(20);
    let configs = [
        MctsConfig::vanilla(budget),
        MctsConfig::fpu(budget),
        MctsConfig::mast(budget),
        MctsConfig::biased(budget),
        MctsConfig::lgr1(budget),
        MctsConfig::seeded(budget),
        MctsConfig::weighted_seeded(budget),
    ];
    for config in configs {
        let mut agent = MctsAgent::new(MctsConfig {
            max_rollout_turns: 6,
            ..config
        });
        agent.new_game(Player::White);
        let next = agent.next_state(&board, Player::White).unwrap();
        assert!(legal.contains(&next), "{} returned an illegal state", agent.name());
    }
}

#[test]
fn test_mcts_search_statistics() {
    let board = opening_exchange();
    let mut agent = MctsAgent::new(MctsConfig::seeded(Budget::Iterations(50)));
    let result = agent.search(&board, Player::White);

    assert_eq!(result.iterations, 50);
    assert_eq!(result.tree.total_simulations(), 50);
    assert!(result.tree.len() > 1);
    assert!(result.move_stats.iter().all(|s| (-1.0..=1.0).contains(&s.average)));
}

#[test]
#[ignore = "statistical; runs hundreds of thousands of rollouts"]
fn test_mcts_larger_budget_is_no_worse() {
    let h = Heuristics::default();
    let board = opening_exchange();
    let mut rng = ChaCha8Rng::seed_from_u64(2024);

    // Score each choice by Black's best one-ply reply
    let mut score = |iterations: u32| -> f32 {
        let runs = 8;
        let total: f32 = (0..runs)
            .map(|_| {
                let config = MctsConfig::vanilla(Budget::Iterations(iterations)).with_seed(rng.gen());
                let chosen = MctsAgent::new(config).next_state(&board, Player::White).unwrap();
                minimax(&chosen, 1, Player::Black, &h).clamp(-1.0, 1.0)
            })
            .sum();
        total / runs as f32
    };

    let small = score(1_000);
    let large = score(20_000);
    assert!(large >= small - 0.1, "20000 iterations scored {large}, 1000 scored {small}");
}
