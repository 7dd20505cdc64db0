//! Match command - play games between two agents
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run() - orchestration
//! - Level 2: load_heuristics(), play_match(), report_results()
//! - Level 3: play_single_game(), compute_match_statistics()
//! - Level 4: formatting utilities

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;

use pushfight_core::{Agent, Board, GameResult, Heuristics, Player};

use crate::agent_spec::AgentSpec;

// ============================================================================
// COMMAND ARGUMENTS (Level 4 - Configuration)
// ============================================================================

#[derive(Args)]
pub struct MatchArgs {
    /// First agent, e.g. `alphabeta:2`, `mcts-mast:500`, `random`
    #[arg(long, value_name = "SPEC")]
    pub white: AgentSpec,

    /// Second agent
    #[arg(long, value_name = "SPEC")]
    pub black: AgentSpec,

    /// Number of games to play (will alternate colors)
    #[arg(long, default_value = "10")]
    pub games: usize,

    /// Turns after which a game is scored as a draw
    #[arg(long, default_value = "200")]
    pub max_turns: u32,

    /// Heuristic weights JSON file (object or bare weight array)
    #[arg(long, value_name = "FILE")]
    pub heuristics: Option<PathBuf>,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

/// Result of a single game
#[derive(Clone, Debug)]
pub struct GameRecord {
    pub game_number: usize,
    pub result: GameResult,
    pub turns: u32,
    /// Whether the `--white` agent played White in this game
    pub first_agent_was_white: bool,
}

impl GameRecord {
    /// Did the `--white` agent win?
    fn first_agent_won(&self) -> bool {
        match self.result.winner() {
            Some(Player::White) => self.first_agent_was_white,
            Some(Player::Black) => !self.first_agent_was_white,
            None => false,
        }
    }
}

/// Aggregated match results
#[derive(Clone, Debug)]
pub struct MatchResults {
    pub games: Vec<GameRecord>,
    pub white_wins: usize,
    pub black_wins: usize,
    pub draws: usize,
    pub first_agent_wins: usize,
    pub second_agent_wins: usize,
    pub avg_turns: f32,
}

/// Fixed inputs shared by every game in a match
struct MatchSetup<'a> {
    first: AgentSpec,
    second: AgentSpec,
    heuristics: &'a Heuristics,
    max_turns: u32,
    base_seed: u64,
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

/// Run match command
///
/// This function reads like a table of contents:
/// 1. Load heuristics
/// 2. Play the match (games in parallel)
/// 3. Report results
pub fn run(args: MatchArgs, seed: Option<u64>) -> Result<()> {
    let heuristics = load_heuristics(&args)?;
    let started_at = Utc::now();

    tracing::info!(
        "Starting match: {} vs {} ({} games, max {} turns)",
        args.white,
        args.black,
        args.games,
        args.max_turns
    );

    let setup = MatchSetup {
        first: args.white,
        second: args.black,
        heuristics: &heuristics,
        max_turns: args.max_turns,
        base_seed: seed.unwrap_or_else(rand::random),
    };
    let results = play_match(&setup, args.games, !args.json)?;

    report_results(&results, &args, started_at);

    Ok(())
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

fn load_heuristics(args: &MatchArgs) -> Result<Heuristics> {
    match &args.heuristics {
        Some(path) => Heuristics::load(path)
            .with_context(|| format!("Failed to load heuristics: {}", path.display())),
        None => Ok(Heuristics::default()),
    }
}

/// Play all games in the match, in parallel
fn play_match(setup: &MatchSetup<'_>, games: usize, show_progress: bool) -> Result<MatchResults> {
    let progress = if show_progress {
        let bar = ProgressBar::new(games as u64);
        bar.set_style(ProgressStyle::with_template("{bar:40} {pos}/{len} games [{elapsed_precise}]")?);
        bar
    } else {
        ProgressBar::hidden()
    };

    let records = (0..games)
        .into_par_iter()
        .map(|index| {
            let record = play_single_game(setup, index)?;
            tracing::info!(
                "Game {}: {:?} ({} turns)",
                record.game_number,
                record.result,
                record.turns
            );
            progress.inc(1);
            Ok(record)
        })
        .collect::<Result<Vec<_>>>()?;

    progress.finish_and_clear();
    Ok(compute_match_statistics(records))
}

/// Report match results
fn report_results(results: &MatchResults, args: &MatchArgs, started_at: DateTime<Utc>) {
    if args.json {
        print_json_results(results, args, started_at);
    } else {
        print_text_results(results, args);
    }
}

// ============================================================================
// LEVEL 3 - STEPS
// ============================================================================

/// Play one game from the standard opening. Odd games swap colours.
fn play_single_game(setup: &MatchSetup<'_>, index: usize) -> Result<GameRecord> {
    let first_agent_was_white = index % 2 == 0;
    let (white_spec, black_spec) = if first_agent_was_white {
        (setup.first, setup.second)
    } else {
        (setup.second, setup.first)
    };

    let seed = setup.base_seed.wrapping_add(2 * index as u64);
    let white = white_spec.build(setup.heuristics, seed);
    let black = black_spec.build(setup.heuristics, seed.wrapping_add(1));

    let (result, turns) = play_game(white, black, setup.max_turns)
        .with_context(|| format!("game {} aborted", index + 1))?;

    Ok(GameRecord {
        game_number: index + 1,
        result,
        turns,
        first_agent_was_white,
    })
}

/// Alternate turns until someone loses a piece or the turn cap is reached.
///
/// Returns the result (`Ongoing` for a capped game) and the number of turns played.
pub fn play_game(mut white: Box<dyn Agent>, mut black: Box<dyn Agent>, max_turns: u32) -> Result<(GameResult, u32)> {
    let mut board = Board::default_setup();
    let mut turn = Player::White;
    let mut turns = 0;

    white.new_game(turn);
    black.new_game(turn);

    while board.check_winner().is_none() && turns < max_turns {
        let agent = match turn {
            Player::White => &mut white,
            Player::Black => &mut black,
        };
        agent
            .agent_move(&mut board, turn)
            .with_context(|| format!("{} could not move on turn {}", agent.name(), turns + 1))?;
        tracing::debug!(turn = turns + 1, player = ?turn, anchor = ?board.anchor(), "turn played");
        turn = turn.opponent();
        turns += 1;
    }

    Ok((board.result(), turns))
}

/// Compute aggregate statistics from game records
pub fn compute_match_statistics(games: Vec<GameRecord>) -> MatchResults {
    let count = |result: GameResult| games.iter().filter(|g| g.result == result).count();
    let white_wins = count(GameResult::WhiteWins);
    let black_wins = count(GameResult::BlackWins);
    let draws = count(GameResult::Ongoing);

    let first_agent_wins = games.iter().filter(|g| g.first_agent_won()).count();
    let second_agent_wins = white_wins + black_wins - first_agent_wins;

    let total_turns: u32 = games.iter().map(|g| g.turns).sum();
    let avg_turns = if games.is_empty() {
        0.0
    } else {
        total_turns as f32 / games.len() as f32
    };

    MatchResults {
        games,
        white_wins,
        black_wins,
        draws,
        first_agent_wins,
        second_agent_wins,
        avg_turns,
    }
}

// ============================================================================
// LEVEL 4 - UTILITIES
// ============================================================================

fn percent(part: usize, total: usize) -> f32 {
    if total > 0 {
        part as f32 / total as f32 * 100.0
    } else {
        0.0
    }
}

/// Print results as JSON
fn print_json_results(results: &MatchResults, args: &MatchArgs, started_at: DateTime<Utc>) {
    #[derive(serde::Serialize)]
    struct JsonGame {
        game_number: usize,
        result: String,
        turns: u32,
        white: String,
        black: String,
    }

    #[derive(serde::Serialize)]
    struct JsonOutput {
        started_at: DateTime<Utc>,
        first_agent: String,
        second_agent: String,
        total_games: usize,
        white_wins: usize,
        black_wins: usize,
        draws: usize,
        first_agent_wins: usize,
        second_agent_wins: usize,
        avg_turns: f32,
        games: Vec<JsonGame>,
    }

    let (first, second) = (args.white.to_string(), args.black.to_string());
    let output = JsonOutput {
        started_at,
        first_agent: first.clone(),
        second_agent: second.clone(),
        total_games: results.games.len(),
        white_wins: results.white_wins,
        black_wins: results.black_wins,
        draws: results.draws,
        first_agent_wins: results.first_agent_wins,
        second_agent_wins: results.second_agent_wins,
        avg_turns: results.avg_turns,
        games: results
            .games
            .iter()
            .map(|g| {
                let (white, black) = if g.first_agent_was_white {
                    (first.clone(), second.clone())
                } else {
                    (second.clone(), first.clone())
                };
                JsonGame {
                    game_number: g.game_number,
                    result: format!("{:?}", g.result),
                    turns: g.turns,
                    white,
                    black,
                }
            })
            .collect(),
    };

    if let Ok(json) = serde_json::to_string_pretty(&output) {
        println!("{}", json);
    }
}

/// Print results as text
fn print_text_results(results: &MatchResults, args: &MatchArgs) {
    let total = results.games.len();

    println!("\n=== Match Results ===");
    println!("Total games: {}", total);
    println!(
        "{:<12} {} ({:.1}%)",
        format!("{}:", args.white),
        results.first_agent_wins,
        percent(results.first_agent_wins, total)
    );
    println!(
        "{:<12} {} ({:.1}%)",
        format!("{}:", args.black),
        results.second_agent_wins,
        percent(results.second_agent_wins, total)
    );
    println!("Draws:       {} ({:.1}%)", results.draws, percent(results.draws, total));
    println!("White wins:  {} ({:.1}%)", results.white_wins, percent(results.white_wins, total));
    println!("Black wins:  {} ({:.1}%)", results.black_wins, percent(results.black_wins, total));
    println!("Avg turns:   {:.1}", results.avg_turns);

    println!("\nGame details:");
    for game in &results.games {
        println!("  Game {}: {:?} in {} turns", game.game_number, game.result, game.turns);
    }
}

// ============================================================================
// TESTS
// ============================================================================
