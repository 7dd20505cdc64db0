//! Push Fight CLI - Command-line interface
//!
//! Commands:
//! - match: Play a series of games between two agents

mod agent_spec;
mod match_cmd;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::match_cmd::MatchArgs;

#[derive(Parser)]
#[command(name = "pushfight")]
#[command(about = "Push Fight engine: pit search agents against each other")]
struct Cli {
    /// Base RNG seed; games are reproducible when set
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a match between two agents
    Match(MatchArgs),
}

fn main() -> anyhow::Result<()> {
    // Initialize logging; RUST_LOG overrides the default level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Match(args) => match_cmd::run(args, cli.seed),
    }
}
