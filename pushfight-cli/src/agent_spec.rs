//! Agent specifications given on the command line
//!
//! Grammar: `<kind>[:<budget>]`, e.g. `random`, `alphabeta:3`, `scout:2`,
//! `mcts:2000`, `mcts-mast:500ms`.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};

use pushfight_core::ai::DEFAULT_THRESHOLD;
use pushfight_core::{Agent, AlphaBetaAI, CutoffPolicy, Heuristics, RandomAgent};
use pushfight_mcts::{Budget, MctsAgent, MctsConfig};

const DEFAULT_DEPTH: u32 = 2;
const DEFAULT_ITERATIONS: u32 = 1000;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MctsVariant {
    Vanilla,
    Fpu,
    Mast,
    Biased,
    Lgr1,
    Seeded,
    WeightedSeeded,
}

impl MctsVariant {
    fn config(self, budget: Budget) -> MctsConfig {
        match self {
            MctsVariant::Vanilla => MctsConfig::vanilla(budget),
            MctsVariant::Fpu => MctsConfig::fpu(budget),
            MctsVariant::Mast => MctsConfig::mast(budget),
            MctsVariant::Biased => MctsConfig::biased(budget),
            MctsVariant::Lgr1 => MctsConfig::lgr1(budget),
            MctsVariant::Seeded => MctsConfig::seeded(budget),
            MctsVariant::WeightedSeeded => MctsConfig::weighted_seeded(budget),
        }
    }
}

/// A parsed agent description
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AgentSpec {
    Random,
    AlphaBeta { policy: CutoffPolicy, depth: u32 },
    Mcts { variant: MctsVariant, budget: Budget },
}

impl AgentSpec {
    /// Instantiate a fresh agent
    pub fn build(&self, heuristics: &Heuristics, seed: u64) -> Box<dyn Agent> {
        match *self {
            AgentSpec::Random => Box::new(RandomAgent::new(seed)),
            AgentSpec::AlphaBeta { policy, depth } => {
                Box::new(AlphaBetaAI::with_policy(depth, heuristics.clone(), policy).with_seed(seed))
            }
            AgentSpec::Mcts { variant, budget } => Box::new(
                MctsAgent::new(variant.config(budget).with_seed(seed)).with_heuristics(heuristics.clone()),
            ),
        }
    }
}

impl FromStr for AgentSpec {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (kind, arg) = match s.split_once(':') {
            Some((kind, arg)) => (kind, Some(arg)),
            None => (s, None),
        };

        let alpha_beta = |policy| -> Result<AgentSpec> {
            let depth = match arg {
                Some(d) => d.parse().with_context(|| format!("bad search depth in '{s}'"))?,
                None => DEFAULT_DEPTH,
            };
            if depth == 0 {
                bail!("search depth must be at least 1 in '{s}'");
            }
            Ok(AgentSpec::AlphaBeta { policy, depth })
        };
        let mcts = |variant| -> Result<AgentSpec> {
            let budget = match arg {
                Some(b) => parse_budget(b).with_context(|| format!("bad MCTS budget in '{s}'"))?,
                None => Budget::Iterations(DEFAULT_ITERATIONS),
            };
            Ok(AgentSpec::Mcts { variant, budget })
        };

        match kind {
            "random" => Ok(AgentSpec::Random),
            "alphabeta" => alpha_beta(CutoffPolicy::Vanilla),
            "stochastic" => alpha_beta(CutoffPolicy::Stochastic { threshold: DEFAULT_THRESHOLD }),
            "scout" => alpha_beta(CutoffPolicy::Scout),
            "mcts" => mcts(MctsVariant::Vanilla),
            "mcts-fpu" => mcts(MctsVariant::Fpu),
            "mcts-mast" => mcts(MctsVariant::Mast),
            "mcts-biased" => mcts(MctsVariant::Biased),
            "mcts-lgr1" => mcts(MctsVariant::Lgr1),
            "mcts-seeded" => mcts(MctsVariant::Seeded),
            "mcts-wseeded" => mcts(MctsVariant::WeightedSeeded),
            other => Err(anyhow!("unknown agent kind '{other}'")),
        }
    }
}

impl fmt::Display for AgentSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.build(&Heuristics::default(), 0).name();
        f.write_str(&name)
    }
}

/// `500` = iterations, `250ms` / `2s` = wall-clock time
fn parse_budget(text: &str) -> Result<Budget> {
    if let Some(ms) = text.strip_suffix("ms") {
        return Ok(Budget::Time(Duration::from_millis(ms.parse()?)));
    }
    if let Some(secs) = text.strip_suffix('s') {
        return Ok(Budget::Time(Duration::try_from_secs_f64(secs.parse()?)?));
    }
    let iterations: u32 = text.parse()?;
    if iterations == 0 {
        bail!("iteration budget must be positive");
    }
    Ok(Budget::Iterations(iterations))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_alpha_beta() {
        assert_eq!(
            "alphabeta:3".parse::<AgentSpec>().unwrap(),
            AgentSpec::AlphaBeta { policy: CutoffPolicy::Vanilla, depth: 3 }
        );
        assert_eq!(
            "scout".parse::<AgentSpec>().unwrap(),
            AgentSpec::AlphaBeta { policy: CutoffPolicy::Scout, depth: DEFAULT_DEPTH }
        );
        assert!(matches!(
            "stochastic:1".parse::<AgentSpec>().unwrap(),
            AgentSpec::AlphaBeta { policy: CutoffPolicy::Stochastic { .. }, depth: 1 }
        ));
    }

    #[test]
    fn test_parse_mcts_budgets() {
        assert_eq!(
            "mcts-mast:500".parse::<AgentSpec>().unwrap(),
            AgentSpec::Mcts { variant: MctsVariant::Mast, budget: Budget::Iterations(500) }
        );
        assert_eq!(
            "mcts-fpu:250ms".parse::<AgentSpec>().unwrap(),
            AgentSpec::Mcts { variant: MctsVariant::Fpu, budget: Budget::Time(Duration::from_millis(250)) }
        );
        assert_eq!(
            "mcts-wseeded:2s".parse::<AgentSpec>().unwrap(),
            AgentSpec::Mcts { variant: MctsVariant::WeightedSeeded, budget: Budget::Time(Duration::from_secs(2)) }
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!("minimax:3".parse::<AgentSpec>().is_err());
        assert!("alphabeta:0".parse::<AgentSpec>().is_err());
        assert!("alphabeta:deep".parse::<AgentSpec>().is_err());
        assert!("mcts:0".parse::<AgentSpec>().is_err());
        assert!("mcts:fast".parse::<AgentSpec>().is_err());
    }

    #[test]
    fn test_display_uses_agent_name() {
        assert_eq!("random".parse::<AgentSpec>().unwrap().to_string(), "random");
        assert_eq!("scout:3".parse::<AgentSpec>().unwrap().to_string(), "scout:3");
        assert_eq!("mcts-lgr1:800".parse::<AgentSpec>().unwrap().to_string(), "mcts-lgr1:800");
    }
}
