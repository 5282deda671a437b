//! Match runner for the ludus search agents.
//!
//! Pits two agents against each other on one of the reference games, plays
//! the games in parallel and prints a JSON summary of the results.

mod arena;

use anyhow::{bail, Context, Result};
use arena::{build_player, play_game, AgentKind, GameOutcome};
use clap::{Parser, Subcommand, ValueEnum};
use ludus_core::{PlayerId, StochasticGame};
use ludus_mcts::{
    games::{Pig, TicTacToe},
    Budget, MctsConfig,
};
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Search agent match runner.
#[derive(Parser)]
#[command(name = "ludus-selfplay")]
#[command(about = "Play matches between search agents on the reference games")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a match between two agents.
    Match {
        /// Game to play.
        #[arg(long, value_enum, default_value = "tictactoe")]
        game: GameKind,

        /// Number of games to play.
        #[arg(short, long, default_value = "10")]
        games: usize,

        /// Agent of the first entrant.
        #[arg(long, value_enum, default_value = "uct")]
        first: AgentKind,

        /// Agent of the second entrant.
        #[arg(long, value_enum, default_value = "random")]
        second: AgentKind,

        /// Search iterations per move (overrides the config file budget).
        #[arg(short, long)]
        iterations: Option<usize>,

        /// Random seed for reproducibility.
        #[arg(long, default_value = "42")]
        seed: u64,

        /// YAML file with search settings.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Worker threads (defaults to one per core).
        #[arg(short, long)]
        threads: Option<usize>,

        /// Games still running after this many plies count as unfinished.
        #[arg(long, default_value = "500")]
        max_plies: usize,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
enum GameKind {
    Tictactoe,
    Pig,
}

/// Everything one match needs besides the game itself.
#[derive(Clone, Debug)]
struct MatchSettings {
    games: usize,
    first: AgentKind,
    second: AgentKind,
    seed: u64,
    max_plies: usize,
    config: MctsConfig,
}

/// Match results, printed as JSON.
#[derive(Debug, Serialize)]
struct MatchSummary {
    game: GameKind,
    first: AgentKind,
    second: AgentKind,
    games: usize,
    first_wins: usize,
    second_wins: usize,
    draws: usize,
    /// Games stopped by the ply limit, also counted as draws.
    unfinished: usize,
    mean_plies: f64,
    elapsed_ms: u64,
    config: MctsConfig,
}

/// Load the search config from `path` (or defaults) and apply flag overrides.
fn load_config(path: Option<&Path>, iterations: Option<usize>) -> Result<MctsConfig> {
    let mut config = match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            serde_yaml::from_str(&text)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        }
        None => MctsConfig::default(),
    };
    if let Some(iterations) = iterations {
        config.budget = Budget::Iterations(iterations);
    }
    config.validate().context("Invalid search configuration")?;
    Ok(config)
}

/// Play all games of a match in parallel. Entrants swap seats every game.
fn run_match<G>(game: &G, settings: &MatchSettings) -> Result<Vec<(usize, GameOutcome)>>
where
    G: StochasticGame + 'static,
{
    (0..settings.games)
        .into_par_iter()
        .map(|i| -> Result<(usize, GameOutcome)> {
            let game_seed = settings.seed.wrapping_add(i as u64 * 1000);
            // Seat of the first entrant in this game
            let first_seat = i % 2;
            let (seat0, seat1) = if first_seat == 0 {
                (settings.first, settings.second)
            } else {
                (settings.second, settings.first)
            };
            let mut seats = [
                build_player(seat0, &settings.config, game_seed.wrapping_add(1)),
                build_player(seat1, &settings.config, game_seed.wrapping_add(2)),
            ];

            let outcome = play_game(game, &mut seats, settings.max_plies, game_seed)
                .with_context(|| format!("Game {} failed", i))?;
            info!(
                game = i,
                plies = outcome.plies,
                winner = ?outcome.winner,
                "game finished"
            );
            Ok((first_seat, outcome))
        })
        .collect()
}

fn summarize(
    game: GameKind,
    settings: &MatchSettings,
    results: &[(usize, GameOutcome)],
    elapsed_ms: u64,
) -> MatchSummary {
    let mut first_wins = 0;
    let mut second_wins = 0;
    let mut draws = 0;
    let mut unfinished = 0;

    for (first_seat, outcome) in results {
        if !outcome.finished {
            unfinished += 1;
        }
        match outcome.winner {
            Some(PlayerId(seat)) if seat as usize == *first_seat => first_wins += 1,
            Some(_) => second_wins += 1,
            None => draws += 1,
        }
    }

    let total_plies: usize = results.iter().map(|(_, o)| o.plies).sum();
    let mean_plies = if results.is_empty() {
        0.0
    } else {
        total_plies as f64 / results.len() as f64
    };

    MatchSummary {
        game,
        first: settings.first,
        second: settings.second,
        games: results.len(),
        first_wins,
        second_wins,
        draws,
        unfinished,
        mean_plies,
        elapsed_ms,
        config: settings.config.clone(),
    }
}

fn cmd_match(game: GameKind, settings: MatchSettings, threads: Option<usize>) -> Result<()> {
    if game == GameKind::Pig {
        for kind in [settings.first, settings.second] {
            if kind.needs_deterministic_game() {
                bail!("{:?} cannot search through dice rolls; use the chance or random agent", kind);
            }
        }
    }

    let pool = {
        let mut builder = rayon::ThreadPoolBuilder::new();
        if let Some(threads) = threads {
            builder = builder.num_threads(threads);
        }
        builder.build().context("Failed to start worker threads")?
    };

    info!(
        ?game,
        games = settings.games,
        first = ?settings.first,
        second = ?settings.second,
        seed = settings.seed,
        "starting match"
    );
    let start = Instant::now();
    let results = pool.install(|| match game {
        GameKind::Tictactoe => run_match(&TicTacToe, &settings),
        GameKind::Pig => run_match(&Pig::default(), &settings),
    })?;
    let elapsed_ms = start.elapsed().as_millis() as u64;

    let summary = summarize(game, &settings, &results, elapsed_ms);
    info!(
        first_wins = summary.first_wins,
        second_wins = summary.second_wins,
        draws = summary.draws,
        "match complete"
    );
    println!(
        "{}",
        serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?
    );
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Match {
            game,
            games,
            first,
            second,
            iterations,
            seed,
            config,
            threads,
            max_plies,
        } => {
            let config = load_config(config.as_deref(), iterations)?;
            let settings = MatchSettings {
                games,
                first,
                second,
                seed,
                max_plies,
                config,
            };
            cmd_match(game, settings, threads)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(first: AgentKind, second: AgentKind, games: usize) -> MatchSettings {
        MatchSettings {
            games,
            first,
            second,
            seed: 42,
            max_plies: 500,
            config: MctsConfig::with_iterations(200),
        }
    }

    #[test]
    fn test_config_overlay() {
        let path = std::env::temp_dir().join(format!("ludus-config-{}.yaml", std::process::id()));
        fs::write(&path, "exploration: 2.5\nreuse_tree: true\n").unwrap();

        let config = load_config(Some(&path), Some(64)).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(config.budget, Budget::Iterations(64));
        assert_eq!(config.exploration, 2.5);
        assert!(config.reuse_tree);
        assert_eq!(config.max_depth, None);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let path = std::env::temp_dir().join(format!("ludus-bad-{}.yaml", std::process::id()));
        fs::write(&path, "zero_visit_eps: 1.5\n").unwrap();

        let result = load_config(Some(&path), None);
        fs::remove_file(&path).unwrap();

        assert!(result.is_err());
    }

    #[test]
    fn test_missing_config_file() {
        let err = load_config(Some(Path::new("/nonexistent/ludus.yaml")), None).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_match_alternates_seats() {
        let settings = settings(AgentKind::Random, AgentKind::Random, 6);
        let results = run_match(&TicTacToe, &settings).unwrap();

        assert_eq!(results.len(), 6);
        let first_seats: Vec<usize> = results.iter().map(|(seat, _)| *seat).collect();
        assert_eq!(first_seats, vec![0, 1, 0, 1, 0, 1]);
    }

    #[test]
    fn test_summary_counts_every_game() {
        let settings = settings(AgentKind::Uct, AgentKind::Random, 4);
        let results = run_match(&TicTacToe, &settings).unwrap();
        let summary = summarize(GameKind::Tictactoe, &settings, &results, 0);

        assert_eq!(summary.games, 4);
        assert_eq!(
            summary.first_wins + summary.second_wins + summary.draws,
            summary.games
        );
        assert_eq!(summary.unfinished, 0);

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["game"], "tictactoe");
        assert_eq!(json["first"], "uct");
    }

    #[test]
    fn test_pig_rejects_rollout_agents() {
        let settings = settings(AgentKind::Uct, AgentKind::Random, 2);
        let err = cmd_match(GameKind::Pig, settings, Some(1)).unwrap_err();
        assert!(err.to_string().contains("chance"));
    }
}
