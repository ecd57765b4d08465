//! OfferLab CLI — simulate and rank commands.
//!
//! Commands:
//! - `simulate` — run the adaptive click simulation and print the final report
//! - `rank` — print weighted offer lists for the configured items
//!
//! Without `--config`, both commands use the built-in four-offer dataset.

mod logging;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use offerlab_core::{rank_all, session_rng, RngHierarchy, SimulationConfig, SimulationReport};

use crate::logging::{init_subscriber, Verbosity};

#[derive(Parser)]
#[command(
    name = "offerlab",
    about = "OfferLab CLI — weighted offer ranking with click-driven weight adaptation"
)]
struct Cli {
    /// Debug output, including one line per trial.
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    /// Errors only.
    #[arg(short, long, global = true, default_value_t = false)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the adaptive click simulation.
    Simulate {
        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the number of trials.
        #[arg(long)]
        iterations: Option<u64>,

        /// Seed for the session random source. Defaults to OS entropy.
        #[arg(long)]
        seed: Option<u64>,

        /// Number of independent runs (seeds derived from --seed).
        #[arg(long, default_value_t = 1)]
        runs: u64,

        /// Print the report(s) as JSON instead of text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Print weighted offer lists.
    Rank {
        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Seed for the session random source. Defaults to OS entropy.
        #[arg(long)]
        seed: Option<u64>,

        /// How many offer lists to print.
        #[arg(long, default_value_t = 1)]
        count: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_subscriber(Verbosity::from_flags(cli.verbose, cli.quiet));

    match cli.command {
        Commands::Simulate {
            config,
            iterations,
            seed,
            runs,
            json,
        } => run_simulate(config.as_deref(), iterations, seed, runs, json),
        Commands::Rank {
            config,
            seed,
            count,
        } => run_rank(config.as_deref(), seed, count),
    }
}

fn load_config(path: Option<&Path>) -> Result<SimulationConfig> {
    let config = match path {
        Some(path) => SimulationConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => SimulationConfig::default(),
    };
    Ok(config)
}

fn run_simulate(
    config_path: Option<&Path>,
    iterations: Option<u64>,
    seed: Option<u64>,
    runs: u64,
    json: bool,
) -> Result<()> {
    if runs == 0 {
        bail!("--runs must be at least 1");
    }

    let mut config = load_config(config_path)?;
    if let Some(iterations) = iterations {
        config.iterations = iterations;
    }
    let seed = seed.or(config.seed);
    config.validate()?;

    let reports: Vec<SimulationReport> = if runs == 1 {
        let mut sim = config.simulator(session_rng(seed))?;
        vec![sim.run()?]
    } else {
        let master = seed.unwrap_or_else(rand::random);
        tracing::info!(master_seed = master, runs, "deriving per-run seeds");
        config.run_independent(runs, &RngHierarchy::new(master))?
    };

    if json {
        if let [report] = reports.as_slice() {
            println!("{}", serde_json::to_string_pretty(report)?);
        } else {
            println!("{}", serde_json::to_string_pretty(&reports)?);
        }
        return Ok(());
    }

    for (index, report) in reports.iter().enumerate() {
        if reports.len() > 1 {
            println!("== run {} ==", index + 1);
        }
        print!("{report}");
        if let Some(distance) = report.distance_to_targets() {
            println!("Distance to targets (L1): {distance:.4}");
        }
    }
    Ok(())
}

fn run_rank(config_path: Option<&Path>, seed: Option<u64>, count: usize) -> Result<()> {
    let config = load_config(config_path)?;
    config.validate()?;

    let mut rng = session_rng(seed.or(config.seed));
    for _ in 0..count {
        let ranking = rank_all(&config.items, &mut rng)?;
        println!("{}", ranking.join(" "));
    }
    Ok(())
}
