//! bg-rtp: RTP verification for Black Gold machines
//!
//! Usage:
//!   bg-rtp exhaustive                       - Exact RTP over every combination
//!   bg-rtp monte-carlo --rounds 1000000     - Random play with session risk
//!   bg-rtp all                              - Both analyses
//!
//! `--config machine.yaml` swaps the built-in Black Gold model for a file;
//! `--json` prints machine-readable reports.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use bg_slot_core::MachineConfig;
use bg_slot_sim::{
    ExhaustiveAnalyzer, MonteCarlo, render_exhaustive, render_monte_carlo, to_json,
};

#[derive(Parser)]
#[command(name = "bg-rtp", about = "Black Gold RTP verification", version)]
struct Cli {
    /// Machine definition (JSON or YAML). Defaults to the built-in Black Gold model
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print reports as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Worker threads for exhaustive analysis (default: all cores)
    #[arg(short, long, global = true)]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enumerate every stop combination
    Exhaustive,
    /// Simulate random rounds
    MonteCarlo {
        /// Number of rounds
        #[arg(short, long, default_value_t = 1_000_000)]
        rounds: u64,
        /// Seed for a reproducible run
        #[arg(short, long)]
        seed: Option<u64>,
    },
    /// Exhaustive analysis followed by a Monte-Carlo run
    All {
        #[arg(short, long, default_value_t = 1_000_000)]
        rounds: u64,
        #[arg(short, long)]
        seed: Option<u64>,
    },
}

fn main() -> Result<ExitCode> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => MachineConfig::load(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => MachineConfig::black_gold(),
    };

    let passed = match &cli.command {
        Commands::Exhaustive => exhaustive(&cli, &config)?,
        Commands::MonteCarlo { rounds, seed } => monte_carlo(&cli, &config, *rounds, *seed)?,
        Commands::All { rounds, seed } => {
            let exact = exhaustive(&cli, &config)?;
            let sampled = monte_carlo(&cli, &config, *rounds, *seed)?;
            exact && sampled
        }
    };

    Ok(if passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Returns whether both targets were met
fn exhaustive(cli: &Cli, config: &MachineConfig) -> Result<bool> {
    let mut analyzer = ExhaustiveAnalyzer::from_config(config)?;
    if let Some(threads) = cli.threads {
        analyzer = analyzer.with_threads(threads);
    }
    let report = analyzer.run()?.into_completed()?;

    if cli.json {
        println!("{}", to_json(&report)?);
    } else {
        println!("{}", render_exhaustive(&report));
    }
    Ok(report.rtp_check.within && report.hit_frequency_check.within)
}

fn monte_carlo(cli: &Cli, config: &MachineConfig, rounds: u64, seed: Option<u64>) -> Result<bool> {
    let mut sim = match seed {
        Some(seed) => MonteCarlo::seeded(config, seed)?,
        None => MonteCarlo::new(config)?,
    };
    let report = sim.run(rounds)?.into_completed()?;

    if cli.json {
        println!("{}", to_json(&report)?);
    } else {
        println!("{}", render_monte_carlo(&report));
    }
    Ok(report.rtp_check.within && report.hit_frequency_check.within)
}
