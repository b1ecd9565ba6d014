//! # bg-slot-sim: RTP verification for Black Gold machines
//!
//! Two read-only analyses over a [`MachineConfig`]:
//!
//! - [`ExhaustiveAnalyzer`]: every stop combination, exact RTP and hit
//!   frequency, parallel over reel-1 positions
//! - [`MonteCarlo`]: seeded random play with running-RTP extremes and
//!   sliding-window session drawdown
//!
//! Neither touches an account; they work straight from reel definitions and
//! the paytable.
//!
//! ## Example
//!
//! ```no_run
//! use bg_slot_core::MachineConfig;
//!
//! let config = MachineConfig::black_gold();
//! let exact = bg_slot_sim::run_exhaustive_analysis(&config).unwrap();
//! let sampled = bg_slot_sim::run_monte_carlo(&config, 1_000_000, Some(7)).unwrap();
//! println!("{:.4} vs {:.4}", exact.rtp, sampled.rtp);
//! ```

pub mod cancel;
pub mod error;
pub mod exhaustive;
pub mod monte_carlo;
pub mod report;
pub mod targets;

pub use cancel::*;
pub use error::*;
pub use exhaustive::*;
pub use monte_carlo::*;
pub use report::{group_digits, render_exhaustive, render_monte_carlo, to_json};
pub use targets::*;

use bg_slot_core::MachineConfig;

/// Exhaustive RTP / hit frequency / payout distribution for `config`
pub fn run_exhaustive_analysis(config: &MachineConfig) -> SimResult<ExhaustiveReport> {
    ExhaustiveAnalyzer::from_config(config)?.run()
}

/// Monte-Carlo run of `rounds`; `seed` makes it reproducible
pub fn run_monte_carlo(
    config: &MachineConfig,
    rounds: u64,
    seed: Option<u64>,
) -> SimResult<MonteCarloReport> {
    let mut sim = match seed {
        Some(seed) => MonteCarlo::seeded(config, seed)?,
        None => MonteCarlo::new(config)?,
    };
    sim.run(rounds)
}
