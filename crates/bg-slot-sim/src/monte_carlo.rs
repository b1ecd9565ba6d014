//! Monte-Carlo RTP simulation
//!
//! Plays independent one-unit rounds on shuffled strips and tracks what an
//! operator cares about over a short horizon: running RTP extremes, the worst
//! cumulative house loss, and the worst sliding session of each configured
//! length.
//!
//! Rounds run in chunks on a copy of the run state. A chunk is committed only
//! if no cancellation was observed while it ran.

use std::collections::VecDeque;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use bg_slot_core::{
    Line, MachineConfig, Multiplier, PayTable, REEL_COUNT, ReelStrip, RtpTargets, WindowSpec,
    sample,
};

use crate::cancel::{CancelToken, RunStatus};
use crate::error::{SimError, SimResult};
use crate::targets::{RiskLevel, TargetCheck};

const MICROS: f64 = 1_000_000.0;
const DEFAULT_CHUNK: u64 = 100_000;
/// Rounds between cancellation polls inside a chunk
const POLL_EVERY: u64 = 4_096;

/// Running RTP at a given round
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunningRtp {
    pub round: u64,
    pub rtp: f64,
}

/// Largest cumulative house loss (payout above cost) seen during the run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HouseLoss {
    pub round: u64,
    /// In wager units
    pub loss: f64,
    pub rtp: f64,
}

/// Largest single payout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiggestWin {
    pub round: u64,
    pub multiplier: Multiplier,
    pub line: Line,
}

/// Snapshot taken every checkpoint interval
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RtpCheckpoint {
    pub round: u64,
    pub rtp: f64,
    pub wins: u64,
    pub biggest_win: Multiplier,
    /// Payout minus cost so far (negative = house ahead)
    pub house_loss: f64,
}

/// The worst window of one session length
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorstSession {
    /// First round of the window (1-based)
    pub start_round: u64,
    pub end_round: u64,
    pub cost: u64,
    pub payout: f64,
    /// Payout minus cost (negative = house profit)
    pub house_loss: f64,
    pub rtp: f64,
}

/// Short-session exposure for one session length
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionRisk {
    pub session_size: u64,
    /// `None` when the run was shorter than one session
    pub worst: Option<WorstSession>,
    pub risk: Option<RiskLevel>,
}

/// Result of a Monte-Carlo run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloReport {
    pub machine: String,
    pub status: RunStatus,
    pub seed: Option<u64>,
    pub rounds: u64,
    pub total_cost: u64,
    pub total_payout: f64,
    pub rtp: f64,
    pub hit_frequency: f64,
    pub wins: u64,
    /// Mean payout of winning rounds
    pub average_win: f64,
    /// Per-round payout standard deviation
    pub standard_deviation: f64,
    pub lowest_rtp: Option<RunningRtp>,
    pub highest_rtp: Option<RunningRtp>,
    pub max_house_loss: Option<HouseLoss>,
    pub biggest_win: Option<BiggestWin>,
    pub longest_win_streak: u64,
    pub longest_loss_streak: u64,
    pub sessions: Vec<SessionRisk>,
    pub checkpoints: Vec<RtpCheckpoint>,
    /// Tolerance widened to three standard errors of the estimate
    pub rtp_check: TargetCheck,
    pub hit_frequency_check: TargetCheck,
    pub elapsed_ms: f64,
}

impl MonteCarloReport {
    pub fn is_complete(&self) -> bool {
        self.status == RunStatus::Completed
    }

    pub fn into_completed(self) -> SimResult<Self> {
        if self.is_complete() {
            Ok(self)
        } else {
            Err(SimError::Cancelled)
        }
    }

    /// Worst session for one length, if configured
    pub fn session(&self, size: u64) -> Option<&SessionRisk> {
        self.sessions.iter().find(|s| s.session_size == size)
    }
}

/// Sliding window over the last `size` payouts
#[derive(Debug, Clone)]
struct SessionWindow {
    size: u64,
    recent: VecDeque<u64>,
    payout_micros: u128,
    worst: Option<(u64, u128)>,
}

impl SessionWindow {
    fn new(size: u64) -> Self {
        Self {
            size,
            recent: VecDeque::with_capacity(size.min(1 << 16) as usize),
            payout_micros: 0,
            worst: None,
        }
    }

    fn push(&mut self, round: u64, payout_micros: u64) {
        self.recent.push_back(payout_micros);
        self.payout_micros += u128::from(payout_micros);
        if self.recent.len() as u64 > self.size {
            if let Some(old) = self.recent.pop_front() {
                self.payout_micros -= u128::from(old);
            }
        }
        if self.recent.len() as u64 == self.size
            && self.worst.is_none_or(|(_, worst)| self.payout_micros > worst)
        {
            self.worst = Some((round, self.payout_micros));
        }
    }

    fn risk(&self) -> SessionRisk {
        let worst = self.worst.map(|(end_round, payout_micros)| {
            let payout = payout_micros as f64 / MICROS;
            let cost = self.size;
            WorstSession {
                start_round: end_round + 1 - self.size,
                end_round,
                cost,
                payout,
                house_loss: payout - cost as f64,
                rtp: payout / cost as f64,
            }
        });
        SessionRisk {
            session_size: self.size,
            risk: worst.map(|w| RiskLevel::from_session_rtp(w.rtp)),
            worst,
        }
    }
}

/// Everything a chunk mutates. Cloned per chunk, committed on success.
#[derive(Debug, Clone)]
struct RunState {
    rounds: u64,
    payout_micros: u128,
    payout_sq: u128,
    wins: u64,
    lowest: Option<RunningRtp>,
    highest: Option<RunningRtp>,
    max_house_loss: Option<HouseLoss>,
    biggest_win: Option<BiggestWin>,
    win_streak: u64,
    loss_streak: u64,
    longest_win_streak: u64,
    longest_loss_streak: u64,
    sessions: Vec<SessionWindow>,
    checkpoints: Vec<RtpCheckpoint>,
}

impl RunState {
    fn new(session_sizes: &[u64]) -> Self {
        Self {
            rounds: 0,
            payout_micros: 0,
            payout_sq: 0,
            wins: 0,
            lowest: None,
            highest: None,
            max_house_loss: None,
            biggest_win: None,
            win_streak: 0,
            loss_streak: 0,
            longest_win_streak: 0,
            longest_loss_streak: 0,
            sessions: session_sizes.iter().map(|&s| SessionWindow::new(s)).collect(),
            checkpoints: Vec::new(),
        }
    }

    fn payout(&self) -> f64 {
        self.payout_micros as f64 / MICROS
    }

    fn rtp(&self) -> f64 {
        if self.rounds == 0 {
            0.0
        } else {
            self.payout() / self.rounds as f64
        }
    }

    fn record(&mut self, line: Line, multiplier: Multiplier, checkpoint_interval: u64) {
        self.rounds += 1;
        let round = self.rounds;
        let micros = multiplier.micros();
        self.payout_micros += u128::from(micros);
        self.payout_sq += u128::from(micros) * u128::from(micros);

        if multiplier.is_zero() {
            self.loss_streak += 1;
            self.win_streak = 0;
            self.longest_loss_streak = self.longest_loss_streak.max(self.loss_streak);
        } else {
            self.wins += 1;
            self.win_streak += 1;
            self.loss_streak = 0;
            self.longest_win_streak = self.longest_win_streak.max(self.win_streak);
            if self.biggest_win.is_none_or(|b| multiplier > b.multiplier) {
                self.biggest_win = Some(BiggestWin {
                    round,
                    multiplier,
                    line,
                });
            }
        }

        let rtp = self.rtp();
        if self.lowest.is_none_or(|l| rtp < l.rtp) {
            self.lowest = Some(RunningRtp { round, rtp });
        }
        if self.highest.is_none_or(|h| rtp > h.rtp) {
            self.highest = Some(RunningRtp { round, rtp });
        }

        let house_loss = self.payout() - round as f64;
        if house_loss > 0.0 && self.max_house_loss.is_none_or(|m| house_loss > m.loss) {
            self.max_house_loss = Some(HouseLoss {
                round,
                loss: house_loss,
                rtp,
            });
        }

        for session in &mut self.sessions {
            session.push(round, micros);
        }

        if round % checkpoint_interval == 0 {
            self.checkpoints.push(RtpCheckpoint {
                round,
                rtp,
                wins: self.wins,
                biggest_win: self.biggest_win.map(|b| b.multiplier).unwrap_or_default(),
                house_loss,
            });
        }
    }

    fn standard_deviation(&self) -> f64 {
        if self.rounds == 0 {
            return 0.0;
        }
        let n = self.rounds as f64;
        let mean = self.payout() / n;
        let mean_sq = self.payout_sq as f64 / (MICROS * MICROS) / n;
        (mean_sq - mean * mean).max(0.0).sqrt()
    }
}

/// Monte-Carlo simulator with an injected RNG
pub struct MonteCarlo {
    machine: String,
    paytable: PayTable,
    window: WindowSpec,
    strips: [ReelStrip; REEL_COUNT],
    targets: RtpTargets,
    session_sizes: Vec<u64>,
    checkpoint_interval: u64,
    chunk_size: u64,
    seed: Option<u64>,
    rng: Box<dyn RngCore + Send>,
    cancel: CancelToken,
}

impl MonteCarlo {
    /// Simulator seeded from the OS
    pub fn new(config: &MachineConfig) -> SimResult<Self> {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    /// Reproducible simulator
    pub fn seeded(config: &MachineConfig, seed: u64) -> SimResult<Self> {
        let mut sim = Self::with_rng(config, ChaCha8Rng::seed_from_u64(seed))?;
        sim.seed = Some(seed);
        Ok(sim)
    }

    /// Strips are shuffled once with `rng`, which then drives every round.
    pub fn with_rng<R: RngCore + Send + 'static>(
        config: &MachineConfig,
        rng: R,
    ) -> SimResult<Self> {
        config.validate()?;
        let mut rng: Box<dyn RngCore + Send> = Box::new(rng);
        let strips = config.reel_definitions()?.map(|def| def.materialize(&mut rng));

        Ok(Self {
            machine: format!("{} {}", config.name, config.version),
            paytable: config.paytable.clone(),
            window: config.window_spec(),
            strips,
            targets: config.targets,
            session_sizes: config.simulation.session_sizes.clone(),
            checkpoint_interval: config.simulation.checkpoint_interval,
            chunk_size: DEFAULT_CHUNK,
            seed: None,
            rng,
            cancel: CancelToken::new(),
        })
    }

    pub fn with_chunk_size(mut self, rounds: u64) -> Self {
        self.chunk_size = rounds.max(1);
        self
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Simulate `rounds` one-unit rounds.
    pub fn run(&mut self, rounds: u64) -> SimResult<MonteCarloReport> {
        if rounds == 0 {
            return Err(SimError::InvalidParameter(
                "round count must be positive".into(),
            ));
        }

        let started = Instant::now();
        log::info!(
            "Monte-Carlo: {} x {rounds} rounds (seed {:?})",
            self.machine,
            self.seed
        );

        let mut state = RunState::new(&self.session_sizes);
        let mut status = RunStatus::Completed;

        while state.rounds < rounds {
            if self.cancel.is_cancelled() {
                status = RunStatus::Cancelled;
                break;
            }
            let chunk = self.chunk_size.min(rounds - state.rounds);
            match self.run_chunk(&state, chunk) {
                Some(next) => state = next,
                None => {
                    status = RunStatus::Cancelled;
                    break;
                }
            }
        }

        if status == RunStatus::Cancelled {
            log::warn!("Monte-Carlo cancelled after {} rounds", state.rounds);
        }

        let elapsed_ms = started.elapsed().as_secs_f64() * 1_000.0;
        let report = self.report(state, status, elapsed_ms);
        if report.is_complete() {
            log::info!(
                "Monte-Carlo done in {:.1} ms: RTP {:.6}, hit frequency {:.6}",
                elapsed_ms,
                report.rtp,
                report.hit_frequency
            );
            report.rtp_check.log_outcome("Simulated RTP");
            report.hit_frequency_check.log_outcome("Simulated hit frequency");
        }
        Ok(report)
    }

    /// Play `rounds` on a copy of `state`; `None` if cancelled meanwhile
    fn run_chunk(&mut self, state: &RunState, rounds: u64) -> Option<RunState> {
        let mut next = state.clone();
        for i in 0..rounds {
            if i % POLL_EVERY == 0 && i > 0 && self.cancel.is_cancelled() {
                return None;
            }
            let outcome = sample(&self.strips, self.window, &mut self.rng);
            let total = self.paytable.evaluate_outcome(&outcome).total;
            next.record(outcome.line, total, self.checkpoint_interval);
        }
        (!self.cancel.is_cancelled()).then_some(next)
    }

    fn report(&self, state: RunState, status: RunStatus, elapsed_ms: f64) -> MonteCarloReport {
        let n = state.rounds as f64;
        let rtp = state.rtp();
        let hit_frequency = if state.rounds == 0 { 0.0 } else { state.wins as f64 / n };
        let average_win = if state.wins == 0 {
            0.0
        } else {
            state.payout() / state.wins as f64
        };
        let standard_deviation = state.standard_deviation();

        let (rtp_error, hit_error) = if state.rounds == 0 {
            (0.0, 0.0)
        } else {
            (
                3.0 * standard_deviation / n.sqrt(),
                3.0 * (hit_frequency * (1.0 - hit_frequency) / n).sqrt(),
            )
        };

        MonteCarloReport {
            machine: self.machine.clone(),
            status,
            seed: self.seed,
            rounds: state.rounds,
            total_cost: state.rounds,
            total_payout: state.payout(),
            rtp,
            hit_frequency,
            wins: state.wins,
            average_win,
            standard_deviation,
            lowest_rtp: state.lowest,
            highest_rtp: state.highest,
            max_house_loss: state.max_house_loss,
            biggest_win: state.biggest_win,
            longest_win_streak: state.longest_win_streak,
            longest_loss_streak: state.longest_loss_streak,
            sessions: state.sessions.iter().map(SessionWindow::risk).collect(),
            checkpoints: state.checkpoints,
            rtp_check: TargetCheck::new(
                self.targets.rtp,
                self.targets.rtp_tolerance.max(rtp_error),
                rtp,
            ),
            hit_frequency_check: TargetCheck::new(
                self.targets.hit_frequency,
                self.targets.hit_frequency_tolerance.max(hit_error),
                hit_frequency,
            ),
            elapsed_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_session_window_slides() {
        let mut window = SessionWindow::new(3);
        let payouts = [0, 0, 7, 0, 0, 0, 2, 2, 2];
        for (i, &p) in payouts.iter().enumerate() {
            window.push(i as u64 + 1, p * 1_000_000);
        }
        let risk = window.risk();
        let worst = risk.worst.unwrap();
        // First window reaching 7 is rounds 1-3
        assert_eq!((worst.start_round, worst.end_round), (1, 3));
        assert_relative_eq!(worst.payout, 7.0);
        assert_relative_eq!(worst.house_loss, 4.0);
        assert_eq!(risk.risk, Some(RiskLevel::Extreme));
    }

    #[test]
    fn test_short_run_has_no_full_session() {
        let mut window = SessionWindow::new(10);
        for round in 1..=9 {
            window.push(round, 0);
        }
        let risk = window.risk();
        assert!(risk.worst.is_none());
        assert!(risk.risk.is_none());
    }

    #[test]
    fn test_run_state_streaks_and_extremes() {
        let mut state = RunState::new(&[2]);
        let line = [bg_slot_core::Symbol::Blank; 3];
        let pays = [0, 0, 3, 7, 0, 0, 0, 10];
        for p in pays {
            state.record(line, Multiplier::units(p), 4);
        }
        assert_eq!(state.rounds, 8);
        assert_eq!(state.wins, 3);
        assert_eq!(state.longest_loss_streak, 3);
        assert_eq!(state.longest_win_streak, 2);
        assert_eq!(state.biggest_win.unwrap().multiplier, Multiplier::units(10));
        assert_eq!(state.biggest_win.unwrap().round, 8);
        assert_relative_eq!(state.lowest.unwrap().rtp, 0.0);
        assert_eq!(state.lowest.unwrap().round, 1);
        // After round 4: 10 paid on 4 staked
        assert_relative_eq!(state.highest.unwrap().rtp, 2.5);
        assert_eq!(state.max_house_loss.unwrap().round, 8);
        assert_relative_eq!(state.max_house_loss.unwrap().loss, 12.0);
        assert_eq!(state.checkpoints.len(), 2);
        assert_eq!(state.checkpoints[1].biggest_win, Multiplier::units(10));
    }

    #[test]
    fn test_zero_rounds_rejected() {
        let mut sim = MonteCarlo::seeded(&MachineConfig::black_gold(), 1).unwrap();
        assert!(matches!(sim.run(0), Err(SimError::InvalidParameter(_))));
    }

    #[test]
    fn test_chunking_does_not_change_results() {
        let config = MachineConfig::black_gold();
        let a = MonteCarlo::seeded(&config, 99).unwrap().run(25_000).unwrap();
        let b = MonteCarlo::seeded(&config, 99)
            .unwrap()
            .with_chunk_size(333)
            .run(25_000)
            .unwrap();
        assert_eq!(a.total_payout, b.total_payout);
        assert_eq!(a.wins, b.wins);
        assert_eq!(a.sessions, b.sessions);
        assert_eq!(a.checkpoints, b.checkpoints);
    }

    #[test]
    fn test_precancelled_run_commits_nothing() {
        let mut sim = MonteCarlo::seeded(&MachineConfig::black_gold(), 5).unwrap();
        sim.cancel_token().cancel();
        let report = sim.run(10_000).unwrap();
        assert_eq!(report.status, RunStatus::Cancelled);
        assert_eq!(report.rounds, 0);
        assert!(matches!(report.into_completed(), Err(SimError::Cancelled)));
    }
}
