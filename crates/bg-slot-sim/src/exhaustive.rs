//! Exhaustive RTP analysis
//!
//! Visits every stop combination of the three reels exactly once, so the
//! figures are exact rather than estimated. The canonical (unshuffled) strips
//! are used: strip order cannot change which symbol triples are reachable.
//!
//! Work is split by reel-1 position. Each chunk owns its own [`Tally`];
//! tallies are combined by summation only.

use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use bg_slot_core::{
    Line, MachineConfig, Multiplier, PayTable, REEL_COUNT, ReelStrip, RtpTargets, ScatterMode,
    SpinOutcome, WindowSpec,
};

use crate::cancel::{CancelToken, RunStatus};
use crate::error::{SimError, SimResult};
use crate::targets::TargetCheck;

/// How many winning lines the report lists
const TOP_COMBINATIONS: usize = 10;

/// Additive accumulator for a set of combinations
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tally {
    pub combinations: u64,
    pub payout_micros: u128,
    pub wins: u64,
    /// Nonzero multiplier → number of combinations paying it
    pub distribution: BTreeMap<Multiplier, u64>,
    /// Winning line → number of combinations producing it
    pub lines: HashMap<Line, u64>,
}

impl Tally {
    fn record(&mut self, line: Line, multiplier: Multiplier) {
        self.combinations += 1;
        if multiplier.is_zero() {
            return;
        }
        self.payout_micros += u128::from(multiplier.micros());
        self.wins += 1;
        *self.distribution.entry(multiplier).or_insert(0) += 1;
        *self.lines.entry(line).or_insert(0) += 1;
    }

    /// Fold `other` into `self`. Commutative and associative.
    pub fn merge(mut self, other: Tally) -> Tally {
        self.combinations += other.combinations;
        self.payout_micros += other.payout_micros;
        self.wins += other.wins;
        for (multiplier, count) in other.distribution {
            *self.distribution.entry(multiplier).or_insert(0) += count;
        }
        for (line, count) in other.lines {
            *self.lines.entry(line).or_insert(0) += count;
        }
        self
    }
}

/// Combinations paying one multiplier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoutBucket {
    pub multiplier: Multiplier,
    pub count: u64,
    pub probability: f64,
    /// Share of the total RTP contributed by this bucket
    pub rtp_contribution: f64,
}

/// A winning line and how often it occurs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinationCount {
    pub line: Line,
    pub count: u64,
}

/// Result of an exhaustive run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExhaustiveReport {
    pub machine: String,
    pub paytable_version: String,
    pub status: RunStatus,
    pub chunks_completed: usize,
    pub chunks_total: usize,
    /// Combinations actually evaluated
    pub combinations: u64,
    /// One unit per combination
    pub total_cost: u64,
    pub total_payout_micros: u128,
    pub winning_combinations: u64,
    pub rtp: f64,
    pub hit_frequency: f64,
    pub distribution: Vec<PayoutBucket>,
    pub top_combinations: Vec<CombinationCount>,
    pub rtp_check: TargetCheck,
    pub hit_frequency_check: TargetCheck,
    pub elapsed_ms: f64,
}

impl ExhaustiveReport {
    pub fn total_payout(&self) -> f64 {
        self.total_payout_micros as f64 / 1_000_000.0
    }

    pub fn is_complete(&self) -> bool {
        self.status == RunStatus::Completed
    }

    /// `Err(Cancelled)` unless every combination was visited
    pub fn into_completed(self) -> SimResult<Self> {
        if self.is_complete() {
            Ok(self)
        } else {
            Err(SimError::Cancelled)
        }
    }

    fn from_tally(
        analyzer: &ExhaustiveAnalyzer,
        tally: Tally,
        chunks_completed: usize,
        status: RunStatus,
        elapsed_ms: f64,
    ) -> Self {
        let total_cost = tally.combinations;
        let ratio = |n: f64| if total_cost > 0 { n / total_cost as f64 } else { 0.0 };
        let rtp = ratio(tally.payout_micros as f64 / 1_000_000.0);
        let hit_frequency = ratio(tally.wins as f64);

        let distribution = tally
            .distribution
            .iter()
            .map(|(&multiplier, &count)| PayoutBucket {
                multiplier,
                count,
                probability: ratio(count as f64),
                rtp_contribution: ratio(count as f64 * multiplier.as_f64()),
            })
            .collect();

        let mut top_combinations: Vec<CombinationCount> = tally
            .lines
            .into_iter()
            .map(|(line, count)| CombinationCount { line, count })
            .collect();
        top_combinations.sort_by(|a, b| b.count.cmp(&a.count).then(a.line.cmp(&b.line)));
        top_combinations.truncate(TOP_COMBINATIONS);

        let targets = &analyzer.targets;
        Self {
            machine: analyzer.machine.clone(),
            paytable_version: analyzer.paytable.version.clone(),
            status,
            chunks_completed,
            chunks_total: analyzer.strips[0].len(),
            combinations: tally.combinations,
            total_cost,
            total_payout_micros: tally.payout_micros,
            winning_combinations: tally.wins,
            rtp,
            hit_frequency,
            distribution,
            top_combinations,
            rtp_check: TargetCheck::new(targets.rtp, targets.rtp_tolerance, rtp),
            hit_frequency_check: TargetCheck::new(
                targets.hit_frequency,
                targets.hit_frequency_tolerance,
                hit_frequency,
            ),
            elapsed_ms,
        }
    }
}

/// Enumerates all `L1 × L2 × L3` stop combinations
pub struct ExhaustiveAnalyzer {
    machine: String,
    paytable: PayTable,
    window: WindowSpec,
    strips: [ReelStrip; REEL_COUNT],
    targets: RtpTargets,
    threads: usize,
    cancel: CancelToken,
}

impl ExhaustiveAnalyzer {
    /// Analyzer over the canonical strips of `config`
    pub fn from_config(config: &MachineConfig) -> SimResult<Self> {
        config.validate()?;
        let strips = config.reel_definitions()?.map(|def| def.canonical_strip());
        Ok(Self::build(config, strips))
    }

    /// Analyzer over explicit strips.
    ///
    /// Each strip must be an ordering of its reel's defined multiset; any
    /// such order gives the same totals.
    pub fn with_strips(
        config: &MachineConfig,
        strips: [ReelStrip; REEL_COUNT],
    ) -> SimResult<Self> {
        config.validate()?;
        for (def, strip) in config.reel_definitions()?.iter().zip(&strips) {
            def.check_strip(strip)?;
        }
        Ok(Self::build(config, strips))
    }

    fn build(config: &MachineConfig, strips: [ReelStrip; REEL_COUNT]) -> Self {
        Self {
            machine: format!("{} {}", config.name, config.version),
            paytable: config.paytable.clone(),
            window: config.window_spec(),
            strips,
            targets: config.targets,
            threads: num_cpus::get(),
            cancel: CancelToken::new(),
        }
    }

    /// Worker threads (at least one)
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that stops this analyzer at the next chunk boundary
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Size of the combination space
    pub fn combinations(&self) -> u64 {
        self.strips.iter().map(|s| s.len() as u64).product()
    }

    /// Enumerate every combination and report exact RTP and hit frequency.
    pub fn run(&self) -> SimResult<ExhaustiveReport> {
        let started = Instant::now();
        log::info!(
            "Exhaustive analysis: {} ({} combinations, {} threads)",
            self.machine,
            self.combinations(),
            self.threads
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.threads)
            .build()
            .map_err(|e| SimError::InvalidParameter(format!("thread pool: {e}")))?;

        let (tally, chunks) = pool.install(|| {
            (0..self.strips[0].len())
                .into_par_iter()
                .filter_map(|p0| {
                    if self.cancel.is_cancelled() {
                        return None;
                    }
                    let tally = self.tally_chunk(p0);
                    // A chunk finished after cancellation is discarded
                    (!self.cancel.is_cancelled()).then_some((tally, 1usize))
                })
                .reduce(
                    || (Tally::default(), 0),
                    |(a, n), (b, m)| (a.merge(b), n + m),
                )
        });

        let status = if chunks == self.strips[0].len() {
            RunStatus::Completed
        } else {
            log::warn!(
                "Exhaustive analysis cancelled after {chunks}/{} chunks",
                self.strips[0].len()
            );
            RunStatus::Cancelled
        };

        let elapsed_ms = started.elapsed().as_secs_f64() * 1_000.0;
        let report = ExhaustiveReport::from_tally(self, tally, chunks, status, elapsed_ms);

        if report.is_complete() {
            log::info!(
                "Exhaustive analysis done in {:.1} ms: RTP {:.6}, hit frequency {:.6}",
                elapsed_ms,
                report.rtp,
                report.hit_frequency
            );
            report.rtp_check.log_outcome("RTP");
            report.hit_frequency_check.log_outcome("Hit frequency");
        }

        Ok(report)
    }

    /// Every combination with reel 1 stopped at `p0`
    fn tally_chunk(&self, p0: usize) -> Tally {
        let mut tally = Tally::default();
        let [s0, s1, s2] = &self.strips;
        let row = self.window.line_row;

        match self.paytable.scatter {
            // Only the line matters: read it straight off the strips
            ScatterMode::LineOnly => {
                let a = s0.symbol_at(p0 + row);
                for p1 in 0..s1.len() {
                    let b = s1.symbol_at(p1 + row);
                    for p2 in 0..s2.len() {
                        let line = [a, b, s2.symbol_at(p2 + row)];
                        tally.record(line, self.paytable.evaluate(&line).multiplier);
                    }
                }
            }
            ScatterMode::Anywhere { .. } => {
                for p1 in 0..s1.len() {
                    for p2 in 0..s2.len() {
                        let outcome = SpinOutcome::at(&self.strips, [p0, p1, p2], self.window);
                        let total = self.paytable.evaluate_outcome(&outcome).total;
                        tally.record(outcome.line, total);
                    }
                }
            }
        }

        tally
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use approx::assert_relative_eq;
    use bg_slot_core::{ReelConfig, ScatterPay, SlotError, Symbol};

    fn tiny_config() -> MachineConfig {
        // Two stops per reel: BG or blank
        let mut config = MachineConfig::black_gold();
        config.reels = vec![
            ReelConfig {
                length: 2,
                counts: BTreeMap::from([(Symbol::Wild, 1), (Symbol::Blank, 1)]),
            };
            3
        ];
        config
    }

    #[test]
    fn test_tiny_machine_by_hand() {
        // 8 lines: BG×3 pays 2500, three lines with two BG pay 7,
        // three with one BG pay 3, all blanks pay 0
        let report = ExhaustiveAnalyzer::from_config(&tiny_config())
            .unwrap()
            .with_threads(2)
            .run()
            .unwrap();

        assert_eq!(report.combinations, 8);
        assert_eq!(report.total_payout_micros, (2500 + 3 * 7 + 3 * 3) * 1_000_000);
        assert_eq!(report.winning_combinations, 7);
        assert_relative_eq!(report.rtp, 2530.0 / 8.0);
        assert_relative_eq!(report.hit_frequency, 7.0 / 8.0);
        assert_eq!(report.distribution.len(), 3);
        assert_eq!(report.top_combinations.len(), 7);
    }

    #[test]
    fn test_merge_is_order_independent() {
        let analyzer = ExhaustiveAnalyzer::from_config(&MachineConfig::black_gold()).unwrap();
        let chunks: Vec<Tally> = (0..6).map(|p| analyzer.tally_chunk(p * 7)).collect();

        let forward = chunks.iter().cloned().fold(Tally::default(), Tally::merge);
        let backward = chunks.iter().rev().cloned().fold(Tally::default(), Tally::merge);
        assert_eq!(forward, backward);
        assert_eq!(forward.combinations, 6 * 72 * 72);
    }

    #[test]
    fn test_scatter_anywhere_enumeration() {
        let mut config = tiny_config();
        config.reels = vec![
            ReelConfig {
                length: 2,
                counts: BTreeMap::from([(Symbol::Scatter, 1), (Symbol::Blank, 1)]),
            };
            3
        ];
        config.paytable.scatter = ScatterMode::Anywhere {
            symbol: Symbol::Scatter,
            pays: vec![ScatterPay {
                count: 9,
                pays: Multiplier::units(1),
                label: "SCATTER PAY".into(),
            }],
        };
        // Three rows on two-stop strips: every window shows each reel's
        // scatter at least once, at most twice. 9 never happens.
        let report = ExhaustiveAnalyzer::from_config(&config).unwrap().run().unwrap();
        assert_eq!(report.combinations, 8);
        assert_eq!(report.winning_combinations, 0);

        if let ScatterMode::Anywhere { pays, .. } = &mut config.paytable.scatter {
            pays[0].count = 3;
        }
        let report = ExhaustiveAnalyzer::from_config(&config).unwrap().run().unwrap();
        assert_eq!(report.winning_combinations, 8);
        assert_eq!(report.total_payout_micros, 8 * 1_000_000);
    }

    #[test]
    fn test_foreign_strips_rejected() {
        let config = MachineConfig::black_gold();
        let all_wild = |reel| ReelStrip::new(reel, vec![Symbol::Wild; 72]).unwrap();
        assert!(matches!(
            ExhaustiveAnalyzer::with_strips(&config, [all_wild(0), all_wild(1), all_wild(2)]),
            Err(SimError::Slot(SlotError::InvalidDefinition(_)))
        ));

        // One reel swapped for another reel's strip
        let mut strips = config.reel_definitions().unwrap().map(|d| d.canonical_strip());
        strips.swap(0, 2);
        assert!(ExhaustiveAnalyzer::with_strips(&config, strips).is_err());
    }
}
