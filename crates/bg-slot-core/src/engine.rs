//! Round settlement engine
//!
//! A `SlotMachine` owns the materialized strips, the account and the RNG port.
//! Each round walks `Idle → Debited → Resolved → Idle`:
//!
//! - `begin_round` validates and debits the wager before any randomness is
//!   drawn, and hands out a [`PendingRound`]
//! - [`PendingRound::resolve`] samples, evaluates, credits and returns the
//!   [`SettlementRecord`]
//!
//! While a round is pending every other mutating call fails with
//! `RoundInProgress`. A pending round that is dropped without resolving
//! (early return, panic unwinding) refunds its wager.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::MachineConfig;
use crate::error::{SlotError, SlotResult, WagerRejection};
use crate::money::Cents;
use crate::paytable::{Multiplier, RuleClass, ScatterWin};
use crate::reels::ReelStrip;
use crate::spin::{SpinOutcome, WindowSpec, sample};
use crate::symbols::{Line, REEL_COUNT};

/// Injected randomness source
pub type RngPort = Box<dyn RngCore + Send>;

/// Externally visible account state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    pub balance: Cents,
    pub current_wager: Cents,
    /// Credit of the most recent round (zero from the moment of debit)
    pub last_win: Cents,
}

/// Settlement phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundPhase {
    Idle,
    Debited,
    Resolved,
}

struct Account {
    state: AccountState,
    phase: RoundPhase,
    rounds: u64,
}

/// Paytable rule that produced the line win
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedRule {
    pub class: RuleClass,
    pub label: String,
    pub multiplier: Multiplier,
}

/// Immutable record of one settled round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRecord {
    pub round_id: u64,
    pub wager: Cents,
    pub debited: Cents,
    pub balance_before: Cents,
    pub outcome: SpinOutcome,
    pub line: Line,
    pub matched: Option<MatchedRule>,
    pub scatter: Option<ScatterWin>,
    /// Line plus scatter multiplier
    pub multiplier: Multiplier,
    pub credited: Cents,
    /// Balance after the credit
    pub balance: Cents,
}

impl SettlementRecord {
    pub fn is_win(&self) -> bool {
        !self.credited.is_zero()
    }

    /// Display label: line rule first, then scatter
    pub fn label(&self) -> Option<&str> {
        match (&self.matched, &self.scatter) {
            (Some(rule), _) => Some(&rule.label),
            (None, Some(scatter)) => Some(&scatter.label),
            (None, None) => None,
        }
    }
}

/// Black Gold slot machine instance.
///
/// Strips are shuffled once at construction and never change afterwards.
pub struct SlotMachine {
    config: MachineConfig,
    window: WindowSpec,
    strips: [ReelStrip; REEL_COUNT],
    account: Mutex<Account>,
    rng: Mutex<RngPort>,
}

impl SlotMachine {
    /// Engine with an OS-seeded generator
    pub fn new(config: MachineConfig) -> SlotResult<Self> {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    /// Deterministic engine for tests and replays
    pub fn seeded(config: MachineConfig, seed: u64) -> SlotResult<Self> {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    /// Engine with an injected RNG port. Fails if the configuration is invalid.
    pub fn with_rng<R: RngCore + Send + 'static>(
        config: MachineConfig,
        rng: R,
    ) -> SlotResult<Self> {
        config.validate()?;

        let mut rng: RngPort = Box::new(rng);
        let strips = config.reel_definitions()?.map(|def| def.materialize(&mut rng));

        log::info!(
            "SlotMachine: {} {} (paytable {}), strips {:?}, balance {}",
            config.name,
            config.version,
            config.paytable.version,
            strips.iter().map(ReelStrip::len).collect::<Vec<_>>(),
            config.starting_balance
        );

        let state = AccountState {
            balance: config.starting_balance,
            current_wager: config.default_wager,
            last_win: Cents::ZERO,
        };

        Ok(Self {
            window: config.window_spec(),
            config,
            strips,
            account: Mutex::new(Account {
                state,
                phase: RoundPhase::Idle,
                rounds: 0,
            }),
            rng: Mutex::new(rng),
        })
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    /// Working strips (fixed for the lifetime of the machine)
    pub fn strips(&self) -> &[ReelStrip; REEL_COUNT] {
        &self.strips
    }

    pub fn account_state(&self) -> AccountState {
        self.account.lock().state
    }

    pub fn phase(&self) -> RoundPhase {
        self.account.lock().phase
    }

    pub fn rounds_played(&self) -> u64 {
        self.account.lock().rounds
    }

    /// Play one round at `wager`
    pub fn spin(&self, wager: Cents) -> SlotResult<SettlementRecord> {
        Ok(self.begin_round(wager)?.resolve())
    }

    /// Play one round at the current wager
    pub fn spin_current(&self) -> SlotResult<SettlementRecord> {
        let wager = self.account_state().current_wager;
        self.spin(wager)
    }

    /// Validate and debit `wager`, moving the account to `Debited`.
    ///
    /// Rejections leave the account untouched.
    pub fn begin_round(&self, wager: Cents) -> SlotResult<PendingRound<'_>> {
        let mut account = self.account.lock();

        if account.phase != RoundPhase::Idle {
            log::debug!("spin rejected: round in progress");
            return Err(SlotError::RoundInProgress);
        }
        if !self.config.wager_levels.contains(&wager) {
            log::debug!("spin rejected: {wager} is not a wager level");
            return Err(SlotError::InvalidWager {
                wager,
                reason: WagerRejection::NotALevel,
            });
        }
        let balance_before = account.state.balance;
        let Some(balance) = balance_before.checked_sub(wager) else {
            log::debug!("spin rejected: wager {wager} > balance {balance_before}");
            return Err(SlotError::InsufficientFunds {
                wager,
                balance: balance_before,
            });
        };

        account.state.balance = balance;
        account.state.current_wager = wager;
        account.state.last_win = Cents::ZERO;
        account.phase = RoundPhase::Debited;
        account.rounds += 1;

        Ok(PendingRound {
            machine: self,
            round_id: account.rounds,
            wager,
            balance_before,
            settled: false,
        })
    }

    /// Change the wager. Must be a configured level not above the balance.
    pub fn set_wager(&self, wager: Cents) -> SlotResult<()> {
        let mut account = self.account.lock();
        if account.phase != RoundPhase::Idle {
            return Err(SlotError::RoundInProgress);
        }
        if !self.config.wager_levels.contains(&wager) {
            return Err(SlotError::InvalidWager {
                wager,
                reason: WagerRejection::NotALevel,
            });
        }
        if wager > account.state.balance {
            return Err(SlotError::InvalidWager {
                wager,
                reason: WagerRejection::ExceedsBalance,
            });
        }
        account.state.current_wager = wager;
        Ok(())
    }

    /// Step up one level if the balance covers it; otherwise unchanged.
    /// Returns the wager now in effect.
    pub fn increase_wager(&self) -> SlotResult<Cents> {
        let mut account = self.account.lock();
        if account.phase != RoundPhase::Idle {
            return Err(SlotError::RoundInProgress);
        }
        let levels = &self.config.wager_levels;
        let current = account.state.current_wager;
        let next = levels.iter().copied().find(|&level| level > current);
        if let Some(next) = next.filter(|&next| next <= account.state.balance) {
            account.state.current_wager = next;
        }
        Ok(account.state.current_wager)
    }

    /// Step down one level, stopping at the lowest.
    pub fn decrease_wager(&self) -> SlotResult<Cents> {
        let mut account = self.account.lock();
        if account.phase != RoundPhase::Idle {
            return Err(SlotError::RoundInProgress);
        }
        let levels = &self.config.wager_levels;
        let current = account.state.current_wager;
        if let Some(lower) = levels.iter().copied().rev().find(|&level| level < current) {
            account.state.current_wager = lower;
        }
        Ok(account.state.current_wager)
    }

    /// Top up the balance. Returns the new balance.
    pub fn add_balance(&self, amount: Cents) -> SlotResult<Cents> {
        let mut account = self.account.lock();
        if account.phase != RoundPhase::Idle {
            return Err(SlotError::RoundInProgress);
        }
        account.state.balance = account.state.balance.saturating_add(amount);
        Ok(account.state.balance)
    }

    fn settle(&self, round: &PendingRound<'_>) -> SettlementRecord {
        let outcome = {
            let mut rng = self.rng.lock();
            sample(&self.strips, self.window, &mut *rng)
        };
        let evaluation = self.config.paytable.evaluate_outcome(&outcome);
        let credited = evaluation.total.credit(round.wager);

        let matched = evaluation
            .line
            .class
            .zip(evaluation.line.label)
            .map(|(class, label)| MatchedRule {
                class,
                label: label.to_string(),
                multiplier: evaluation.line.multiplier,
            });

        let balance = {
            let mut account = self.account.lock();
            account.state.balance = account.state.balance.saturating_add(credited);
            account.state.last_win = credited;
            account.phase = RoundPhase::Resolved;
            let balance = account.state.balance;
            account.phase = RoundPhase::Idle;
            balance
        };

        let record = SettlementRecord {
            round_id: round.round_id,
            wager: round.wager,
            debited: round.wager,
            balance_before: round.balance_before,
            line: outcome.line,
            outcome,
            matched,
            scatter: evaluation.scatter,
            multiplier: evaluation.total,
            credited,
            balance,
        };

        log::debug!(
            "round {}: {} wager {} → {} ({}), balance {}",
            record.round_id,
            crate::symbols::line_key(&record.line),
            record.wager,
            record.credited,
            record.label().unwrap_or("no win"),
            record.balance
        );

        record
    }

    fn refund(&self, round: &PendingRound<'_>) {
        let mut account = self.account.lock();
        // Only the round still holding the debit is refunded; once settled
        // the phase has moved on
        if account.phase != RoundPhase::Debited || account.rounds != round.round_id {
            return;
        }
        account.state.balance = account.state.balance.saturating_add(round.wager);
        account.phase = RoundPhase::Idle;
        log::warn!(
            "round {} abandoned before resolution, refunded {}",
            round.round_id,
            round.wager
        );
    }
}

/// A debited round awaiting resolution.
///
/// Resolve it with [`PendingRound::resolve`]; dropping it refunds the wager.
#[must_use = "dropping a pending round refunds the wager"]
pub struct PendingRound<'a> {
    machine: &'a SlotMachine,
    round_id: u64,
    wager: Cents,
    balance_before: Cents,
    settled: bool,
}

impl PendingRound<'_> {
    pub fn round_id(&self) -> u64 {
        self.round_id
    }

    pub fn wager(&self) -> Cents {
        self.wager
    }

    /// Draw the outcome, credit the win and return to `Idle`
    pub fn resolve(mut self) -> SettlementRecord {
        let record = self.machine.settle(&self);
        self.settled = true;
        record
    }
}

impl Drop for PendingRound<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.machine.refund(self);
        }
    }
}
