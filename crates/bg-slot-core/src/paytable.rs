//! Paytable and line evaluation
//!
//! Rules are checked in strict priority order and the first match wins:
//!
//! 1. exact three-symbol lines (`BG,BG,BG` before anything generic)
//! 2. mixed bars, parametrised by the position of a single wild
//! 3. wild-with-blanks classes, by wild count
//!
//! Payouts from different rules are never summed for one line. A scatter
//! counted anywhere in the window is a separate payout source, added on top.

use serde::{Deserialize, Serialize};

use crate::error::{SlotError, SlotResult};
use crate::money::Cents;
use crate::spin::SpinOutcome;
use crate::symbols::{Line, Symbol, line_key};

const MICROS_PER_UNIT: u64 = 1_000_000;

/// Payout per one-unit wager, fixed-point with six decimal places.
///
/// Serialized as a plain number (`159`, `7.14`).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "f64", into = "f64")]
pub struct Multiplier(u64);

impl Multiplier {
    pub const ZERO: Self = Self(0);

    pub const fn units(units: u64) -> Self {
        Self(units * MICROS_PER_UNIT)
    }

    pub const fn from_micros(micros: u64) -> Self {
        Self(micros)
    }

    pub const fn micros(self) -> u64 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64 / MICROS_PER_UNIT as f64
    }

    pub fn saturating_add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }

    /// Amount credited for `wager`: `floor(multiplier × wager)` in cents.
    ///
    /// Always rounds down, so the credit never exceeds the exact product.
    pub fn credit(self, wager: Cents) -> Cents {
        let product = u128::from(self.0) * u128::from(wager.get()) / u128::from(MICROS_PER_UNIT);
        Cents(u64::try_from(product).unwrap_or(u64::MAX))
    }
}

impl TryFrom<f64> for Multiplier {
    type Error = SlotError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() || value < 0.0 {
            return Err(SlotError::definition(format!(
                "payout multiplier must be a non-negative number, got {value}"
            )));
        }
        let micros = (value * MICROS_PER_UNIT as f64).round();
        if micros > u64::MAX as f64 {
            return Err(SlotError::definition(format!(
                "payout multiplier {value} is too large"
            )));
        }
        Ok(Self(micros as u64))
    }
}

impl From<Multiplier> for f64 {
    fn from(m: Multiplier) -> Self {
        m.as_f64()
    }
}

impl std::fmt::Display for Multiplier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let whole = self.0 / MICROS_PER_UNIT;
        let frac = self.0 % MICROS_PER_UNIT;
        if frac == 0 {
            write!(f, "{whole}x")
        } else {
            let digits = format!("{frac:06}");
            write!(f, "{whole}.{}x", digits.trim_end_matches('0'))
        }
    }
}

/// Literal three-symbol rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExactRule {
    pub line: Line,
    pub pays: Multiplier,
    pub label: String,
}

impl ExactRule {
    pub fn new(line: Line, pays: u64, label: impl Into<String>) -> Self {
        Self {
            line,
            pays: Multiplier::units(pays),
            label: label.into(),
        }
    }
}

/// "Mixed bars": three bar positions, not all identical.
///
/// The wild variants cover a line with exactly one wild at the given reel,
/// where the two remaining positions are bars of different tiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixedBarRules {
    /// Pay with no wild on the line
    pub pays: Multiplier,
    pub label: String,
    /// Pay for a single wild on reel 0, 1, 2
    pub wild_at: [Multiplier; 3],
    pub wild_label: String,
}

/// Wild appearing only alongside blanks, keyed by the number of wilds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WildBlankRule {
    pub wilds: u8,
    pub pays: Multiplier,
    pub label: String,
}

/// Scatter pay for a count in the full visible window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScatterPay {
    pub count: u8,
    pub pays: Multiplier,
    pub label: String,
}

/// How the scatter symbol pays.
///
/// Exactly one mode is active per machine.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ScatterMode {
    /// Only line patterns pay; nothing is counted off the line
    #[default]
    LineOnly,
    /// `symbol` pays by count anywhere in the window, in addition to the line
    Anywhere {
        symbol: Symbol,
        pays: Vec<ScatterPay>,
    },
}

/// Which rule class produced a line win
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "class", rename_all = "snake_case")]
pub enum RuleClass {
    Exact,
    MixedBars { wild_at: Option<u8> },
    WildWithBlanks { wilds: u8 },
}

/// Result of evaluating a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineEvaluation<'a> {
    pub multiplier: Multiplier,
    pub label: Option<&'a str>,
    pub class: Option<RuleClass>,
}

impl LineEvaluation<'_> {
    fn no_win() -> Self {
        Self {
            multiplier: Multiplier::ZERO,
            label: None,
            class: None,
        }
    }

    pub fn is_win(&self) -> bool {
        !self.multiplier.is_zero()
    }
}

/// Scatter win in the visible window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScatterWin {
    pub symbol: Symbol,
    pub count: u8,
    pub multiplier: Multiplier,
    pub label: String,
}

/// Complete paytable.
///
/// Static, versioned configuration; evaluation never mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayTable {
    /// Paytable revision identifier
    pub version: String,
    /// Exact line rules
    pub exact: Vec<ExactRule>,
    /// Mixed-bar classes (absent = never pays)
    #[serde(default)]
    pub mixed_bars: Option<MixedBarRules>,
    /// Wild-with-blanks classes
    #[serde(default)]
    pub wild_blanks: Vec<WildBlankRule>,
    /// Scatter handling
    #[serde(default)]
    pub scatter: ScatterMode,
}

impl PayTable {
    /// Check rule consistency: no duplicate exact lines or wild counts,
    /// wild counts within the line, scatter counts positive and unique.
    pub fn validate(&self) -> SlotResult<()> {
        for (i, rule) in self.exact.iter().enumerate() {
            if self.exact[..i].iter().any(|r| r.line == rule.line) {
                return Err(SlotError::definition(format!(
                    "paytable {}: exact line {} defined twice",
                    self.version,
                    line_key(&rule.line)
                )));
            }
        }

        for (i, rule) in self.wild_blanks.iter().enumerate() {
            if rule.wilds == 0 || rule.wilds as usize > crate::symbols::REEL_COUNT {
                return Err(SlotError::definition(format!(
                    "paytable {}: wild+blank rule needs 1..=3 wilds, got {}",
                    self.version, rule.wilds
                )));
            }
            if self.wild_blanks[..i].iter().any(|r| r.wilds == rule.wilds) {
                return Err(SlotError::definition(format!(
                    "paytable {}: wild+blank rule for {} wilds defined twice",
                    self.version, rule.wilds
                )));
            }
        }

        if let ScatterMode::Anywhere { symbol, pays } = &self.scatter {
            if symbol.is_wild() || symbol.is_blank() {
                return Err(SlotError::definition(format!(
                    "paytable {}: {symbol} cannot be the scatter symbol",
                    self.version
                )));
            }
            for (i, pay) in pays.iter().enumerate() {
                if pay.count == 0 || pays[..i].iter().any(|p| p.count == pay.count) {
                    return Err(SlotError::definition(format!(
                        "paytable {}: invalid or repeated scatter count {}",
                        self.version, pay.count
                    )));
                }
            }
        }

        Ok(())
    }

    /// Evaluate the line. First matching class wins; no match pays zero.
    pub fn evaluate(&self, line: &Line) -> LineEvaluation<'_> {
        if let Some(rule) = self.exact.iter().find(|r| &r.line == line) {
            return LineEvaluation {
                multiplier: rule.pays,
                label: Some(&rule.label),
                class: Some(RuleClass::Exact),
            };
        }

        if let Some(eval) = self.evaluate_mixed_bars(line) {
            return eval;
        }

        if let Some(eval) = self.evaluate_wild_blanks(line) {
            return eval;
        }

        LineEvaluation::no_win()
    }

    fn evaluate_mixed_bars(&self, line: &Line) -> Option<LineEvaluation<'_>> {
        let rules = self.mixed_bars.as_ref()?;
        let mut wilds = line.iter().enumerate().filter(|(_, s)| s.is_wild());

        match (wilds.next(), wilds.next()) {
            (None, _) => {
                let all_bars = line.iter().all(|s| s.is_bar());
                let all_same = line[0] == line[1] && line[1] == line[2];
                (all_bars && !all_same).then_some(LineEvaluation {
                    multiplier: rules.pays,
                    label: Some(&rules.label),
                    class: Some(RuleClass::MixedBars { wild_at: None }),
                })
            }
            (Some((wild_at, _)), None) => {
                let mut others = line
                    .iter()
                    .enumerate()
                    .filter(|&(i, _)| i != wild_at)
                    .map(|(_, &s)| s);
                let (a, b) = (others.next()?, others.next()?);
                (a.is_bar() && b.is_bar() && a != b).then_some(LineEvaluation {
                    multiplier: rules.wild_at[wild_at],
                    label: Some(&rules.wild_label),
                    class: Some(RuleClass::MixedBars {
                        wild_at: Some(wild_at as u8),
                    }),
                })
            }
            _ => None,
        }
    }

    fn evaluate_wild_blanks(&self, line: &Line) -> Option<LineEvaluation<'_>> {
        if !line.iter().all(|s| s.is_wild() || s.is_blank()) {
            return None;
        }
        let wilds = line.iter().filter(|s| s.is_wild()).count() as u8;
        let rule = self.wild_blanks.iter().find(|r| r.wilds == wilds)?;
        Some(LineEvaluation {
            multiplier: rule.pays,
            label: Some(&rule.label),
            class: Some(RuleClass::WildWithBlanks { wilds }),
        })
    }

    /// Count the scatter symbol across the whole window (reels × rows).
    ///
    /// Pays the entry with the largest count not exceeding the number found.
    /// Always `None` in `LineOnly` mode.
    pub fn evaluate_scatter<W: AsRef<[Symbol]>>(&self, window: &[W]) -> Option<ScatterWin> {
        let ScatterMode::Anywhere { symbol, pays } = &self.scatter else {
            return None;
        };

        let found = window
            .iter()
            .flat_map(|column| column.as_ref().iter())
            .filter(|&&s| s == *symbol)
            .count();
        let count = u8::try_from(found).unwrap_or(u8::MAX);

        pays.iter()
            .filter(|p| p.count <= count)
            .max_by_key(|p| p.count)
            .filter(|p| !p.pays.is_zero())
            .map(|p| ScatterWin {
                symbol: *symbol,
                count,
                multiplier: p.pays,
                label: p.label.clone(),
            })
    }

    /// Evaluate a sampled outcome: the line plus, when enabled, the scatter.
    ///
    /// The two sources are summed into `total` before any rounding.
    pub fn evaluate_outcome(&self, outcome: &SpinOutcome) -> OutcomeEvaluation<'_> {
        let line = self.evaluate(&outcome.line);
        let scatter = self.evaluate_scatter(&outcome.windows());
        let total = scatter
            .as_ref()
            .map(|s| s.multiplier)
            .unwrap_or_default()
            .saturating_add(line.multiplier);
        OutcomeEvaluation {
            line,
            scatter,
            total,
        }
    }
}

/// Combined line and scatter evaluation for one outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeEvaluation<'a> {
    pub line: LineEvaluation<'a>,
    pub scatter: Option<ScatterWin>,
    pub total: Multiplier,
}

impl OutcomeEvaluation<'_> {
    pub fn is_win(&self) -> bool {
        !self.total.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MachineConfig;
    use Symbol::{Bar1, Bar2, Bar3, Blank, Scatter, Wild};

    fn black_gold() -> PayTable {
        MachineConfig::black_gold().paytable
    }

    #[test]
    fn test_jackpot_is_exact() {
        let table = black_gold();
        let eval = table.evaluate(&[Wild, Wild, Wild]);
        assert_eq!(eval.multiplier, Multiplier::units(2500));
        assert_eq!(eval.class, Some(RuleClass::Exact));
        assert_eq!(eval.label, Some("BLACK GOLD JACKPOT"));
    }

    #[test]
    fn test_three_tiers_are_mixed_bars() {
        let table = black_gold();
        let eval = table.evaluate(&[Bar1, Bar2, Bar3]);
        assert_eq!(eval.multiplier, Multiplier::units(7));
        assert_eq!(eval.class, Some(RuleClass::MixedBars { wild_at: None }));
        assert_eq!(eval.label, Some("MIXED BARS"));
    }

    #[test]
    fn test_mixed_bars_by_wild_position() {
        let table = black_gold();
        let cases = [
            ([Wild, Bar1, Bar2], 0, 10),
            ([Bar3, Wild, Bar1], 1, 10),
            ([Bar2, Bar1, Wild], 2, 9),
        ];
        for (line, pos, pays) in cases {
            let eval = table.evaluate(&line);
            assert_eq!(eval.multiplier, Multiplier::units(pays), "{}", line_key(&line));
            assert_eq!(eval.class, Some(RuleClass::MixedBars { wild_at: Some(pos) }));
        }
    }

    #[test]
    fn test_same_bars_with_wild_use_exact_rule() {
        let table = black_gold();
        let eval = table.evaluate(&[Bar1, Bar1, Wild]);
        assert_eq!(eval.multiplier, Multiplier::units(3));
        assert_eq!(eval.class, Some(RuleClass::Exact));
        assert_eq!(table.evaluate(&[Bar3, Wild, Wild]).multiplier, Multiplier::units(16));
    }

    #[test]
    fn test_wild_with_blanks() {
        let table = black_gold();
        for line in [[Wild, Wild, Blank], [Blank, Wild, Wild], [Wild, Blank, Wild]] {
            let eval = table.evaluate(&line);
            assert_eq!(eval.multiplier, Multiplier::units(7));
            assert_eq!(eval.class, Some(RuleClass::WildWithBlanks { wilds: 2 }));
        }
        for line in [[Wild, Blank, Blank], [Blank, Blank, Wild], [Blank, Wild, Blank]] {
            assert_eq!(table.evaluate(&line).multiplier, Multiplier::units(3));
        }
    }

    #[test]
    fn test_losing_lines() {
        let table = black_gold();
        for line in [
            [Blank, Blank, Blank],
            [Bar1, Bar1, Blank],
            [Bar1, Wild, Blank],
            [Bar1, Bar2, Blank],
            [Blank, Bar3, Wild],
        ] {
            let eval = table.evaluate(&line);
            assert!(!eval.is_win(), "{}", line_key(&line));
            assert_eq!(eval.label, None);
        }
    }

    #[test]
    fn test_exact_rule_beats_generic() {
        let mut table = black_gold();
        table.exact.push(ExactRule::new([Bar1, Bar2, Bar3], 50, "RAINBOW"));
        table.validate().unwrap();

        let eval = table.evaluate(&[Bar1, Bar2, Bar3]);
        assert_eq!(eval.multiplier, Multiplier::units(50));
        assert_eq!(eval.label, Some("RAINBOW"));
        // Other mixed lines still use the generic class
        assert_eq!(table.evaluate(&[Bar3, Bar2, Bar1]).multiplier, Multiplier::units(7));
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let mut table = black_gold();
        table.exact.push(ExactRule::new([Wild, Wild, Wild], 1, "DUP"));
        assert!(matches!(table.validate(), Err(SlotError::InvalidDefinition(_))));

        let mut table = black_gold();
        table.wild_blanks.push(WildBlankRule {
            wilds: 0,
            pays: Multiplier::units(1),
            label: "NONE".into(),
        });
        assert!(table.validate().is_err());
    }

    #[test]
    fn test_scatter_anywhere() {
        let mut table = black_gold();
        assert!(table.evaluate_scatter(&[vec![Scatter; 3]]).is_none());

        table.scatter = ScatterMode::Anywhere {
            symbol: Scatter,
            pays: vec![
                ScatterPay {
                    count: 2,
                    pays: Multiplier::units(1),
                    label: "TWO SCATTERS".into(),
                },
                ScatterPay {
                    count: 3,
                    pays: Multiplier::units(5),
                    label: "THREE SCATTERS".into(),
                },
            ],
        };
        table.validate().unwrap();

        let window = vec![
            vec![Scatter, Blank, Bar1],
            vec![Blank, Blank, Blank],
            vec![Bar2, Blank, Blank],
        ];
        assert!(table.evaluate_scatter(&window).is_none());

        let window = vec![
            vec![Scatter, Blank, Bar1],
            vec![Blank, Scatter, Blank],
            vec![Scatter, Blank, Scatter],
        ];
        let win = table.evaluate_scatter(&window).unwrap();
        assert_eq!(win.count, 4);
        assert_eq!(win.multiplier, Multiplier::units(5));
        assert_eq!(win.label, "THREE SCATTERS");
    }

    #[test]
    fn test_credit_rounds_down() {
        let m = Multiplier::try_from(7.14).unwrap();
        assert_eq!(m.credit(Cents(100)), Cents(714));
        assert_eq!(m.credit(Cents(1)), Cents(7));
        assert_eq!(m.credit(Cents(10)), Cents(71));

        let m = Multiplier::try_from(0.333333).unwrap();
        assert_eq!(m.credit(Cents(100)), Cents(33));
        assert_eq!(Multiplier::ZERO.credit(Cents(10_000)), Cents::ZERO);
    }

    #[test]
    fn test_credit_never_exceeds_exact_product() {
        for micros in [0, 1, 999_999, 1_000_001, 3_500_000, 159_600_000, 2_500_000_000] {
            let m = Multiplier::from_micros(micros);
            for wager in [0, 1, 5, 10, 25, 50, 100, 250, 7_500, 10_000] {
                let credited = m.credit(Cents(wager)).get();
                let exact_micro_cents = u128::from(micros) * u128::from(wager);
                assert!(u128::from(credited) * 1_000_000 <= exact_micro_cents);
                assert!(u128::from(credited + 1) * 1_000_000 > exact_micro_cents);
            }
        }
    }

    #[test]
    fn test_multiplier_serde() {
        let m: Multiplier = serde_json::from_str("10.36").unwrap();
        assert_eq!(m.micros(), 10_360_000);
        assert_eq!(serde_json::to_string(&Multiplier::units(7)).unwrap(), "7.0");
        assert!(serde_json::from_str::<Multiplier>("-1").is_err());
        assert_eq!(m.to_string(), "10.36x");
    }
}
