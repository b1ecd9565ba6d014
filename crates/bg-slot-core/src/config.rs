//! Machine configuration
//!
//! One versioned document describes a machine: reel multisets, paytable,
//! window shape, wager ladder and the math targets the verifier checks.
//! Loadable from JSON or YAML; `MachineConfig::black_gold()` is the built-in
//! certified model.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{SlotError, SlotResult};
use crate::money::{Cents, default_wager_levels};
use crate::paytable::{ExactRule, MixedBarRules, Multiplier, PayTable, ScatterMode, WildBlankRule};
use crate::reels::ReelDefinition;
use crate::spin::WindowSpec;
use crate::symbols::{REEL_COUNT, Symbol};

/// Symbol counts for one reel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReelConfig {
    /// Declared strip length
    pub length: usize,
    /// Occurrences per symbol (must sum to `length`)
    pub counts: BTreeMap<Symbol, i64>,
}

/// Design targets validated by the verifier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RtpTargets {
    /// Target return to player (0.9812 = 98.12%)
    pub rtp: f64,
    pub rtp_tolerance: f64,
    /// Target fraction of rounds with a nonzero payout
    pub hit_frequency: f64,
    pub hit_frequency_tolerance: f64,
}

/// Monte-Carlo reporting parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Sliding session lengths (rounds) for drawdown analysis
    pub session_sizes: Vec<u64>,
    /// Record running RTP every this many rounds
    pub checkpoint_interval: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            session_sizes: vec![100, 1_000, 10_000],
            checkpoint_interval: 10_000,
        }
    }
}

/// Full machine definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineConfig {
    pub name: String,
    pub version: String,
    /// Visible rows per reel
    #[serde(default = "default_rows")]
    pub rows: usize,
    /// Row index of the evaluated line
    #[serde(default = "default_line_row")]
    pub line_row: usize,
    pub reels: Vec<ReelConfig>,
    pub paytable: PayTable,
    /// Discrete wager levels, ascending
    #[serde(default = "default_wager_levels")]
    pub wager_levels: Vec<Cents>,
    pub default_wager: Cents,
    pub starting_balance: Cents,
    pub targets: RtpTargets,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

fn default_rows() -> usize {
    WindowSpec::CLASSIC.rows
}

fn default_line_row() -> usize {
    WindowSpec::CLASSIC.line_row
}

impl MachineConfig {
    /// Black Gold S62M3X: three 72-stop reels, one-coin paytable
    pub fn black_gold() -> Self {
        use Symbol::{Bar1, Bar2, Bar3, Blank, Wild};

        let reel = |bar1, bar2, bar3, wild, blank| ReelConfig {
            length: 72,
            counts: BTreeMap::from([
                (Bar1, bar1),
                (Bar2, bar2),
                (Bar3, bar3),
                (Wild, wild),
                (Blank, blank),
            ]),
        };

        let mut exact = vec![
            ExactRule::new([Wild, Wild, Wild], 2500, "BLACK GOLD JACKPOT"),
            ExactRule::new([Bar3, Bar3, Bar3], 159, "TRIPLE BARS"),
        ];
        exact.extend(wild_combos(Bar3, 16));
        exact.push(ExactRule::new([Bar2, Bar2, Bar2], 14, "DOUBLE BARS"));
        exact.extend(wild_combos(Bar2, 14));
        exact.push(ExactRule::new([Bar1, Bar1, Bar1], 28, "SINGLE BARS"));
        exact.extend(wild_combos(Bar1, 3));

        Self {
            name: "Black Gold".into(),
            version: "S62M3X".into(),
            rows: 3,
            line_row: 1,
            reels: vec![
                reel(16, 13, 6, 1, 36),
                reel(18, 7, 4, 1, 42),
                reel(20, 4, 3, 1, 44),
            ],
            paytable: PayTable {
                version: "S62M3X-1coin".into(),
                exact,
                mixed_bars: Some(MixedBarRules {
                    pays: Multiplier::units(7),
                    label: "MIXED BARS".into(),
                    wild_at: [
                        Multiplier::units(10),
                        Multiplier::units(10),
                        Multiplier::units(9),
                    ],
                    wild_label: "MIXED BARS + BLACK GOLD".into(),
                }),
                wild_blanks: vec![
                    WildBlankRule {
                        wilds: 2,
                        pays: Multiplier::units(7),
                        label: "BLACK GOLD COMBO".into(),
                    },
                    WildBlankRule {
                        wilds: 1,
                        pays: Multiplier::units(3),
                        label: "BLACK GOLD COMBO".into(),
                    },
                ],
                scatter: ScatterMode::LineOnly,
            },
            wager_levels: default_wager_levels(),
            default_wager: Cents::dollars(1),
            starting_balance: Cents::dollars(100),
            targets: RtpTargets {
                rtp: 0.9812,
                rtp_tolerance: 0.0001,
                hit_frequency: 0.0946,
                hit_frequency_tolerance: 0.0001,
            },
            simulation: SimulationConfig::default(),
        }
    }

    pub fn window_spec(&self) -> WindowSpec {
        WindowSpec {
            rows: self.rows,
            line_row: self.line_row,
        }
    }

    /// Validated reel definitions, one per reel
    pub fn reel_definitions(&self) -> SlotResult<[ReelDefinition; REEL_COUNT]> {
        if self.reels.len() != REEL_COUNT {
            return Err(SlotError::definition(format!(
                "{}: expected {REEL_COUNT} reels, found {}",
                self.name,
                self.reels.len()
            )));
        }
        let [r0, r1, r2] = [0, 1, 2].map(|i| {
            let reel = &self.reels[i];
            ReelDefinition::define(i as u8, reel.length, reel.counts.clone())
        });
        Ok([r0?, r1?, r2?])
    }

    /// Check every invariant the engine relies on.
    pub fn validate(&self) -> SlotResult<()> {
        self.window_spec().validate()?;
        self.reel_definitions()?;
        self.paytable.validate()?;

        if self.wager_levels.is_empty() {
            return Err(SlotError::definition("at least one wager level is required"));
        }
        if self.wager_levels.iter().any(|w| w.is_zero()) {
            return Err(SlotError::definition("wager levels must be positive"));
        }
        if !self.wager_levels.windows(2).all(|w| w[0] < w[1]) {
            return Err(SlotError::definition(
                "wager levels must be strictly ascending",
            ));
        }
        if !self.wager_levels.contains(&self.default_wager) {
            return Err(SlotError::definition(format!(
                "default wager {} is not a wager level",
                self.default_wager
            )));
        }

        let t = &self.targets;
        let ratio = |v: f64| v.is_finite() && v >= 0.0;
        if !(ratio(t.rtp) && ratio(t.rtp_tolerance))
            || !(ratio(t.hit_frequency) && t.hit_frequency <= 1.0)
            || !ratio(t.hit_frequency_tolerance)
        {
            return Err(SlotError::definition("targets must be finite, non-negative ratios"));
        }

        let sim = &self.simulation;
        if sim.checkpoint_interval == 0 || sim.session_sizes.iter().any(|&s| s == 0) {
            return Err(SlotError::definition(
                "session sizes and checkpoint interval must be positive",
            ));
        }

        Ok(())
    }

    pub fn from_json(json: &str) -> SlotResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| SlotError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> SlotResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| SlotError::Config(e.to_string()))
    }

    pub fn from_yaml(yaml: &str) -> SlotResult<Self> {
        let config: Self =
            serde_yml::from_str(yaml).map_err(|e| SlotError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> SlotResult<String> {
        serde_yml::to_string(self).map_err(|e| SlotError::Config(e.to_string()))
    }

    /// Load by file extension (`.json`, `.yaml`, `.yml`)
    pub fn load(path: impl AsRef<Path>) -> SlotResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| SlotError::Config(format!("{}: {e}", path.display())))?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&text),
            Some("yaml" | "yml") => Self::from_yaml(&text),
            other => Err(SlotError::Config(format!(
                "{}: unsupported config format {:?}",
                path.display(),
                other.unwrap_or("")
            ))),
        }
    }
}

/// The six lines mixing `bar` with the wild: one bar + two wilds and two bars + one wild
fn wild_combos(bar: Symbol, pays: u64) -> Vec<ExactRule> {
    let w = Symbol::Wild;
    [
        [bar, w, w],
        [w, bar, w],
        [w, w, bar],
        [bar, bar, w],
        [bar, w, bar],
        [w, bar, bar],
    ]
    .into_iter()
    .map(|line| ExactRule::new(line, pays, "BLACK GOLD COMBO"))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_black_gold_is_valid() {
        let config = MachineConfig::black_gold();
        config.validate().unwrap();
        assert_eq!(config.paytable.exact.len(), 22);

        let defs = config.reel_definitions().unwrap();
        assert_eq!(defs[1].count(Symbol::Blank), 42);
        assert_eq!(defs[2].count(Symbol::Bar1), 20);
        assert!(defs.iter().all(|d| d.length() == 72 && d.count(Symbol::Wild) == 1));
    }

    #[test]
    fn test_json_round_trip() {
        let config = MachineConfig::black_gold();
        let json = config.to_json().unwrap();
        assert!(json.contains("\"BG\""));
        let back = MachineConfig::from_json(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = MachineConfig::black_gold();
        let yaml = config.to_yaml().unwrap();
        let back = MachineConfig::from_yaml(&yaml).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_reel_sum_mismatch_rejected() {
        let mut config = MachineConfig::black_gold();
        config.reels[2].counts.insert(Symbol::Blank, 43);
        assert!(matches!(config.validate(), Err(SlotError::InvalidDefinition(_))));
    }

    #[test]
    fn test_reel_count_rejected() {
        let mut config = MachineConfig::black_gold();
        config.reels.pop();
        assert!(matches!(config.validate(), Err(SlotError::InvalidDefinition(_))));
    }

    #[test]
    fn test_wager_ladder_rules() {
        let mut config = MachineConfig::black_gold();
        config.default_wager = Cents(3);
        assert!(config.validate().is_err());

        let mut config = MachineConfig::black_gold();
        config.wager_levels = vec![Cents(100), Cents(50)];
        config.default_wager = Cents(100);
        assert!(config.validate().is_err());

        let mut config = MachineConfig::black_gold();
        config.wager_levels.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_window_rules() {
        let mut config = MachineConfig::black_gold();
        config.line_row = 3;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_minimal_json_uses_defaults() {
        let json = r#"{
            "name": "Mini",
            "version": "1",
            "reels": [
                {"length": 2, "counts": {"BG": 1, "--": 1}},
                {"length": 2, "counts": {"BG": 1, "--": 1}},
                {"length": 2, "counts": {"BG": 1, "--": 1}}
            ],
            "paytable": {
                "version": "mini-1",
                "exact": [{"line": ["BG", "BG", "BG"], "pays": 8, "label": "JACKPOT"}]
            },
            "default_wager": 100,
            "starting_balance": 1000,
            "targets": {
                "rtp": 1.0, "rtp_tolerance": 0.0,
                "hit_frequency": 0.125, "hit_frequency_tolerance": 0.0
            }
        }"#;
        let config = MachineConfig::from_json(json).unwrap();
        assert_eq!(config.window_spec(), WindowSpec::CLASSIC);
        assert_eq!(config.wager_levels, default_wager_levels());
        assert_eq!(config.paytable.scatter, ScatterMode::LineOnly);
        assert!(config.paytable.mixed_bars.is_none());
    }

    #[test]
    fn test_bad_json_is_config_error() {
        assert!(matches!(
            MachineConfig::from_json("{ not json"),
            Err(SlotError::Config(_))
        ));
    }

    #[test]
    fn test_load_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let json = MachineConfig::black_gold().to_json().unwrap();

        let json_path = dir.path().join("machine.json");
        std::fs::write(&json_path, &json).unwrap();
        assert_eq!(MachineConfig::load(&json_path).unwrap(), MachineConfig::black_gold());

        let yaml_path = dir.path().join("machine.yml");
        std::fs::write(&yaml_path, MachineConfig::black_gold().to_yaml().unwrap()).unwrap();
        assert_eq!(MachineConfig::load(&yaml_path).unwrap(), MachineConfig::black_gold());

        // Readable file, valid content, unsupported extension
        let toml_path = dir.path().join("machine.toml");
        std::fs::write(&toml_path, &json).unwrap();
        match MachineConfig::load(&toml_path).unwrap_err() {
            SlotError::Config(msg) => assert!(msg.contains("unsupported config format"), "{msg}"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = MachineConfig::load(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, SlotError::Config(_)));
    }
}
