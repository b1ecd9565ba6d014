//! Comparison of measured figures against design targets

use serde::{Deserialize, Serialize};

/// One measured value checked against its target
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetCheck {
    pub target: f64,
    pub actual: f64,
    pub tolerance: f64,
    pub within: bool,
}

impl TargetCheck {
    pub fn new(target: f64, tolerance: f64, actual: f64) -> Self {
        Self {
            target,
            actual,
            tolerance,
            within: (actual - target).abs() <= tolerance,
        }
    }

    pub fn deviation(&self) -> f64 {
        self.actual - self.target
    }

    /// Warn through the log when the check failed
    pub(crate) fn log_outcome(&self, what: &str) {
        if self.within {
            log::info!(
                "{what}: {:.6} within ±{} of target {:.6}",
                self.actual,
                self.tolerance,
                self.target
            );
        } else {
            log::warn!(
                "{what}: {:.6} misses target {:.6} by {:+.6} (tolerance ±{})",
                self.actual,
                self.target,
                self.deviation(),
                self.tolerance
            );
        }
    }
}

/// House exposure derived from the worst session RTP
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Extreme,
}

impl RiskLevel {
    /// `rtp` as a ratio (1.0 = 100%)
    pub fn from_session_rtp(rtp: f64) -> Self {
        if rtp > 1.50 {
            Self::Extreme
        } else if rtp > 1.20 {
            Self::High
        } else if rtp > 1.05 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Extreme => "EXTREME",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_check() {
        assert!(TargetCheck::new(0.9812, 0.0001, 0.98119).within);
        assert!(!TargetCheck::new(0.9812, 0.0001, 0.9815).within);
        let check = TargetCheck::new(0.5, 0.1, 0.45);
        assert!((check.deviation() + 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_risk_thresholds() {
        assert_eq!(RiskLevel::from_session_rtp(0.95), RiskLevel::Low);
        assert_eq!(RiskLevel::from_session_rtp(1.05), RiskLevel::Low);
        assert_eq!(RiskLevel::from_session_rtp(1.06), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_session_rtp(1.21), RiskLevel::High);
        assert_eq!(RiskLevel::from_session_rtp(3.0), RiskLevel::Extreme);
    }
}
