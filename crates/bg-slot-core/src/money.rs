//! Integer money

use serde::{Deserialize, Serialize};

/// An amount of money in whole cents.
///
/// Balances, wagers and credits never leave integer cents, so repeated rounds
/// cannot accumulate floating drift.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Cents(pub u64);

impl Cents {
    pub const ZERO: Self = Self(0);

    /// Whole dollars
    pub const fn dollars(dollars: u64) -> Self {
        Self(dollars * 100)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Value in dollars, for display and ratios only
    pub fn as_dollars(self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }

    pub fn saturating_add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl From<u64> for Cents {
    fn from(cents: u64) -> Self {
        Self(cents)
    }
}

impl std::fmt::Display for Cents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "${}.{:02}", self.0 / 100, self.0 % 100)
    }
}

/// Default wager ladder: $0.01 up to $100.00
pub fn default_wager_levels() -> Vec<Cents> {
    [1, 5, 10, 25, 50, 100, 200, 500, 1_000, 2_500, 5_000, 7_500, 10_000]
        .into_iter()
        .map(Cents)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Cents(0).to_string(), "$0.00");
        assert_eq!(Cents(5).to_string(), "$0.05");
        assert_eq!(Cents(150).to_string(), "$1.50");
        assert_eq!(Cents::dollars(100).to_string(), "$100.00");
    }

    #[test]
    fn test_checked_sub() {
        assert_eq!(Cents(100).checked_sub(Cents(50)), Some(Cents(50)));
        assert_eq!(Cents(50).checked_sub(Cents(100)), None);
    }

    #[test]
    fn test_default_levels_ascending() {
        let levels = default_wager_levels();
        assert_eq!(levels.first(), Some(&Cents(1)));
        assert_eq!(levels.last(), Some(&Cents::dollars(100)));
        assert!(levels.windows(2).all(|w| w[0] < w[1]));
    }
}
