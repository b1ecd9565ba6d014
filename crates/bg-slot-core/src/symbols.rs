//! Symbol vocabulary

use serde::{Deserialize, Serialize};

/// Number of reels on the machine
pub const REEL_COUNT: usize = 3;

/// Symbol type classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SymbolType {
    /// Bar tier (single, double, triple)
    Bar = 0,
    /// Black Gold: wild and jackpot symbol
    Wild = 1,
    /// Pays by count anywhere in the window (when enabled)
    Scatter = 2,
    /// Blank/empty stop
    Blank = 3,
}

/// A reel symbol.
///
/// Symbols carry no value of their own; meaning comes only from the paytable.
/// Serialized with the short codes used on the reel sheets (`1C`, `BG`, `--`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Symbol {
    #[serde(rename = "1C")]
    Bar1,
    #[serde(rename = "2C")]
    Bar2,
    #[serde(rename = "3C")]
    Bar3,
    #[serde(rename = "BG")]
    Wild,
    #[serde(rename = "--")]
    Blank,
    #[serde(rename = "SC")]
    Scatter,
}

/// The evaluated line, one symbol per reel
pub type Line = [Symbol; REEL_COUNT];

impl Symbol {
    pub const ALL: [Symbol; 6] = [
        Symbol::Bar1,
        Symbol::Bar2,
        Symbol::Bar3,
        Symbol::Wild,
        Symbol::Blank,
        Symbol::Scatter,
    ];

    /// Reel-sheet code
    pub const fn code(self) -> &'static str {
        match self {
            Self::Bar1 => "1C",
            Self::Bar2 => "2C",
            Self::Bar3 => "3C",
            Self::Wild => "BG",
            Self::Blank => "--",
            Self::Scatter => "SC",
        }
    }

    pub const fn symbol_type(self) -> SymbolType {
        match self {
            Self::Bar1 | Self::Bar2 | Self::Bar3 => SymbolType::Bar,
            Self::Wild => SymbolType::Wild,
            Self::Scatter => SymbolType::Scatter,
            Self::Blank => SymbolType::Blank,
        }
    }

    /// Bar tier 1..=3, `None` for non-bars
    pub const fn bar_tier(self) -> Option<u8> {
        match self {
            Self::Bar1 => Some(1),
            Self::Bar2 => Some(2),
            Self::Bar3 => Some(3),
            _ => None,
        }
    }

    pub const fn is_bar(self) -> bool {
        self.bar_tier().is_some()
    }

    pub const fn is_wild(self) -> bool {
        matches!(self, Self::Wild)
    }

    pub const fn is_blank(self) -> bool {
        matches!(self, Self::Blank)
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for Symbol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Symbol::ALL
            .into_iter()
            .find(|sym| sym.code() == s)
            .ok_or_else(|| format!("unknown symbol code '{s}'"))
    }
}

/// `1C,2C,BG` style key for a line
pub fn line_key(line: &Line) -> String {
    line.iter().map(|s| s.code()).collect::<Vec<_>>().join(",")
}
