//! Reel definitions and reel strips

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{SlotError, SlotResult};
use crate::symbols::Symbol;

/// Certified symbol multiset for one reel.
///
/// Immutable once defined: counts always sum to the strip length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReelDefinition {
    index: u8,
    length: usize,
    counts: BTreeMap<Symbol, u32>,
}

impl ReelDefinition {
    /// Define a reel from `(symbol, count)` pairs.
    ///
    /// Fails with `InvalidDefinition` on a negative count, a repeated symbol,
    /// a zero length, or counts that do not sum to `length`.
    pub fn define(
        index: u8,
        length: usize,
        symbol_counts: impl IntoIterator<Item = (Symbol, i64)>,
    ) -> SlotResult<Self> {
        if length == 0 {
            return Err(SlotError::definition(format!(
                "reel {index}: strip length must be positive"
            )));
        }

        let mut counts = BTreeMap::new();
        let mut total: u64 = 0;
        for (symbol, count) in symbol_counts {
            if count < 0 {
                return Err(SlotError::definition(format!(
                    "reel {index}: count for {symbol} is negative ({count})"
                )));
            }
            let count = u32::try_from(count).map_err(|_| {
                SlotError::definition(format!("reel {index}: count for {symbol} is too large"))
            })?;
            if counts.insert(symbol, count).is_some() {
                return Err(SlotError::definition(format!(
                    "reel {index}: symbol {symbol} listed twice"
                )));
            }
            total += u64::from(count);
        }
        counts.retain(|_, c| *c > 0);

        if total != length as u64 {
            return Err(SlotError::definition(format!(
                "reel {index}: counts sum to {total}, strip length is {length}"
            )));
        }

        Ok(Self {
            index,
            length,
            counts,
        })
    }

    pub fn index(&self) -> u8 {
        self.index
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn counts(&self) -> &BTreeMap<Symbol, u32> {
        &self.counts
    }

    pub fn count(&self, symbol: Symbol) -> u32 {
        self.counts.get(&symbol).copied().unwrap_or(0)
    }

    /// Unshuffled strip: each symbol's run laid out in vocabulary order
    pub fn canonical_strip(&self) -> ReelStrip {
        let mut symbols = Vec::with_capacity(self.length);
        for (&symbol, &count) in &self.counts {
            symbols.extend(std::iter::repeat_n(symbol, count as usize));
        }
        ReelStrip {
            reel_index: self.index,
            symbols,
        }
    }

    /// Check that `strip` is an ordering of this reel's multiset.
    pub fn check_strip(&self, strip: &ReelStrip) -> SlotResult<()> {
        if strip.len() != self.length {
            return Err(SlotError::definition(format!(
                "reel {}: strip has {} stops, definition has {}",
                self.index,
                strip.len(),
                self.length
            )));
        }
        if strip.multiset() != self.counts {
            return Err(SlotError::definition(format!(
                "reel {}: strip symbols differ from the defined counts",
                self.index
            )));
        }
        Ok(())
    }

    /// Permute the multiset into a working strip with a Fisher–Yates shuffle.
    ///
    /// Every permutation is equally likely given a uniform `rng`; the symbol
    /// multiset is preserved exactly.
    pub fn materialize<R: Rng + ?Sized>(&self, rng: &mut R) -> ReelStrip {
        let mut strip = self.canonical_strip();
        for i in (1..strip.symbols.len()).rev() {
            let j = rng.random_range(0..=i);
            strip.symbols.swap(i, j);
        }
        strip
    }
}

/// A concrete reel strip.
///
/// Never rewritten after creation; spinning repositions, it does not reorder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawReelStrip")]
pub struct ReelStrip {
    /// Reel index
    pub reel_index: u8,
    /// Symbols in strip order
    symbols: Vec<Symbol>,
}

#[derive(Deserialize)]
struct RawReelStrip {
    reel_index: u8,
    symbols: Vec<Symbol>,
}

impl TryFrom<RawReelStrip> for ReelStrip {
    type Error = SlotError;

    fn try_from(raw: RawReelStrip) -> SlotResult<Self> {
        Self::new(raw.reel_index, raw.symbols)
    }
}

impl ReelStrip {
    /// Strip in the given order. Fails with `InvalidDefinition` when empty.
    pub fn new(reel_index: u8, symbols: Vec<Symbol>) -> SlotResult<Self> {
        if symbols.is_empty() {
            return Err(SlotError::definition(format!(
                "reel {reel_index}: strip has no stops"
            )));
        }
        Ok(Self {
            reel_index,
            symbols,
        })
    }

    /// Symbol at position (wraps around). Strips are never empty.
    pub fn symbol_at(&self, position: usize) -> Symbol {
        self.symbols[position % self.symbols.len()]
    }

    /// `rows` consecutive symbols starting at `position`, wrapping past the end
    pub fn window(&self, position: usize, rows: usize) -> Vec<Symbol> {
        (0..rows).map(|row| self.symbol_at(position + row)).collect()
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Symbol counts on this strip
    pub fn multiset(&self) -> BTreeMap<Symbol, u32> {
        let mut counts = BTreeMap::new();
        for &symbol in &self.symbols {
            *counts.entry(symbol).or_insert(0) += 1;
        }
        counts
    }
}
