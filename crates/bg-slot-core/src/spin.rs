//! Spin sampling
//!
//! One uniform, independent stop per reel; the visible window is read with
//! wraparound and the evaluated line is a fixed row of that window.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{SlotError, SlotResult};
use crate::reels::ReelStrip;
use crate::symbols::{Line, REEL_COUNT, Symbol};

/// Visible window shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSpec {
    /// Symbols visible per reel
    pub rows: usize,
    /// Row that forms the evaluated line
    pub line_row: usize,
}

impl WindowSpec {
    /// Classic stepper: three rows, middle row pays
    pub const CLASSIC: Self = Self {
        rows: 3,
        line_row: 1,
    };

    pub fn new(rows: usize, line_row: usize) -> SlotResult<Self> {
        let spec = Self { rows, line_row };
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> SlotResult<()> {
        if self.rows == 0 {
            return Err(SlotError::definition("window must show at least one row"));
        }
        if self.line_row >= self.rows {
            return Err(SlotError::definition(format!(
                "line row {} outside a {}-row window",
                self.line_row, self.rows
            )));
        }
        Ok(())
    }
}

impl Default for WindowSpec {
    fn default() -> Self {
        Self::CLASSIC
    }
}

/// Where one reel stopped and what it shows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReelStop {
    pub reel_index: u8,
    /// Stop position, `0 <= position < strip length`
    pub position: usize,
    /// Visible symbols, top to bottom
    pub window: Vec<Symbol>,
}

/// Result of one spin before evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpinOutcome {
    pub stops: [ReelStop; REEL_COUNT],
    /// Evaluated line
    pub line: Line,
}

impl SpinOutcome {
    /// Outcome for fixed stop positions. Used by sampling and by enumeration.
    pub fn at(
        strips: &[ReelStrip; REEL_COUNT],
        positions: [usize; REEL_COUNT],
        window: WindowSpec,
    ) -> Self {
        let stops: [ReelStop; REEL_COUNT] = std::array::from_fn(|reel| {
            let strip = &strips[reel];
            let position = positions[reel] % strip.len();
            ReelStop {
                reel_index: strip.reel_index,
                position,
                window: strip.window(position, window.rows),
            }
        });
        let line = std::array::from_fn(|reel| stops[reel].window[window.line_row]);
        Self { stops, line }
    }

    pub fn positions(&self) -> [usize; REEL_COUNT] {
        std::array::from_fn(|reel| self.stops[reel].position)
    }

    /// Per-reel visible windows
    pub fn windows(&self) -> Vec<&[Symbol]> {
        self.stops.iter().map(|stop| stop.window.as_slice()).collect()
    }
}

/// Draw a stop for each reel independently and uniformly over its length.
pub fn sample<R: Rng + ?Sized>(
    strips: &[ReelStrip; REEL_COUNT],
    window: WindowSpec,
    rng: &mut R,
) -> SpinOutcome {
    let positions = std::array::from_fn(|reel| rng.random_range(0..strips[reel].len()));
    SpinOutcome::at(strips, positions, window)
}
