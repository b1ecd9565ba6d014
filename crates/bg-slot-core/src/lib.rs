//! # bg-slot-core: Black Gold outcome and payout engine
//!
//! Models a three-reel stepper: weighted reel strips, a uniform stop sampler,
//! a priority-ordered paytable and the wager settlement state machine.
//!
//! ## Architecture
//!
//! ```text
//! MachineConfig (JSON / YAML / preset)
//!     │
//!     ├── ReelDefinition × 3 ──materialize──> ReelStrip × 3
//!     ├── PayTable (exact → mixed bars → wild+blank, optional scatter)
//!     └── wager levels, targets
//!           │
//!           v
//!     SlotMachine::spin(wager)
//!         Idle → Debited → (sample + evaluate) → Resolved → Idle
//!           │
//!           v
//!     SettlementRecord
//! ```
//!
//! All money is kept in integer cents. Payout multipliers are fixed-point
//! (six decimals) so credited amounts are always floored, never rounded up.

pub mod config;
pub mod engine;
pub mod error;
pub mod money;
pub mod paytable;
pub mod reels;
pub mod spin;
pub mod symbols;

pub use config::*;
pub use engine::*;
pub use error::*;
pub use money::*;
pub use paytable::*;
pub use reels::*;
pub use spin::*;
pub use symbols::*;
