//! Error types for the slot core

use thiserror::Error;

use crate::money::Cents;

/// Why a requested wager was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WagerRejection {
    /// Not one of the configured discrete levels
    NotALevel,
    /// Level exists but exceeds the current balance
    ExceedsBalance,
}

impl std::fmt::Display for WagerRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotALevel => f.write_str("not a configured wager level"),
            Self::ExceedsBalance => f.write_str("exceeds balance"),
        }
    }
}

/// Core error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SlotError {
    /// Reel or paytable configuration violates a certified-model invariant.
    /// Fatal at startup.
    #[error("Invalid definition: {0}")]
    InvalidDefinition(String),

    #[error("Insufficient funds: wager {wager} exceeds balance {balance}")]
    InsufficientFunds { wager: Cents, balance: Cents },

    #[error("Round in progress")]
    RoundInProgress,

    #[error("Invalid wager {wager}: {reason}")]
    InvalidWager { wager: Cents, reason: WagerRejection },

    /// Configuration document could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SlotError {
    pub(crate) fn definition(msg: impl Into<String>) -> Self {
        Self::InvalidDefinition(msg.into())
    }
}

/// Result type alias
pub type SlotResult<T> = Result<T, SlotError>;
