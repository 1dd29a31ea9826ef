//! Table rules and timing for a contest session.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_STARTING_BALANCE: u64 = 100;
pub const DEFAULT_MINIMUM_BET: u64 = 5;
pub const DEFAULT_DECISION_WINDOW_MS: u64 = 10_000;
pub const DEFAULT_NEXT_ROUND_DELAY_MS: u64 = 5_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field} must be > 0")]
    Zero { field: &'static str },
    #[error("starting_balance ({starting_balance}) must be at least minimum_bet ({minimum_bet})")]
    StartingBelowMinimum {
        starting_balance: u64,
        minimum_bet: u64,
    },
}

/// Rules shared by every round of a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContestConfig {
    /// Balance granted to a player the first time the ledger sees them.
    pub starting_balance: u64,
    /// Smallest accepted contest bet; lower requests are raised to it.
    pub minimum_bet: u64,
    /// Length of the decision window.
    pub decision_window_ms: u64,
    /// Pause between a settled round and the next round start.
    pub next_round_delay_ms: u64,
    /// Extra pause before the first round's timer starts (0 disables it).
    pub first_round_sync_ms: u64,
    /// Seed for number draws; drawn from entropy when absent.
    pub seed: Option<u64>,
}

impl Default for ContestConfig {
    fn default() -> Self {
        Self {
            starting_balance: DEFAULT_STARTING_BALANCE,
            minimum_bet: DEFAULT_MINIMUM_BET,
            decision_window_ms: DEFAULT_DECISION_WINDOW_MS,
            next_round_delay_ms: DEFAULT_NEXT_ROUND_DELAY_MS,
            first_round_sync_ms: 0,
            seed: None,
        }
    }
}

impl ContestConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.minimum_bet == 0 {
            return Err(ConfigError::Zero {
                field: "minimum_bet",
            });
        }
        if self.decision_window_ms == 0 {
            return Err(ConfigError::Zero {
                field: "decision_window_ms",
            });
        }
        if self.starting_balance < self.minimum_bet {
            return Err(ConfigError::StartingBelowMinimum {
                starting_balance: self.starting_balance,
                minimum_bet: self.minimum_bet,
            });
        }
        Ok(())
    }

    pub fn decision_window(&self) -> Duration {
        Duration::from_millis(self.decision_window_ms)
    }

    pub fn next_round_delay(&self) -> Duration {
        Duration::from_millis(self.next_round_delay_ms)
    }

    /// Pause before the timer of `round` starts, if any.
    pub fn sync_delay(&self, round: u64) -> Option<Duration> {
        (round == 1 && self.first_round_sync_ms > 0)
            .then(|| Duration::from_millis(self.first_round_sync_ms))
    }
}
