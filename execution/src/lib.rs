//! Number contest execution layer.
//!
//! This crate contains the authoritative round state machine ([`ContestRound`])
//! and the session chip ledger ([`ChipLedger`]) that the table host drives, plus
//! the rules and score counters of the dice side game.
//!
//! ## Determinism requirements
//! - Do not read wall-clock time inside the round; the host owns all timers.
//! - Only draw randomness through [`NumberDraw`], so tests can fix the deal.
//! - Iterate players in `PlayerId` order (all per-round maps are `BTreeMap`s).
//!
//! ## Settlement invariants
//! Balances move only inside [`ContestRound::resolve`]. The pot always equals the
//! sum of recorded contest bets, and it is credited in full to a single winner
//! (or to nobody when no one contested).

pub mod config;
pub mod dice;
pub mod draw;
pub mod ledger;
pub mod round;
pub mod score;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;


pub use config::{ConfigError, ContestConfig};
pub use dice::{DiceOutcome, DiceRoll, DiceRules};
pub use draw::{NumberDraw, SeededDraw};
pub use ledger::{ChipLedger, LedgerError};
pub use round::{ContestRound, IgnoreReason, Registration, RoundError, RoundStart};
pub use score::{DiceScore, ScoreError, ScoreStore};
