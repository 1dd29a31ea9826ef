//! Common types shared by the number contest core and its host.

pub mod api;
pub mod contest;

pub use contest::{
    Decision, DecisionCounts, Outcome, Phase, PlayerBalance, PlayerId, RoundResult,
    MAX_SECRET_NUMBER, MIN_SECRET_NUMBER,
};
