use std::fmt;

use serde::{Deserialize, Serialize};

/// Lowest secret number that can be dealt.
pub const MIN_SECRET_NUMBER: u8 = 1;

/// Highest secret number that can be dealt.
pub const MAX_SECRET_NUMBER: u8 = 100;

/// Opaque player identity assigned by the transport layer.
///
/// Ordering is meaningful: it fixes iteration order during resolution and
/// breaks ties between contestants holding the same number.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u32);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for PlayerId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// A player's choice for the current round.
///
/// When submitted, `Contest` carries the requested bet. Once recorded it
/// carries the bet actually accepted (clamped to the table minimum and the
/// player's balance).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", content = "bet")]
pub enum Decision {
    Fold,
    Contest(u64),
}

impl Decision {
    /// Chips committed by this decision.
    pub fn bet(&self) -> u64 {
        match self {
            Decision::Fold => 0,
            Decision::Contest(bet) => *bet,
        }
    }

    pub fn is_contest(&self) -> bool {
        matches!(self, Decision::Contest(_))
    }
}

/// Lifecycle of a single round.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Collecting,
    Resolving,
    Settled,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Collecting => "collecting",
            Phase::Resolving => "resolving",
            Phase::Settled => "settled",
        }
    }
}

/// How the round's winner (if any) was determined.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Nobody contested.
    NoContestants,
    /// Exactly one player contested and took the pot regardless of number.
    WonByDefault,
    /// The highest number among two or more contestants won.
    HighestNumber,
}

/// Per-round tally of what players decided.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionCounts {
    pub players: u32,
    pub contested: u32,
    pub folded: u32,
    pub undecided: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerBalance {
    #[serde(rename = "playerId")]
    pub player_id: PlayerId,
    pub balance: u64,
}

/// Settled outcome of a round, reported to every player.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundResult {
    pub round: u64,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub winner: Option<PlayerId>,
    #[serde(rename = "winningNumber", skip_serializing_if = "Option::is_none", default)]
    pub winning_number: Option<u8>,
    #[serde(rename = "totalPot")]
    pub total_pot: u64,
    pub counts: DecisionCounts,
    pub balances: Vec<PlayerBalance>,
}

impl RoundResult {
    pub fn balance_of(&self, player: PlayerId) -> Option<u64> {
        self.balances
            .iter()
            .find(|entry| entry.player_id == player)
            .map(|entry| entry.balance)
    }

    /// Plain-text announcement for display clients.
    pub fn summary(&self) -> String {
        let mut message = match (self.outcome, self.winner, self.winning_number) {
            (Outcome::WonByDefault, Some(winner), Some(number)) => {
                format!("Player {winner} wins by default with {number}!")
            }
            (Outcome::HighestNumber, Some(winner), Some(number)) => {
                format!("Player {winner} wins with {number}!")
            }
            _ => "No Contestants! Everyone folded!".to_string(),
        };

        if self.total_pot > 0 {
            message.push_str(&format!("\nTotal Pot: {} chips", self.total_pot));
            if let Some(winner) = self.winner {
                message.push_str(&format!(" -> Player {winner}"));
            }
        }

        let counts = &self.counts;
        message.push_str(&format!(
            "\nPlayers: {}, Contested: {}, Folded: {}, No Decision: {}",
            counts.players, counts.contested, counts.folded, counts.undecided
        ));
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(outcome: Outcome, winner: Option<u32>, number: Option<u8>, pot: u64) -> RoundResult {
        RoundResult {
            round: 3,
            outcome,
            winner: winner.map(PlayerId),
            winning_number: number,
            total_pot: pot,
            counts: DecisionCounts {
                players: 3,
                contested: 2,
                folded: 1,
                undecided: 0,
            },
            balances: vec![
                PlayerBalance { player_id: PlayerId(1), balance: 110 },
                PlayerBalance { player_id: PlayerId(2), balance: 90 },
            ],
        }
    }

    #[test]
    fn test_summary_highest_number() {
        let summary = result(Outcome::HighestNumber, Some(1), Some(80), 30).summary();
        assert_eq!(
            summary,
            "Player 1 wins with 80!\nTotal Pot: 30 chips -> Player 1\n\
             Players: 3, Contested: 2, Folded: 1, No Decision: 0"
        );
    }

    #[test]
    fn test_summary_won_by_default() {
        let summary = result(Outcome::WonByDefault, Some(2), Some(12), 10).summary();
        assert!(summary.starts_with("Player 2 wins by default with 12!"));
    }

    #[test]
    fn test_summary_no_contestants_omits_pot() {
        let summary = result(Outcome::NoContestants, None, None, 0).summary();
        assert!(summary.starts_with("No Contestants!"));
        assert!(!summary.contains("Total Pot"));
    }

    #[test]
    fn test_balance_of() {
        let result = result(Outcome::HighestNumber, Some(1), Some(80), 30);
        assert_eq!(result.balance_of(PlayerId(2)), Some(90));
        assert_eq!(result.balance_of(PlayerId(9)), None);
    }

    #[test]
    fn test_decision_bet() {
        assert_eq!(Decision::Fold.bet(), 0);
        assert_eq!(Decision::Contest(25).bet(), 25);
        assert!(Decision::Contest(0).is_contest());
        assert!(!Decision::Fold.is_contest());
    }

    #[test]
    fn test_round_result_json_shape() {
        let value = serde_json::to_value(result(Outcome::HighestNumber, Some(1), Some(80), 30))
            .expect("serialize");
        assert_eq!(value["outcome"], "highest_number");
        assert_eq!(value["winner"], 1);
        assert_eq!(value["winningNumber"], 80);
        assert_eq!(value["totalPot"], 30);
        assert_eq!(value["balances"][0]["playerId"], 1);

        let none = serde_json::to_value(result(Outcome::NoContestants, None, None, 0))
            .expect("serialize");
        assert!(none.get("winner").is_none());
    }
}
