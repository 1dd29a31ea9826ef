//! Two-dice side game: a roll either wins, loses, or asks for another roll.

use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiceOutcome {
    Win,
    Lose,
    RollAgain,
}

/// Totals that end the game.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiceRules {
    pub winning: Vec<u8>,
    pub losing: Vec<u8>,
}

impl Default for DiceRules {
    fn default() -> Self {
        Self {
            winning: vec![7, 11],
            losing: vec![2, 3, 12],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceRoll {
    pub dice: [u8; 2],
    pub total: u8,
    pub outcome: DiceOutcome,
}

impl DiceRules {
    pub fn classify(&self, total: u8) -> DiceOutcome {
        if self.winning.contains(&total) {
            DiceOutcome::Win
        } else if self.losing.contains(&total) {
            DiceOutcome::Lose
        } else {
            DiceOutcome::RollAgain
        }
    }

    pub fn roll<R: Rng>(&self, rng: &mut R) -> DiceRoll {
        let d1 = rng.gen_range(1..=6u8);
        let d2 = rng.gen_range(1..=6u8);
        let total = d1 + d2;
        DiceRoll {
            dice: [d1, d2],
            total,
            outcome: self.classify(total),
        }
    }
}
