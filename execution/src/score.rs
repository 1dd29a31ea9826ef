//! Win/loss/roll counters for the dice game, stored as flat key-value JSON.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::dice::DiceOutcome;

#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("failed to access score file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("score file {path} is malformed: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceScore {
    #[serde(rename = "dice_game_wins", default)]
    pub wins: u32,
    #[serde(rename = "dice_game_losses", default)]
    pub losses: u32,
    #[serde(rename = "dice_game_rolls", default)]
    pub rolls: u32,
}

impl DiceScore {
    /// Count one roll and its result.
    pub fn record(&mut self, outcome: DiceOutcome) {
        self.rolls = self.rolls.saturating_add(1);
        match outcome {
            DiceOutcome::Win => self.wins = self.wins.saturating_add(1),
            DiceOutcome::Lose => self.losses = self.losses.saturating_add(1),
            DiceOutcome::RollAgain => {}
        }
    }

    /// Percentage of finished games that were won.
    pub fn win_rate(&self) -> f64 {
        let finished = self.wins as u64 + self.losses as u64;
        if finished == 0 {
            return 0.0;
        }
        self.wins as f64 / finished as f64 * 100.0
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// File-backed [`DiceScore`].
#[derive(Clone, Debug)]
pub struct ScoreStore {
    path: PathBuf,
}

impl ScoreStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load counters; a missing file reads as all zeros.
    pub fn load(&self) -> Result<DiceScore, ScoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no score file, starting fresh");
                return Ok(DiceScore::default());
            }
            Err(source) => {
                return Err(ScoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        serde_json::from_str(&raw).map_err(|source| ScoreError::Malformed {
            path: self.path.clone(),
            source,
        })
    }

    pub fn save(&self, score: &DiceScore) -> Result<(), ScoreError> {
        let raw = serde_json::to_string_pretty(score).map_err(|source| ScoreError::Malformed {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, raw).map_err(|source| ScoreError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_counts_each_roll_once() {
        let mut score = DiceScore::default();
        score.record(DiceOutcome::RollAgain);
        score.record(DiceOutcome::Win);
        score.record(DiceOutcome::Lose);
        score.record(DiceOutcome::Win);
        assert_eq!(
            score,
            DiceScore {
                wins: 2,
                losses: 1,
                rolls: 4
            }
        );
    }

    #[test]
    fn test_win_rate() {
        let mut score = DiceScore::default();
        assert_eq!(score.win_rate(), 0.0);
        score.record(DiceOutcome::Win);
        score.record(DiceOutcome::Lose);
        score.record(DiceOutcome::Lose);
        score.record(DiceOutcome::Win);
        assert!((score.win_rate() - 50.0).abs() < f64::EPSILON);
        score.reset();
        assert_eq!(score, DiceScore::default());
    }

    #[test]
    fn test_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScoreStore::new(dir.path().join("score.json"));
        assert_eq!(store.load().unwrap(), DiceScore::default());

        let score = DiceScore {
            wins: 3,
            losses: 1,
            rolls: 9,
        };
        store.save(&score).unwrap();
        assert_eq!(store.load().unwrap(), score);

        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\"dice_game_wins\": 3"));
    }

    #[test]
    fn test_missing_keys_default_to_zero() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScoreStore::new(dir.path().join("score.json"));
        fs::write(store.path(), r#"{"dice_game_rolls": 4}"#).unwrap();
        assert_eq!(
            store.load().unwrap(),
            DiceScore {
                wins: 0,
                losses: 0,
                rolls: 4
            }
        );
    }

    #[test]
    fn test_malformed_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScoreStore::new(dir.path().join("score.json"));
        fs::write(store.path(), "not json").unwrap();
        assert!(matches!(store.load(), Err(ScoreError::Malformed { .. })));
    }
}
