use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use numbercontest_execution::{ConfigError, ContestConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::Level;

#[derive(Debug, Error)]
pub enum TableConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid contest rules: {0}")]
    Contest(#[from] ConfigError),
    #[error("invalid log level: {value}")]
    InvalidLogLevel { value: String },
    #[error("{field} must be > 0")]
    Zero { field: &'static str },
    #[error("invalid listen address {value}")]
    InvalidAddr { value: String },
}

/// Host settings plus the rules of the contest it runs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    /// Seated players required before a round starts.
    pub min_players: usize,
    /// Close the decision window as soon as every player has decided.
    pub early_close: bool,
    pub broadcast_capacity: usize,
    pub contest: ContestConfig,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9124,
            log_level: "info".to_string(),
            min_players: 1,
            early_close: true,
            broadcast_capacity: 1024,
            contest: ContestConfig::default(),
        }
    }
}

impl TableConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let rules = defaults.contest;
        Self {
            host: read_env("CONTEST_TABLE_HOST", defaults.host),
            port: read_env("CONTEST_TABLE_PORT", defaults.port),
            log_level: read_env("CONTEST_TABLE_LOG_LEVEL", defaults.log_level),
            min_players: read_env("CONTEST_TABLE_MIN_PLAYERS", defaults.min_players),
            early_close: read_env("CONTEST_TABLE_EARLY_CLOSE", defaults.early_close),
            broadcast_capacity: read_env(
                "CONTEST_TABLE_BROADCAST_CAPACITY",
                defaults.broadcast_capacity,
            ),
            contest: ContestConfig {
                starting_balance: read_env("CONTEST_TABLE_STARTING_BALANCE", rules.starting_balance),
                minimum_bet: read_env("CONTEST_TABLE_MINIMUM_BET", rules.minimum_bet),
                decision_window_ms: read_env(
                    "CONTEST_TABLE_DECISION_WINDOW_MS",
                    rules.decision_window_ms,
                ),
                next_round_delay_ms: read_env(
                    "CONTEST_TABLE_NEXT_ROUND_DELAY_MS",
                    rules.next_round_delay_ms,
                ),
                first_round_sync_ms: read_env(
                    "CONTEST_TABLE_FIRST_ROUND_SYNC_MS",
                    rules.first_round_sync_ms,
                ),
                seed: std::env::var("CONTEST_TABLE_SEED")
                    .ok()
                    .and_then(|raw| raw.parse::<u64>().ok()),
            },
        }
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self, TableConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| TableConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&raw).map_err(|source| TableConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), TableConfigError> {
        self.contest.validate()?;
        if self.min_players == 0 {
            return Err(TableConfigError::Zero {
                field: "min_players",
            });
        }
        if self.broadcast_capacity == 0 {
            return Err(TableConfigError::Zero {
                field: "broadcast_capacity",
            });
        }
        self.log_level()?;
        self.listen_addr()?;
        Ok(())
    }

    pub fn log_level(&self) -> Result<Level, TableConfigError> {
        Level::from_str(&self.log_level).map_err(|_| TableConfigError::InvalidLogLevel {
            value: self.log_level.clone(),
        })
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, TableConfigError> {
        let value = format!("{}:{}", self.host, self.port);
        value
            .parse()
            .map_err(|_| TableConfigError::InvalidAddr { value })
    }
}

fn read_env<T: FromStr>(key: &str, fallback: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.parse::<T>().ok())
        .unwrap_or(fallback)
}
