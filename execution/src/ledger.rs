//! Chip balances that persist across rounds.

use std::collections::BTreeMap;

use numbercontest_types::{PlayerBalance, PlayerId};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("insufficient funds for player {player} (balance={balance}, requested={requested})")]
    InsufficientFunds {
        player: PlayerId,
        balance: u64,
        requested: u64,
    },
    #[error("balance overflow for player {player} (balance={balance}, credit={amount})")]
    Overflow {
        player: PlayerId,
        balance: u64,
        amount: u64,
    },
}

/// Per-player chip balances.
///
/// Players the ledger has never seen are treated as holding the starting
/// balance. Balances are unsigned and debits larger than the balance are
/// rejected, so a balance can never go negative.
#[derive(Clone, Debug)]
pub struct ChipLedger {
    starting_balance: u64,
    balances: BTreeMap<PlayerId, u64>,
}

impl ChipLedger {
    pub fn new(starting_balance: u64) -> Self {
        Self {
            starting_balance,
            balances: BTreeMap::new(),
        }
    }

    pub fn starting_balance(&self) -> u64 {
        self.starting_balance
    }

    /// Current balance, initializing unknown players to the starting balance.
    pub fn balance(&mut self, player: PlayerId) -> u64 {
        *self
            .balances
            .entry(player)
            .or_insert(self.starting_balance)
    }

    /// Current balance without initializing unknown players.
    pub fn balance_of(&self, player: PlayerId) -> u64 {
        self.balances
            .get(&player)
            .copied()
            .unwrap_or(self.starting_balance)
    }

    pub fn contains(&self, player: PlayerId) -> bool {
        self.balances.contains_key(&player)
    }

    /// Remove `amount` chips, returning the new balance.
    pub fn debit(&mut self, player: PlayerId, amount: u64) -> Result<u64, LedgerError> {
        let balance = self.balance(player);
        let updated = balance
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientFunds {
                player,
                balance,
                requested: amount,
            })?;
        self.balances.insert(player, updated);
        Ok(updated)
    }

    /// Add `amount` chips, returning the new balance.
    pub fn credit(&mut self, player: PlayerId, amount: u64) -> Result<u64, LedgerError> {
        let balance = self.balance(player);
        let updated = balance.checked_add(amount).ok_or(LedgerError::Overflow {
            player,
            balance,
            amount,
        })?;
        self.balances.insert(player, updated);
        Ok(updated)
    }

    /// Snapshot balances for `players`, in the order given.
    pub fn balances<'a>(
        &mut self,
        players: impl IntoIterator<Item = &'a PlayerId>,
    ) -> Vec<PlayerBalance> {
        players
            .into_iter()
            .map(|player| PlayerBalance {
                player_id: *player,
                balance: self.balance(*player),
            })
            .collect()
    }
}
