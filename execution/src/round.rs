//! Contest round state machine.
//!
//! A [`ContestRound`] owns the chip ledger for a session and the state of the
//! round currently in play. Rounds move through four phases:
//!
//! 1. **Idle** - No round has started yet
//! 2. **Collecting** - Numbers are dealt and players submit decisions
//! 3. **Resolving** - Decisions are frozen, waiting for settlement
//! 4. **Settled** - Bets debited, pot paid out, result available
//!
//! The round never reads the clock. The host decides when the decision window
//! ends (timer expiry or everyone decided) and calls
//! [`ContestRound::close_decisions`] followed by [`ContestRound::resolve`].
//!
//! ## Usage
//!
//! ```rust
//! use numbercontest_execution::{ContestConfig, ContestRound};
//! use numbercontest_types::{Decision, PlayerId};
//!
//! let mut round = ContestRound::new(ContestConfig {
//!     seed: Some(7),
//!     ..ContestConfig::default()
//! });
//! let start = round.start_round([PlayerId(1), PlayerId(2)]).unwrap();
//! assert_eq!(start.assignments.len(), 2);
//!
//! round.register_decision(PlayerId(1), Decision::Contest(20));
//! round.register_decision(PlayerId(2), Decision::Fold);
//!
//! round.close_decisions();
//! let result = round.resolve().unwrap();
//! assert_eq!(result.winner, Some(PlayerId(1)));
//! assert_eq!(result.total_pot, 20);
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use numbercontest_types::{
    Decision, DecisionCounts, Outcome, Phase, PlayerBalance, PlayerId, RoundResult,
};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::ContestConfig;
use crate::draw::{NumberDraw, SeededDraw};
use crate::ledger::ChipLedger;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoundError {
    #[error("round {round} is still {phase}")]
    RoundInProgress { round: u64, phase: &'static str },
    #[error("round {round} cannot be resolved while {phase}")]
    NotResolving { round: u64, phase: &'static str },
}

/// Why a decision was not recorded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Submitted outside the decision window.
    NotCollecting,
    /// The player is not part of the current round.
    NotInRound,
    /// The player cannot cover the minimum bet.
    InsufficientChips,
}

/// Outcome of [`ContestRound::register_decision`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Registration {
    Recorded(Decision),
    Ignored(IgnoreReason),
}

/// Everything the host needs to announce a freshly started round.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoundStart {
    pub round: u64,
    /// Private `(player, number)` deals; each must only reach its player.
    pub assignments: Vec<(PlayerId, u8)>,
    pub balances: Vec<PlayerBalance>,
    pub decision_window: Duration,
    pub sync_delay: Option<Duration>,
}

#[derive(Clone, Debug, Default)]
struct RoundState {
    round_number: u64,
    phase: Phase,
    roster: BTreeSet<PlayerId>,
    withdrawn: BTreeSet<PlayerId>,
    secret_numbers: BTreeMap<PlayerId, u8>,
    decisions: BTreeMap<PlayerId, Decision>,
    pot: u64,
}

impl RoundState {
    fn begin(&mut self, players: impl IntoIterator<Item = PlayerId>) {
        self.round_number = self.round_number.saturating_add(1);
        self.phase = Phase::Collecting;
        self.roster = players.into_iter().collect();
        self.withdrawn.clear();
        self.secret_numbers.clear();
        self.decisions.clear();
        self.pot = 0;
    }
}

/// Authoritative owner of a session's ledger and its current round.
#[derive(Debug)]
pub struct ContestRound<D: NumberDraw = SeededDraw> {
    config: ContestConfig,
    ledger: ChipLedger,
    draw: D,
    state: RoundState,
}

impl ContestRound<SeededDraw> {
    /// Create a session drawing numbers from `config.seed` (or entropy).
    pub fn new(config: ContestConfig) -> Self {
        let draw = SeededDraw::new(config.seed);
        Self::with_draw(config, draw)
    }
}

impl<D: NumberDraw> ContestRound<D> {
    pub fn with_draw(config: ContestConfig, draw: D) -> Self {
        let ledger = ChipLedger::new(config.starting_balance);
        Self {
            config,
            ledger,
            draw,
            state: RoundState::default(),
        }
    }

    pub fn config(&self) -> &ContestConfig {
        &self.config
    }

    pub fn ledger(&self) -> &ChipLedger {
        &self.ledger
    }

    pub fn draw(&self) -> &D {
        &self.draw
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn round_number(&self) -> u64 {
        self.state.round_number
    }

    /// Sum of the bets currently recorded as Contest (or, once settled, the
    /// pot that was paid out).
    pub fn pot(&self) -> u64 {
        self.state.pot
    }

    pub fn roster(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.state.roster.iter().copied()
    }

    pub fn secret_number(&self, player: PlayerId) -> Option<u8> {
        self.state.secret_numbers.get(&player).copied()
    }

    pub fn decision(&self, player: PlayerId) -> Option<Decision> {
        self.state.decisions.get(&player).copied()
    }

    /// Balance of `player`, registering them with the ledger if new.
    pub fn balance(&mut self, player: PlayerId) -> u64 {
        self.ledger.balance(player)
    }

    /// Deal numbers to `players` and open the decision window.
    pub fn start_round(
        &mut self,
        players: impl IntoIterator<Item = PlayerId>,
    ) -> Result<RoundStart, RoundError> {
        if matches!(self.state.phase, Phase::Collecting | Phase::Resolving) {
            return Err(RoundError::RoundInProgress {
                round: self.state.round_number,
                phase: self.state.phase.as_str(),
            });
        }

        self.state.begin(players);
        let round = self.state.round_number;

        let mut assignments = Vec::with_capacity(self.state.roster.len());
        for player in self.state.roster.iter().copied() {
            let number = self.draw.draw(round, player);
            debug!(round, %player, number, "assigned number");
            self.state.secret_numbers.insert(player, number);
            assignments.push((player, number));
        }
        let balances = self.ledger.balances(&self.state.roster);

        info!(round, players = self.state.roster.len(), "round started");
        Ok(RoundStart {
            round,
            assignments,
            balances,
            decision_window: self.config.decision_window(),
            sync_delay: self.config.sync_delay(round),
        })
    }

    /// Add a late joiner to the round in play, or take back a player who
    /// withdrew from it.
    ///
    /// A new player gets no number until the next round. Returns `false` when
    /// no round is collecting or the player is already taking part.
    pub fn admit(&mut self, player: PlayerId) -> bool {
        if self.state.phase != Phase::Collecting {
            return false;
        }
        self.ledger.balance(player);
        let returned = self.state.withdrawn.remove(&player);
        let admitted = self.state.roster.insert(player) || returned;
        if admitted {
            debug!(round = self.state.round_number, %player, "admitted late joiner");
        }
        admitted
    }

    /// Record a player's decision; the latest submission wins.
    pub fn register_decision(&mut self, player: PlayerId, decision: Decision) -> Registration {
        if self.state.phase != Phase::Collecting {
            return Registration::Ignored(IgnoreReason::NotCollecting);
        }
        if !self.state.roster.contains(&player) || self.state.withdrawn.contains(&player) {
            return Registration::Ignored(IgnoreReason::NotInRound);
        }

        let recorded = match decision {
            Decision::Fold => Decision::Fold,
            Decision::Contest(requested) => {
                let minimum = self.config.minimum_bet;
                let balance = self.ledger.balance_of(player);
                if balance < minimum {
                    debug!(%player, balance, minimum, "contest ignored, balance below minimum bet");
                    return Registration::Ignored(IgnoreReason::InsufficientChips);
                }
                Decision::Contest(requested.clamp(minimum, balance))
            }
        };

        let previous = self.state.decisions.insert(player, recorded);
        let previous_bet = previous.map(|decision| decision.bet()).unwrap_or(0);
        self.state.pot = self
            .state
            .pot
            .saturating_sub(previous_bet)
            .saturating_add(recorded.bet());

        debug!(
            round = self.state.round_number,
            %player,
            decision = ?recorded,
            pot = self.state.pot,
            "registered decision"
        );
        Registration::Recorded(recorded)
    }

    /// Drop a departed player's decision for the round in play.
    ///
    /// The player stays on the roster and settles as undecided: they cannot
    /// contest or win, and their bet leaves the pot. Returns `false` when no
    /// round is collecting or the player is not on the roster.
    pub fn withdraw(&mut self, player: PlayerId) -> bool {
        if self.state.phase != Phase::Collecting || !self.state.roster.contains(&player) {
            return false;
        }
        self.state.withdrawn.insert(player);
        if let Some(previous) = self.state.decisions.remove(&player) {
            self.state.pot = self.state.pot.saturating_sub(previous.bet());
        }
        debug!(
            round = self.state.round_number,
            %player,
            pot = self.state.pot,
            "player withdrew from round"
        );
        true
    }

    /// Whether every player still taking part has submitted a decision.
    pub fn all_decided(&self) -> bool {
        let mut active = self
            .state
            .roster
            .iter()
            .filter(|player| !self.state.withdrawn.contains(*player))
            .peekable();
        self.state.phase == Phase::Collecting
            && active.peek().is_some()
            && active.all(|player| self.state.decisions.contains_key(player))
    }

    /// Freeze decisions. Returns `false` if no round was collecting.
    pub fn close_decisions(&mut self) -> bool {
        if self.state.phase != Phase::Collecting {
            return false;
        }
        self.state.phase = Phase::Resolving;
        info!(
            round = self.state.round_number,
            decided = self.state.decisions.len(),
            players = self.state.roster.len(),
            "decisions closed"
        );
        true
    }

    /// Settle bets and pick the winner.
    ///
    /// Missing data never aborts settlement: a contestant without a number
    /// gets a fresh draw, and a failing debit excludes only that player.
    pub fn resolve(&mut self) -> Result<RoundResult, RoundError> {
        let round = self.state.round_number;
        if self.state.phase != Phase::Resolving {
            return Err(RoundError::NotResolving {
                round,
                phase: self.state.phase.as_str(),
            });
        }

        let roster: Vec<PlayerId> = self.state.roster.iter().copied().collect();
        let mut contenders: Vec<(PlayerId, u8)> = Vec::new();
        let mut folded = 0u32;
        let mut pot = 0u64;

        for player in roster.iter().copied() {
            let Some(decision) = self.state.decisions.get(&player).copied() else {
                continue;
            };
            let bet = match decision {
                Decision::Fold => {
                    folded += 1;
                    continue;
                }
                Decision::Contest(bet) => bet,
            };

            let number = match self.state.secret_numbers.get(&player) {
                Some(number) => *number,
                None => {
                    let number = self.draw.draw(round, player);
                    warn!(round, %player, number, "contestant had no secret number, drew a replacement");
                    self.state.secret_numbers.insert(player, number);
                    number
                }
            };

            match self.ledger.debit(player, bet) {
                Ok(_) => {
                    pot = pot.saturating_add(bet);
                    contenders.push((player, number));
                }
                Err(err) => {
                    error!(round, %player, ?err, "failed to debit contest bet");
                }
            }
        }

        // Highest number wins; equal numbers go to the lowest player id.
        let (outcome, winner) = match contenders.as_slice() {
            [] => (Outcome::NoContestants, None),
            [only] => (Outcome::WonByDefault, Some(*only)),
            _ => (
                Outcome::HighestNumber,
                contenders
                    .iter()
                    .copied()
                    .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0))),
            ),
        };

        if let Some((player, _)) = winner {
            if let Err(err) = self.ledger.credit(player, pot) {
                error!(round, %player, pot, ?err, "failed to credit pot");
            }
        }

        let players = roster.len() as u32;
        let contested = contenders.len() as u32;
        let counts = DecisionCounts {
            players,
            contested,
            folded,
            undecided: players.saturating_sub(contested).saturating_sub(folded),
        };

        self.state.pot = pot;
        self.state.phase = Phase::Settled;

        let result = RoundResult {
            round,
            outcome,
            winner: winner.map(|(player, _)| player),
            winning_number: winner.map(|(_, number)| number),
            total_pot: pot,
            counts,
            balances: self.ledger.balances(&roster),
        };
        info!(
            round,
            winner = ?result.winner,
            winning_number = ?result.winning_number,
            pot,
            contested,
            folded,
            "round settled"
        );
        Ok(result)
    }
}
