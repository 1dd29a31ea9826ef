//! Table engine: the authoritative contest plus the set of seated players,
//! translated into outbound events.

use std::collections::BTreeSet;
use std::time::Duration;

use numbercontest_execution::{
    ContestConfig, ContestRound, IgnoreReason, NumberDraw, Registration, RoundError, SeededDraw,
};
use numbercontest_types::api::OutboundEvent;
use numbercontest_types::{Decision, Phase, PlayerId};
use tracing::{debug, info};

/// Events and timings for a freshly opened round, in publish order.
///
/// Decisions stay closed until [`TableEngine::open_decisions`] hands out the
/// timer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoundOpening {
    pub round: u64,
    pub reset: OutboundEvent,
    /// Balances for everyone, then one private number per player.
    pub deals: Vec<OutboundEvent>,
    pub decision_window: Duration,
    pub sync_delay: Option<Duration>,
}

pub struct TableEngine<D: NumberDraw = SeededDraw> {
    round: ContestRound<D>,
    seated: BTreeSet<PlayerId>,
    /// `start_timer` for the opened round, until decisions open.
    pending_timer: Option<OutboundEvent>,
}

impl TableEngine<SeededDraw> {
    pub fn new(config: ContestConfig) -> Self {
        Self::with_round(ContestRound::new(config))
    }
}

impl<D: NumberDraw> TableEngine<D> {
    pub fn with_round(round: ContestRound<D>) -> Self {
        Self {
            round,
            seated: BTreeSet::new(),
            pending_timer: None,
        }
    }

    pub fn round(&self) -> &ContestRound<D> {
        &self.round
    }

    pub fn round_number(&self) -> u64 {
        self.round.round_number()
    }

    pub fn phase(&self) -> Phase {
        self.round.phase()
    }

    pub fn is_seated(&self, player: PlayerId) -> bool {
        self.seated.contains(&player)
    }

    pub fn seated_count(&self) -> usize {
        self.seated.len()
    }

    /// Seat a player and report their balance.
    ///
    /// A player joining while decisions are open is added to that round
    /// without a number.
    pub fn seat(&mut self, player: PlayerId) -> OutboundEvent {
        if self.seated.insert(player) {
            info!(%player, seated = self.seated.len(), "player seated");
        }
        self.round.admit(player);
        OutboundEvent::UpdateChips {
            player_id: player,
            balance: self.round.balance(player),
        }
    }

    /// Remove a player from future rounds.
    ///
    /// Any decision they made in the round in play is dropped, so they settle
    /// as undecided.
    pub fn unseat(&mut self, player: PlayerId) -> bool {
        let removed = self.seated.remove(&player);
        if removed {
            self.round.withdraw(player);
            info!(%player, seated = self.seated.len(), "player left");
        }
        removed
    }

    /// Whether the round in play is waiting for decisions.
    pub fn decisions_open(&self) -> bool {
        self.pending_timer.is_none() && self.round.phase() == Phase::Collecting
    }

    pub fn register(&mut self, player: PlayerId, decision: Decision) -> Registration {
        if self.pending_timer.is_some() {
            debug!(%player, "decision before the timer started, ignored");
            return Registration::Ignored(IgnoreReason::NotCollecting);
        }
        let registration = self.round.register_decision(player, decision);
        if let Registration::Ignored(reason) = registration {
            debug!(%player, ?reason, "decision ignored");
        }
        registration
    }

    pub fn all_decided(&self) -> bool {
        self.decisions_open() && self.round.all_decided()
    }

    /// Start a round for everyone seated.
    pub fn open_round(&mut self) -> Result<RoundOpening, RoundError> {
        let start = self.round.start_round(self.seated.iter().copied())?;
        let round = start.round;

        let mut deals = Vec::with_capacity(start.balances.len() + start.assignments.len());
        deals.extend(start.balances.into_iter().map(|entry| OutboundEvent::UpdateChips {
            player_id: entry.player_id,
            balance: entry.balance,
        }));
        deals.extend(
            start
                .assignments
                .into_iter()
                .map(|(player_id, number)| OutboundEvent::AssignNumber {
                    player_id,
                    round,
                    number,
                }),
        );

        self.pending_timer = Some(OutboundEvent::StartTimer {
            round,
            duration_seconds: whole_seconds(start.decision_window),
        });

        Ok(RoundOpening {
            round,
            reset: OutboundEvent::ResetUi { round },
            deals,
            decision_window: start.decision_window,
            sync_delay: start.sync_delay,
        })
    }

    /// Start accepting decisions for the opened round and return the
    /// `start_timer` event to publish. `None` if there is nothing to open.
    pub fn open_decisions(&mut self) -> Option<OutboundEvent> {
        let timer = self.pending_timer.take()?;
        debug!(round = self.round.round_number(), "decisions open");
        Some(timer)
    }

    /// Close decisions if still open, settle, and report the result followed
    /// by every roster player's balance.
    pub fn settle_round(&mut self) -> Result<Vec<OutboundEvent>, RoundError> {
        self.pending_timer = None;
        self.round.close_decisions();
        let result = self.round.resolve()?;

        let mut events = Vec::with_capacity(result.balances.len() + 1);
        let balances: Vec<_> = result
            .balances
            .iter()
            .map(|entry| OutboundEvent::UpdateChips {
                player_id: entry.player_id,
                balance: entry.balance,
            })
            .collect();
        events.push(OutboundEvent::display_result(result));
        events.extend(balances);
        Ok(events)
    }
}

/// Timer length shown to players, rounded up.
fn whole_seconds(window: Duration) -> u64 {
    let millis = window.as_millis() as u64;
    millis.div_ceil(1000)
}
