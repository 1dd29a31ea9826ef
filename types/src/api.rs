//! JSON messages exchanged between the table host and its players.
//!
//! These map the logical host/player messages onto a tagged JSON encoding. The
//! host decides delivery with [`OutboundEvent::recipient`]; everything except
//! [`OutboundEvent::AssignNumber`] goes to every connected player.

use serde::{Deserialize, Serialize};

use crate::contest::{Decision, PlayerId, RoundResult};

/// Who may receive an outbound event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Recipient {
    All,
    Player(PlayerId),
}

impl Recipient {
    /// Whether a connection bound to `player` (if any) should see the event.
    pub fn admits(&self, player: Option<PlayerId>) -> bool {
        match self {
            Recipient::All => true,
            Recipient::Player(target) => player == Some(*target),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OutboundEvent {
    #[serde(rename = "reset_ui")]
    ResetUi { round: u64 },
    #[serde(rename = "start_timer")]
    StartTimer {
        round: u64,
        #[serde(rename = "durationSeconds")]
        duration_seconds: u64,
    },
    #[serde(rename = "assign_number")]
    AssignNumber {
        #[serde(rename = "playerId")]
        player_id: PlayerId,
        round: u64,
        number: u8,
    },
    #[serde(rename = "update_chips")]
    UpdateChips {
        #[serde(rename = "playerId")]
        player_id: PlayerId,
        balance: u64,
    },
    #[serde(rename = "display_result")]
    DisplayResult { message: String, result: RoundResult },
}

impl OutboundEvent {
    pub fn recipient(&self) -> Recipient {
        match self {
            OutboundEvent::AssignNumber { player_id, .. } => Recipient::Player(*player_id),
            _ => Recipient::All,
        }
    }

    pub fn display_result(result: RoundResult) -> Self {
        OutboundEvent::DisplayResult {
            message: result.summary(),
            result,
        }
    }
}

/// Decision as submitted on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionKind {
    Fold,
    Contest,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum InboundMessage {
    #[serde(rename = "join")]
    Join {
        #[serde(rename = "requestId")]
        request_id: String,
        #[serde(rename = "playerId")]
        player_id: PlayerId,
    },
    #[serde(rename = "leave")]
    Leave {
        #[serde(rename = "requestId")]
        request_id: Option<String>,
        #[serde(rename = "playerId")]
        player_id: PlayerId,
    },
    #[serde(rename = "decision")]
    RegisterDecision {
        #[serde(rename = "requestId")]
        request_id: String,
        #[serde(rename = "playerId")]
        player_id: PlayerId,
        decision: DecisionKind,
        #[serde(rename = "betAmount", default)]
        bet_amount: Option<i64>,
    },
}

/// Convert a wire decision into a core [`Decision`].
///
/// Negative or missing bets become a zero request; the round raises those to
/// the table minimum.
pub fn decision_from_wire(kind: DecisionKind, bet_amount: Option<i64>) -> Decision {
    match kind {
        DecisionKind::Fold => Decision::Fold,
        DecisionKind::Contest => {
            let requested = bet_amount
                .and_then(|amount| u64::try_from(amount).ok())
                .unwrap_or(0);
            Decision::Contest(requested)
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum OutboundResponse {
    #[serde(rename = "ack")]
    Ack {
        #[serde(rename = "requestId")]
        request_id: String,
    },
    #[serde(rename = "error")]
    Error {
        #[serde(rename = "requestId")]
        request_id: String,
        code: String,
        message: String,
    },
}
