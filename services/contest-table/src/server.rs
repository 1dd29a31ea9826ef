//! WebSocket adapter between players and the table engine.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State as AxumState,
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use numbercontest_execution::Registration;
use numbercontest_types::api::{decision_from_wire, InboundMessage, OutboundEvent, OutboundResponse};
use numbercontest_types::PlayerId;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc, watch, Notify};
use tracing::{debug, error, info, warn};

use crate::config::TableConfig;
use crate::driver::run_rounds;
use crate::engine::TableEngine;
use crate::window::shutdown_requested;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableError {
    #[error("join the table before submitting decisions")]
    NotJoined,
    #[error("connection is bound to player {bound}, not {requested}")]
    PlayerMismatch { bound: PlayerId, requested: PlayerId },
    #[error("player {player} is already seated on another connection")]
    AlreadyJoined { player: PlayerId },
}

impl TableError {
    pub fn code(&self) -> &'static str {
        match self {
            TableError::NotJoined => "NOT_JOINED",
            TableError::PlayerMismatch { .. } => "PLAYER_MISMATCH",
            TableError::AlreadyJoined { .. } => "ALREADY_JOINED",
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    engine: Arc<Mutex<TableEngine>>,
    broadcaster: broadcast::Sender<OutboundEvent>,
    seated: Arc<Notify>,
    decided: Arc<watch::Sender<u64>>,
}

impl AppState {
    pub fn new(config: &TableConfig) -> Self {
        let (broadcaster, _) = broadcast::channel(config.broadcast_capacity);
        let (decided, _) = watch::channel(0);
        Self {
            engine: Arc::new(Mutex::new(TableEngine::new(config.contest.clone()))),
            broadcaster,
            seated: Arc::new(Notify::new()),
            decided: Arc::new(decided),
        }
    }

    pub fn lock_engine(&self) -> MutexGuard<'_, TableEngine> {
        self.engine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Send an event to every connection; each socket filters by recipient.
    pub fn publish(&self, event: OutboundEvent) {
        // No subscribers is not an error.
        let _ = self.broadcaster.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OutboundEvent> {
        self.broadcaster.subscribe()
    }

    pub fn subscribe_decided(&self) -> watch::Receiver<u64> {
        self.decided.subscribe()
    }

    pub(crate) fn seated_signal(&self) -> &Notify {
        &self.seated
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/healthz", get(healthz))
        .with_state(state)
}

/// Run the round driver and the HTTP server until shutdown is flagged.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    config: TableConfig,
    shutdown: watch::Receiver<bool>,
) -> std::io::Result<()> {
    let driver = tokio::spawn(run_rounds(state.clone(), config, shutdown.clone()));

    let mut signal = shutdown;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown_requested(&mut signal).await })
        .await?;

    if let Err(err) = driver.await {
        error!(?err, "round driver panicked");
    }
    info!("contest table stopped");
    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    AxumState(state): AxumState<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
    let mut broadcast_rx = state.subscribe();
    let (bound_tx, bound_rx) = watch::channel::<Option<PlayerId>>(None);

    let write_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let broadcast_task = {
        let tx = tx.clone();
        tokio::spawn(async move {
            loop {
                let event = match broadcast_rx.recv().await {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "connection lagged behind table events");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                let player = *bound_rx.borrow();
                if !event.recipient().admits(player) {
                    continue;
                }
                if let Ok(payload) = serde_json::to_string(&event) {
                    let _ = tx.send(Message::Text(payload));
                }
            }
        })
    };

    while let Some(Ok(message)) = receiver.next().await {
        match message {
            Message::Text(text) => match serde_json::from_str::<InboundMessage>(&text) {
                Ok(inbound) => handle_inbound(inbound, &state, &tx, &bound_tx),
                Err(err) => {
                    warn!(?err, "invalid inbound message");
                }
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    let bound = *bound_tx.borrow();
    if let Some(player) = bound {
        state.lock_engine().unseat(player);
        debug!(%player, "connection closed");
    }

    write_task.abort();
    broadcast_task.abort();
}

fn handle_inbound(
    inbound: InboundMessage,
    state: &AppState,
    tx: &mpsc::UnboundedSender<Message>,
    bound: &watch::Sender<Option<PlayerId>>,
) {
    match inbound {
        InboundMessage::Join {
            request_id,
            player_id,
        } => {
            let current = *bound.borrow();
            let seated = check_binding(current, player_id, true).and_then(|()| {
                // Bind under the engine lock so no round opens between the
                // seat and the binding.
                let mut engine = state.lock_engine();
                if current.is_none() && engine.is_seated(player_id) {
                    return Err(TableError::AlreadyJoined { player: player_id });
                }
                bound.send_replace(Some(player_id));
                Ok(engine.seat(player_id))
            });
            let chips = match seated {
                Ok(chips) => chips,
                Err(err) => {
                    warn!(%player_id, ?err, "join rejected");
                    send_response(tx, error_response(request_id, err));
                    return;
                }
            };
            state.publish(chips);
            state.seated_signal().notify_waiters();
            send_response(tx, OutboundResponse::Ack { request_id });
        }
        InboundMessage::Leave {
            request_id,
            player_id,
        } => {
            let current = *bound.borrow();
            if let Err(err) = check_binding(current, player_id, false) {
                if let Some(request_id) = request_id {
                    send_response(tx, error_response(request_id, err));
                }
                return;
            }
            bound.send_replace(None);
            state.lock_engine().unseat(player_id);
            if let Some(request_id) = request_id {
                send_response(tx, OutboundResponse::Ack { request_id });
            }
        }
        InboundMessage::RegisterDecision {
            request_id,
            player_id,
            decision,
            bet_amount,
        } => {
            let current = *bound.borrow();
            if let Err(err) = check_binding(current, player_id, false) {
                send_response(tx, error_response(request_id, err));
                return;
            }
            let decision = decision_from_wire(decision, bet_amount);
            let (registration, decided_round) = {
                let mut engine = state.lock_engine();
                let registration = engine.register(player_id, decision);
                let decided_round = engine.all_decided().then(|| engine.round_number());
                (registration, decided_round)
            };
            if let Registration::Recorded(recorded) = registration {
                debug!(%player_id, decision = ?recorded, "decision accepted");
            }
            if let Some(round) = decided_round {
                state.decided.send_replace(round);
            }
            // Ignored registrations are still acknowledged.
            send_response(tx, OutboundResponse::Ack { request_id });
        }
    }
}

/// A connection speaks for at most one player at a time.
fn check_binding(
    bound: Option<PlayerId>,
    requested: PlayerId,
    joining: bool,
) -> Result<(), TableError> {
    match bound {
        Some(bound) if bound != requested => Err(TableError::PlayerMismatch { bound, requested }),
        Some(_) => Ok(()),
        None if joining => Ok(()),
        None => Err(TableError::NotJoined),
    }
}

fn send_response(tx: &mpsc::UnboundedSender<Message>, response: OutboundResponse) {
    if let Ok(payload) = serde_json::to_string(&response) {
        let _ = tx.send(Message::Text(payload));
    }
}

fn error_response(request_id: String, err: TableError) -> OutboundResponse {
    OutboundResponse::Error {
        request_id,
        code: err.code().to_string(),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binding_rules() {
        assert_eq!(check_binding(None, PlayerId(1), true), Ok(()));
        assert_eq!(
            check_binding(None, PlayerId(1), false),
            Err(TableError::NotJoined)
        );
        assert_eq!(check_binding(Some(PlayerId(1)), PlayerId(1), false), Ok(()));
        assert_eq!(check_binding(Some(PlayerId(1)), PlayerId(1), true), Ok(()));
        assert_eq!(
            check_binding(Some(PlayerId(1)), PlayerId(2), true),
            Err(TableError::PlayerMismatch {
                bound: PlayerId(1),
                requested: PlayerId(2)
            })
        );
    }

    #[test]
    fn test_error_response_codes() {
        let response = error_response("r9".to_string(), TableError::NotJoined);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["requestId"], "r9");
        assert_eq!(json["code"], "NOT_JOINED");

        let mismatch = TableError::PlayerMismatch {
            bound: PlayerId(1),
            requested: PlayerId(2),
        };
        assert_eq!(mismatch.code(), "PLAYER_MISMATCH");
        assert_eq!(
            TableError::AlreadyJoined { player: PlayerId(1) }.code(),
            "ALREADY_JOINED"
        );
    }

    #[test]
    fn test_publish_without_subscribers() {
        let state = AppState::new(&TableConfig::default());
        state.publish(OutboundEvent::ResetUi { round: 1 });
        assert_eq!(state.lock_engine().seated_count(), 0);
    }
}
