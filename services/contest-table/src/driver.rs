//! Round driver: opens rounds, runs the decision window, settles, repeats.

use tokio::sync::watch;
use tracing::{error, info};

use crate::config::TableConfig;
use crate::server::AppState;
use crate::window::{pause, shutdown_requested, DecisionWindow, WindowClose};

/// Drive rounds until shutdown. The engine lock is never held across an
/// await.
pub async fn run_rounds(state: AppState, config: TableConfig, mut shutdown: watch::Receiver<bool>) {
    let mut decided = state.subscribe_decided();
    let next_round_delay = config.contest.next_round_delay();

    loop {
        if !wait_for_players(&state, config.min_players, &mut shutdown).await {
            break;
        }

        let opened = state.lock_engine().open_round();
        let opening = match opened {
            Ok(opening) => opening,
            Err(err) => {
                error!(?err, "failed to open round");
                if !pause(next_round_delay, &mut shutdown).await {
                    break;
                }
                continue;
            }
        };
        let round = opening.round;

        state.publish(opening.reset.clone());
        if let Some(delay) = opening.sync_delay {
            // Give first-round clients time to finish resetting before numbers arrive.
            info!(round, delay_ms = delay.as_millis() as u64, "waiting for clients to sync");
            if !pause(delay, &mut shutdown).await {
                break;
            }
            state.publish(opening.reset);
        }
        for event in opening.deals {
            state.publish(event);
        }
        let timer = state.lock_engine().open_decisions();
        if let Some(timer) = timer {
            state.publish(timer);
        }

        let window = DecisionWindow::new(round, opening.decision_window, config.early_close);
        let close = window.wait(&mut decided, &mut shutdown).await;
        info!(round, ?close, "decision window closed");
        if close == WindowClose::Cancelled {
            break;
        }

        let settled = state.lock_engine().settle_round();
        match settled {
            Ok(events) => {
                for event in events {
                    state.publish(event);
                }
            }
            Err(err) => error!(round, ?err, "failed to settle round"),
        }

        if !pause(next_round_delay, &mut shutdown).await {
            break;
        }
    }
    info!("round driver stopped");
}

/// Wait until enough players are seated; `false` on shutdown.
async fn wait_for_players(
    state: &AppState,
    min_players: usize,
    shutdown: &mut watch::Receiver<bool>,
) -> bool {
    let mut waiting = false;
    loop {
        let seated_signal = state.seated_signal().notified();
        let seated = state.lock_engine().seated_count();
        if seated >= min_players {
            return true;
        }
        if !waiting {
            info!(seated, min_players, "waiting for players");
            waiting = true;
        }
        tokio::select! {
            _ = seated_signal => {}
            _ = shutdown_requested(shutdown) => return false,
        }
    }
}
