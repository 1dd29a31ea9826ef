//! Decision window timing.
//!
//! The window never touches the engine. It only waits on the clock, on the
//! "everyone decided in round N" signal published by the socket handlers, and
//! on shutdown.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, Instant};

/// Why a decision window ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WindowClose {
    Expired,
    AllDecided,
    Cancelled,
}

#[derive(Clone, Copy, Debug)]
pub struct DecisionWindow {
    round: u64,
    duration: Duration,
    early_close: bool,
}

impl DecisionWindow {
    pub fn new(round: u64, duration: Duration, early_close: bool) -> Self {
        Self {
            round,
            duration,
            early_close,
        }
    }

    pub fn round(&self) -> u64 {
        self.round
    }

    /// Wait until the window expires, every player has decided (when early
    /// close is on), or shutdown is requested.
    pub async fn wait(
        &self,
        decided: &mut watch::Receiver<u64>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> WindowClose {
        let deadline = Instant::now() + self.duration;
        tokio::select! {
            _ = shutdown_requested(shutdown) => WindowClose::Cancelled,
            Ok(()) = decided_round(decided, self.round), if self.early_close => WindowClose::AllDecided,
            _ = time::sleep_until(deadline) => WindowClose::Expired,
        }
    }
}

async fn decided_round(
    decided: &mut watch::Receiver<u64>,
    round: u64,
) -> Result<(), watch::error::RecvError> {
    decided.wait_for(|current| *current == round).await.map(|_| ())
}

/// Resolves once shutdown is flagged. Never resolves if the flag can no
/// longer change.
pub async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Sleep for `delay`; returns `false` if shutdown interrupted the pause.
pub async fn pause(delay: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = shutdown_requested(shutdown) => false,
        _ = time::sleep(delay) => true,
    }
}
