//! Table host for the number contest.
//!
//! Seats players over WebSocket, drives rounds on a timer, and fans table
//! events out to every connection. Secret numbers only reach their owner: each
//! socket filters events through [`OutboundEvent::recipient`].
//!
//! [`OutboundEvent::recipient`]: numbercontest_types::api::OutboundEvent::recipient

pub mod config;
pub mod driver;
pub mod engine;
pub mod server;
pub mod window;

pub use config::{TableConfig, TableConfigError};
pub use engine::{RoundOpening, TableEngine};
pub use server::{router, serve, AppState, TableError};
pub use window::{DecisionWindow, WindowClose};
