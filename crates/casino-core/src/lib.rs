//! Core of the dice casino client.
//!
//! This crate ties the wallet session, the chain endpoint and the event
//! decoder together. It submits wagers and follows them to finality, rebuilds
//! the player's history from ledger logs, and publishes the derived state as
//! immutable snapshots that front ends read without coordination.

pub mod builder;
pub mod engine;
pub mod history;
pub mod monitoring;
pub mod state;
pub mod submitter;

pub use builder::{BuilderError, CasinoBuilder};
pub use engine::{event_bus::EventBus, CasinoEngine, EngineError};
pub use history::{HistoryError, HistoryReconstructor};
pub use monitoring::TransactionMonitor;
pub use state::{StateError, WagerStateMachine};
pub use submitter::{SubmitError, TransactionSubmitter};

#[cfg(test)]
mod test_utils;
