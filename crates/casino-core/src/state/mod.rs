//! Wager lifecycle state management.

pub mod wager;

pub use wager::{StateError, WagerStateMachine};
