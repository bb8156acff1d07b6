//! Common types module for the dice casino client.
//!
//! This module defines the data types shared by every layer of the client:
//! the wallet session, wager requests and their on-chain lifecycle, decoded
//! game facts, and the derived history and aggregate views. It provides a
//! single location for these types so the endpoint, wallet, decoder and core
//! crates agree on one model.

/// Raw chain data: logs, log filters and transaction receipts.
pub mod chain;
/// Event types published by the engine to front ends.
pub mod events;
/// Decoded game facts, history and player aggregates.
pub mod game;
/// Network configuration for the single chain the client targets.
pub mod networks;
/// Registry trait for self-registering implementations.
pub mod registry;
/// Zeroizing wrapper for private keys and other secrets.
pub mod secret_string;
/// Wallet session identity and provider notifications.
pub mod session;
/// Formatting and parsing helpers.
pub mod utils;
/// Configuration validation types.
pub mod validation;
/// Wager requests, pending transactions and outcomes.
pub mod wager;

pub use alloy_primitives::{Address, Bytes, B256, I256, U256};
pub use chain::*;
pub use events::*;
pub use game::*;
pub use networks::NetworkConfig;
pub use registry::ImplementationRegistry;
pub use secret_string::SecretString;
pub use session::*;
pub use utils::{
	current_timestamp, format_native_amount, formatting::AmountError, parse_native_amount,
	short_address, truncate_id, with_0x_prefix, without_0x_prefix,
};
pub use validation::*;
pub use wager::*;
