//! Wager types for the dice game.
//!
//! This module defines the user-facing wager request, the unsigned
//! transaction handed to the wallet, the pending transaction tracked until
//! finality, and the outcome surfaced once the ledger has settled it.

use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lowest face of the die.
pub const MIN_GUESS: u8 = 1;
/// Highest face of the die.
pub const MAX_GUESS: u8 = 6;

/// Preset bet amounts offered to players, in native currency units.
pub const QUICK_BETS: [&str; 3] = ["0.01", "0.05", "0.1"];

/// A user-initiated bet that has not reached the ledger yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WagerRequest {
	/// Face of the die the player bets on.
	pub guess: u8,
	/// Bet in wei.
	pub bet_amount: U256,
	pub submitting_address: Address,
	pub target_chain: u64,
}

impl WagerRequest {
	pub fn is_valid_guess(&self) -> bool {
		(MIN_GUESS..=MAX_GUESS).contains(&self.guess)
	}
}

/// Bet bounds configured on the ledger, in wei.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetLimits {
	pub min_bet: U256,
	pub max_bet: U256,
}

impl BetLimits {
	/// True when `amount` is within `[min_bet, max_bet]`.
	pub fn contains(&self, amount: U256) -> bool {
		amount >= self.min_bet && amount <= self.max_bet
	}
}

/// Blockchain transaction hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionHash(pub B256);

impl fmt::Display for TransactionHash {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Unsigned payable call built for the wallet to sign and broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WagerTransaction {
	pub from: Address,
	pub to: Address,
	pub value: U256,
	pub input: Bytes,
	pub chain_id: u64,
}

/// Lifecycle of a submitted wager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionState {
	/// Broadcast; a hash has been assigned.
	Submitted,
	/// Waiting for a receipt.
	Confirming,
	/// Included and executed successfully.
	Confirmed,
	/// Reverted, dropped or abandoned.
	Failed,
}

impl TransactionState {
	pub fn is_terminal(&self) -> bool {
		matches!(self, Self::Confirmed | Self::Failed)
	}
}

/// A submitted wager that has not reached a terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTransaction {
	pub transaction_hash: TransactionHash,
	/// Unix seconds at broadcast.
	pub submitted_at: u64,
	pub state: TransactionState,
	/// Account that signed the transaction.
	pub player: Address,
	pub chain_id: u64,
	pub guess: u8,
	pub bet_amount: U256,
	/// Session epoch the wager was submitted under.
	pub session_epoch: u64,
}

/// Result of a confirmed wager as read from its receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WagerOutcome {
	Won {
		game_id: U256,
		result: u8,
		payout: U256,
	},
	Lost {
		game_id: U256,
		result: u8,
	},
	/// The receipt held no resolution for this player.
	Unresolved,
}

impl WagerOutcome {
	pub fn game_id(&self) -> Option<U256> {
		match self {
			Self::Won { game_id, .. } | Self::Lost { game_id, .. } => Some(*game_id),
			Self::Unresolved => None,
		}
	}

	pub fn payout(&self) -> U256 {
		match self {
			Self::Won { payout, .. } => *payout,
			_ => U256::ZERO,
		}
	}
}

/// A wager that reached `Confirmed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettledWager {
	pub transaction: PendingTransaction,
	pub outcome: WagerOutcome,
	/// Whether the confirmation refreshed the active session's history.
	/// False when the session changed while the wager was confirming.
	pub applied: bool,
}
