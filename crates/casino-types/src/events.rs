//! Events published by the engine.
//!
//! Front ends subscribe to a broadcast of [`CasinoEvent`] instead of polling
//! the engine. Every event carries enough context to be rendered on its own.

use crate::{CasinoSnapshot, PendingTransaction, TransactionHash, WagerOutcome, WalletSession};
use serde::{Deserialize, Serialize};

/// Main event type, grouped by the component that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CasinoEvent {
	Session(SessionEvent),
	Wager(WagerEvent),
	History(HistoryEvent),
}

/// Wallet session changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SessionEvent {
	/// The session identity changed; carries the new session.
	Changed { session: WalletSession },
	/// The wallet is on a chain other than the configured one.
	ChainMismatch { expected: u64, actual: u64 },
}

/// Wager lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WagerEvent {
	Submitted {
		transaction: PendingTransaction,
	},
	Confirmed {
		transaction_hash: TransactionHash,
		outcome: WagerOutcome,
		/// False when the session changed while confirming.
		applied: bool,
	},
	Failed {
		transaction_hash: Option<TransactionHash>,
		reason: String,
	},
	/// No receipt within the confirmation timeout. The transaction may
	/// still land; its result then shows up on the next rebuild.
	TimedOut {
		transaction_hash: TransactionHash,
	},
}

/// Derived state refreshes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum HistoryEvent {
	Rebuilt { snapshot: CasinoSnapshot },
	RebuildFailed { epoch: u64, reason: String },
}
