//! Wager state machine.
//!
//! A wager moves Idle -> Submitted -> Confirming -> {Confirmed | Failed}.
//! Idle is the absence of a pending transaction and is represented as `None`.
//! A submitted wager may also fail directly when it is dropped before a
//! receipt is requested.

use casino_types::{PendingTransaction, TransactionState};
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateError {
	#[error("Invalid wager transition from {from:?} to {to:?}")]
	InvalidTransition {
		from: Option<TransactionState>,
		to: TransactionState,
	},
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum WagerStateKind {
	Idle,
	Submitted,
	Confirming,
	Confirmed,
	Failed,
}

impl From<Option<TransactionState>> for WagerStateKind {
	fn from(state: Option<TransactionState>) -> Self {
		match state {
			None => Self::Idle,
			Some(TransactionState::Submitted) => Self::Submitted,
			Some(TransactionState::Confirming) => Self::Confirming,
			Some(TransactionState::Confirmed) => Self::Confirmed,
			Some(TransactionState::Failed) => Self::Failed,
		}
	}
}

// Each state maps to the states it may move to.
static TRANSITIONS: Lazy<HashMap<WagerStateKind, HashSet<WagerStateKind>>> = Lazy::new(|| {
	let mut m = HashMap::new();
	m.insert(
		WagerStateKind::Idle,
		HashSet::from([WagerStateKind::Submitted]),
	);
	m.insert(
		WagerStateKind::Submitted,
		HashSet::from([WagerStateKind::Confirming, WagerStateKind::Failed]),
	);
	m.insert(
		WagerStateKind::Confirming,
		HashSet::from([WagerStateKind::Confirmed, WagerStateKind::Failed]),
	);
	m.insert(WagerStateKind::Confirmed, HashSet::new()); // terminal
	m.insert(WagerStateKind::Failed, HashSet::new()); // terminal
	m
});

/// Validates and applies wager state transitions.
pub struct WagerStateMachine;

impl WagerStateMachine {
	pub fn is_valid_transition(from: Option<TransactionState>, to: TransactionState) -> bool {
		TRANSITIONS
			.get(&WagerStateKind::from(from))
			.is_some_and(|set| set.contains(&WagerStateKind::from(Some(to))))
	}

	/// Moves `pending` to `to`, leaving it untouched on an invalid transition.
	pub fn transition(
		pending: &mut PendingTransaction,
		to: TransactionState,
	) -> Result<(), StateError> {
		if !Self::is_valid_transition(Some(pending.state), to) {
			return Err(StateError::InvalidTransition {
				from: Some(pending.state),
				to,
			});
		}
		pending.state = to;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use casino_types::{Address, TransactionHash, B256, U256};

	fn pending() -> PendingTransaction {
		PendingTransaction {
			transaction_hash: TransactionHash(B256::ZERO),
			submitted_at: 0,
			state: TransactionState::Submitted,
			player: Address::ZERO,
			chain_id: 545,
			guess: 3,
			bet_amount: U256::from(1),
			session_epoch: 1,
		}
	}

	#[test]
	fn test_happy_path() {
		assert!(WagerStateMachine::is_valid_transition(
			None,
			TransactionState::Submitted
		));
		let mut tx = pending();
		WagerStateMachine::transition(&mut tx, TransactionState::Confirming).unwrap();
		WagerStateMachine::transition(&mut tx, TransactionState::Confirmed).unwrap();
		assert_eq!(tx.state, TransactionState::Confirmed);
	}

	#[test]
	fn test_terminal_states_are_final() {
		let mut tx = pending();
		WagerStateMachine::transition(&mut tx, TransactionState::Failed).unwrap();

		let err = WagerStateMachine::transition(&mut tx, TransactionState::Confirming).unwrap_err();
		assert_eq!(
			err,
			StateError::InvalidTransition {
				from: Some(TransactionState::Failed),
				to: TransactionState::Confirming,
			}
		);
		assert_eq!(tx.state, TransactionState::Failed);
	}

	#[test]
	fn test_cannot_skip_confirming() {
		assert!(!WagerStateMachine::is_valid_transition(
			Some(TransactionState::Submitted),
			TransactionState::Confirmed
		));
		assert!(!WagerStateMachine::is_valid_transition(
			None,
			TransactionState::Confirming
		));
	}
}
