//! Wager submission.
//!
//! The submitter validates a [`WagerRequest`] against the die faces, the
//! ledger's bet limits and the active wallet session, then asks the wallet to
//! sign and broadcast a `rollDice` call. At most one wager is in flight at a
//! time; a second submission is rejected until the first one is finished or
//! released.

use crate::state::{StateError, WagerStateMachine};
use casino_decoder::{decode_bet_limit, encode_max_bet, encode_min_bet, encode_roll_dice};
use casino_endpoint::{EndpointError, EndpointInterface};
use casino_types::{
	current_timestamp, short_address, truncate_id, Address, BetLimits, PendingTransaction,
	TransactionHash, TransactionState, WagerRequest, WagerTransaction, WalletSession, U256,
};
use casino_wallet::{WalletError, WalletInterface};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::instrument;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubmitError {
	#[error("Wallet unavailable: {0}")]
	WalletUnavailable(String),
	#[error("User rejected: {0}")]
	UserRejected(String),
	#[error("Invalid amount: {0}")]
	InvalidAmount(String),
	#[error("Invalid guess {0}, expected a face between 1 and 6")]
	InvalidGuess(u8),
	#[error("A wager is already in flight")]
	WagerInFlight,
	#[error("Endpoint unavailable: {0}")]
	EndpointUnavailable(String),
	#[error("Transaction {hash} failed: {reason}")]
	TransactionFailed {
		hash: TransactionHash,
		reason: String,
	},
	#[error("Transaction {0} not confirmed in time")]
	ConfirmationTimeout(TransactionHash),
	#[error(transparent)]
	InvalidTransition(#[from] StateError),
}

impl From<EndpointError> for SubmitError {
	fn from(e: EndpointError) -> Self {
		Self::EndpointUnavailable(e.to_string())
	}
}

impl From<WalletError> for SubmitError {
	fn from(e: WalletError) -> Self {
		match e {
			WalletError::UserRejected(reason) => Self::UserRejected(reason),
			other => Self::WalletUnavailable(other.to_string()),
		}
	}
}

/// The single-flight slot.
#[derive(Debug, Default)]
enum Slot {
	#[default]
	Idle,
	/// Validation or signing is running.
	Reserved,
	InFlight(PendingTransaction),
}

/// Holds the slot while a submission runs; frees it on drop unless a
/// pending transaction was committed.
struct Reservation<'a> {
	slot: &'a Mutex<Slot>,
	committed: bool,
}

impl Reservation<'_> {
	fn commit(mut self, pending: PendingTransaction) {
		*lock(self.slot) = Slot::InFlight(pending);
		self.committed = true;
	}
}

impl Drop for Reservation<'_> {
	fn drop(&mut self) {
		if !self.committed {
			*lock(self.slot) = Slot::Idle;
		}
	}
}

/// Held while a wager is being confirmed. Dropping it frees the slot if the
/// wager never reached a terminal state, including when the confirming
/// future is cancelled.
pub struct ConfirmationGuard<'a> {
	submitter: &'a TransactionSubmitter,
	hash: TransactionHash,
}

impl Drop for ConfirmationGuard<'_> {
	fn drop(&mut self) {
		if self.submitter.release(&self.hash).is_some() {
			tracing::debug!(
				tx_hash = %truncate_id(&self.hash.to_string()),
				"Confirmation abandoned, wager slot freed"
			);
		}
	}
}

fn lock(slot: &Mutex<Slot>) -> MutexGuard<'_, Slot> {
	slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Builds, signs and tracks dice wagers.
pub struct TransactionSubmitter {
	endpoint: Arc<dyn EndpointInterface>,
	wallet: Arc<dyn WalletInterface>,
	casino: Address,
	chain_id: u64,
	limits: OnceCell<BetLimits>,
	slot: Mutex<Slot>,
}

impl TransactionSubmitter {
	pub fn new(
		endpoint: Arc<dyn EndpointInterface>,
		wallet: Arc<dyn WalletInterface>,
		casino: Address,
		chain_id: u64,
	) -> Self {
		Self {
			endpoint,
			wallet,
			casino,
			chain_id,
			limits: OnceCell::new(),
			slot: Mutex::new(Slot::Idle),
		}
	}

	/// Bet limits read from the ledger on first use and cached afterwards.
	pub async fn bet_limits(&self) -> Result<BetLimits, SubmitError> {
		self.limits
			.get_or_try_init(|| async {
				let min_bet = self.read_limit(encode_min_bet()).await?;
				let max_bet = self.read_limit(encode_max_bet()).await?;
				tracing::debug!(%min_bet, %max_bet, "Loaded bet limits");
				Ok::<_, SubmitError>(BetLimits { min_bet, max_bet })
			})
			.await
			.copied()
	}

	async fn read_limit(&self, call: casino_types::Bytes) -> Result<U256, SubmitError> {
		let data = self.endpoint.call(self.casino, call).await?;
		decode_bet_limit(&data).map_err(|e| SubmitError::EndpointUnavailable(e.to_string()))
	}

	/// The wager currently in flight, if any.
	pub fn in_flight(&self) -> Option<PendingTransaction> {
		match &*lock(&self.slot) {
			Slot::InFlight(pending) => Some(pending.clone()),
			_ => None,
		}
	}

	/// Validates `request` and broadcasts it through the wallet.
	///
	/// Nothing is sent and no pending transaction exists when this fails.
	#[instrument(skip_all, fields(guess = request.guess, bet = %request.bet_amount))]
	pub async fn submit_wager(
		&self,
		request: WagerRequest,
		session: &WalletSession,
	) -> Result<PendingTransaction, SubmitError> {
		let reservation = self.reserve()?;

		if !request.is_valid_guess() {
			return Err(SubmitError::InvalidGuess(request.guess));
		}
		if request.bet_amount.is_zero() {
			return Err(SubmitError::InvalidAmount(
				"bet must be greater than zero".into(),
			));
		}
		let limits = self.bet_limits().await?;
		if !limits.contains(request.bet_amount) {
			return Err(SubmitError::InvalidAmount(format!(
				"bet {} outside [{}, {}]",
				request.bet_amount, limits.min_bet, limits.max_bet
			)));
		}
		self.check_session(&request, session)?;

		let transaction = WagerTransaction {
			from: request.submitting_address,
			to: self.casino,
			value: request.bet_amount,
			input: encode_roll_dice(request.guess),
			chain_id: request.target_chain,
		};
		let transaction_hash = self.wallet.send_transaction(transaction).await?;

		let pending = PendingTransaction {
			transaction_hash,
			submitted_at: current_timestamp(),
			state: TransactionState::Submitted,
			player: request.submitting_address,
			chain_id: request.target_chain,
			guess: request.guess,
			bet_amount: request.bet_amount,
			session_epoch: session.epoch(),
		};
		reservation.commit(pending.clone());

		tracing::info!(
			tx_hash = %truncate_id(&transaction_hash.to_string()),
			address = %short_address(&pending.player),
			"Wager submitted"
		);
		Ok(pending)
	}

	fn reserve(&self) -> Result<Reservation<'_>, SubmitError> {
		let mut slot = lock(&self.slot);
		if !matches!(*slot, Slot::Idle) {
			return Err(SubmitError::WagerInFlight);
		}
		*slot = Slot::Reserved;
		Ok(Reservation {
			slot: &self.slot,
			committed: false,
		})
	}

	fn check_session(
		&self,
		request: &WagerRequest,
		session: &WalletSession,
	) -> Result<(), SubmitError> {
		let Some(address) = session.address() else {
			return Err(SubmitError::WalletUnavailable("wallet not connected".into()));
		};
		if address != request.submitting_address {
			return Err(SubmitError::WalletUnavailable(format!(
				"session account is {}, not {}",
				short_address(&address),
				short_address(&request.submitting_address)
			)));
		}
		if !session.is_on_chain(self.chain_id) || request.target_chain != self.chain_id {
			return Err(SubmitError::WalletUnavailable(format!(
				"wrong chain: wallet on {:?}, casino on {}",
				session.chain_id(),
				self.chain_id
			)));
		}
		Ok(())
	}

	/// Moves the in-flight wager `hash` to Confirming. The slot stays taken
	/// until a terminal transition or until the returned guard is dropped.
	pub fn begin_confirmation(
		&self,
		hash: &TransactionHash,
	) -> Result<ConfirmationGuard<'_>, SubmitError> {
		self.transition(hash, TransactionState::Confirming)?;
		Ok(ConfirmationGuard {
			submitter: self,
			hash: *hash,
		})
	}

	/// Moves the in-flight wager `hash` to `to` and returns its new value.
	pub fn transition(
		&self,
		hash: &TransactionHash,
		to: TransactionState,
	) -> Result<PendingTransaction, SubmitError> {
		let mut slot = lock(&self.slot);
		let updated = match &mut *slot {
			Slot::InFlight(pending) if pending.transaction_hash == *hash => {
				WagerStateMachine::transition(pending, to)?;
				pending.clone()
			},
			_ => return Err(StateError::InvalidTransition { from: None, to }.into()),
		};
		if to.is_terminal() {
			*slot = Slot::Idle;
		}
		Ok(updated)
	}

	/// Frees the slot held by `hash` without a terminal state. Used when
	/// confirmation was abandoned; the ledger result is picked up by the next
	/// rebuild.
	pub fn release(&self, hash: &TransactionHash) -> Option<PendingTransaction> {
		let mut slot = lock(&self.slot);
		match std::mem::take(&mut *slot) {
			Slot::InFlight(pending) if pending.transaction_hash == *hash => Some(pending),
			other => {
				*slot = other;
				None
			},
		}
	}
}
