//! Casino engine that coordinates the wallet session, wager submission and
//! history reconstruction.
//!
//! The engine is the only writer of the derived state. Session changes,
//! whether commanded (`connect`, `disconnect`) or pushed by the wallet, are
//! applied under one sync lock together with the reset and rebuild they
//! trigger. Commands that read the session wait for that lock, so they never
//! act on an identity whose state is still being settled.

pub mod event_bus;
pub mod store;

use crate::history::{HistoryError, HistoryReconstructor};
use crate::monitoring::TransactionMonitor;
use crate::submitter::{SubmitError, TransactionSubmitter};
use casino_config::Config;
use casino_decoder::EventDecoder;
use casino_endpoint::EndpointInterface;
use casino_types::{
	short_address, truncate_id, BetLimits, CasinoEvent, CasinoSnapshot, HistoryEvent, NetworkConfig,
	PendingTransaction, SessionEvent, SettledWager, TransactionState, WagerEvent, WagerRequest,
	WalletNotification, WalletSession, U256,
};
use casino_wallet::{SessionTracker, WalletError, WalletInterface};
use event_bus::EventBus;
use std::sync::Arc;
use std::time::Duration;
use store::SnapshotStore;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, watch, Mutex};
use tracing::instrument;

/// Errors surfaced by engine commands.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
	#[error(transparent)]
	Wallet(#[from] WalletError),
	#[error(transparent)]
	Submit(#[from] SubmitError),
	#[error(transparent)]
	History(#[from] HistoryError),
	#[error("Configuration error: {0}")]
	Config(String),
}

/// Main engine of the casino client.
#[derive(Clone)]
pub struct CasinoEngine {
	network: NetworkConfig,
	tracker: Arc<SessionTracker>,
	submitter: Arc<TransactionSubmitter>,
	monitor: Arc<TransactionMonitor>,
	history: Arc<HistoryReconstructor>,
	store: Arc<SnapshotStore>,
	event_bus: EventBus,
	/// Serializes session changes with the resets and rebuilds they cause.
	sync: Arc<Mutex<()>>,
	notifications: Arc<Mutex<mpsc::UnboundedReceiver<WalletNotification>>>,
}

impl CasinoEngine {
	pub fn new(
		config: &Config,
		endpoint: Arc<dyn EndpointInterface>,
		wallet: Arc<dyn WalletInterface>,
	) -> Self {
		let network = config.network.clone();
		let (notification_tx, notification_rx) = mpsc::unbounded_channel();
		let decoder = EventDecoder::new(network.casino_address);

		let tracker = Arc::new(SessionTracker::new(wallet.clone(), notification_tx));
		let submitter = Arc::new(TransactionSubmitter::new(
			endpoint.clone(),
			wallet,
			network.casino_address,
			network.chain_id,
		));
		let monitor = Arc::new(TransactionMonitor::new(
			endpoint.clone(),
			decoder,
			Duration::from_millis(config.client.poll_interval_ms),
			Duration::from_secs(config.client.confirmation_timeout_seconds),
		));
		let history = Arc::new(
			HistoryReconstructor::new(endpoint, &network).with_retry(Duration::from_secs(
				config.client.rebuild_retry_max_elapsed_seconds,
			)),
		);

		Self {
			network,
			tracker,
			submitter,
			monitor,
			history,
			store: Arc::new(SnapshotStore::new()),
			event_bus: EventBus::new(256),
			sync: Arc::new(Mutex::new(())),
			notifications: Arc::new(Mutex::new(notification_rx)),
		}
	}

	pub fn network(&self) -> &NetworkConfig {
		&self.network
	}

	pub fn event_bus(&self) -> &EventBus {
		&self.event_bus
	}

	pub fn subscribe(&self) -> broadcast::Receiver<CasinoEvent> {
		self.event_bus.subscribe()
	}

	pub fn session(&self) -> WalletSession {
		self.tracker.session()
	}

	pub fn watch_session(&self) -> watch::Receiver<WalletSession> {
		self.tracker.watch()
	}

	/// Latest derived state.
	pub fn snapshot(&self) -> Arc<CasinoSnapshot> {
		self.store.load()
	}

	pub fn in_flight(&self) -> Option<PendingTransaction> {
		self.submitter.in_flight()
	}

	pub async fn bet_limits(&self) -> Result<BetLimits, EngineError> {
		Ok(self.submitter.bet_limits().await?)
	}

	/// Connects the wallet and rebuilds the history of the new identity.
	///
	/// A failed rebuild does not fail the connection; it is reported through
	/// the snapshot status.
	pub async fn connect(&self) -> Result<WalletSession, EngineError> {
		let _sync = self.sync.lock().await;
		let before = self.tracker.session().epoch();
		let result = self.tracker.connect().await;
		let session = self.tracker.session();
		if session.epoch() != before {
			self.on_session_changed(&session).await;
		}
		Ok(result?)
	}

	/// Disconnects the wallet. History and aggregate are cleared before this
	/// returns.
	pub async fn disconnect(&self) -> WalletSession {
		let _sync = self.sync.lock().await;
		let session = self.tracker.disconnect().await;
		self.on_session_changed(&session).await;
		session
	}

	/// Re-reads the connected account's native balance.
	pub async fn refresh_balance(&self) -> Option<U256> {
		self.tracker.refresh_balance().await
	}

	/// A request for the connected account on its current chain.
	pub fn wager_request(&self, guess: u8, bet_amount: U256) -> WagerRequest {
		let session = self.tracker.session();
		WagerRequest {
			guess,
			bet_amount,
			submitting_address: session.address().unwrap_or_default(),
			target_chain: session.chain_id().unwrap_or(self.network.chain_id),
		}
	}

	/// Validates and broadcasts a wager.
	pub async fn submit_wager(
		&self,
		request: WagerRequest,
	) -> Result<PendingTransaction, EngineError> {
		let _sync = self.sync.lock().await;
		let session = self.tracker.session();
		match self.submitter.submit_wager(request, &session).await {
			Ok(pending) => {
				self.event_bus
					.publish(CasinoEvent::Wager(WagerEvent::Submitted {
						transaction: pending.clone(),
					}))
					.ok();
				Ok(pending)
			},
			Err(e) => {
				tracing::warn!(error = %e, "Wager rejected");
				Err(e.into())
			},
		}
	}

	/// Follows `pending` to a terminal state.
	///
	/// A confirmed wager refreshes history only while the session that
	/// submitted it is still active; otherwise the outcome is returned with
	/// `applied == false` and the current state is left untouched.
	#[instrument(skip_all, fields(tx_hash = %truncate_id(&pending.transaction_hash.to_string())))]
	pub async fn confirm(&self, pending: PendingTransaction) -> Result<SettledWager, EngineError> {
		let hash = pending.transaction_hash;
		let _confirming = self.submitter.begin_confirmation(&hash)?;

		let receipt = match self.monitor.wait_for_receipt(&hash).await {
			Ok(receipt) => receipt,
			Err(SubmitError::ConfirmationTimeout(hash)) => {
				self.submitter.release(&hash);
				self.event_bus
					.publish(CasinoEvent::Wager(WagerEvent::TimedOut {
						transaction_hash: hash,
					}))
					.ok();
				return Err(SubmitError::ConfirmationTimeout(hash).into());
			},
			Err(e) => {
				self.submitter.transition(&hash, TransactionState::Failed)?;
				self.event_bus
					.publish(CasinoEvent::Wager(WagerEvent::Failed {
						transaction_hash: Some(hash),
						reason: e.to_string(),
					}))
					.ok();
				return Err(e.into());
			},
		};

		let transaction = self
			.submitter
			.transition(&hash, TransactionState::Confirmed)?;
		let outcome = self.monitor.read_outcome(&receipt, pending.player);

		let _sync = self.sync.lock().await;
		let session = self.tracker.session();
		let applied = session.is_same_identity(pending.player, pending.session_epoch);
		if applied {
			self.rebuild_locked(&session).await.ok();
		} else {
			tracing::info!(
				address = %short_address(&pending.player),
				submitted_epoch = pending.session_epoch,
				current_epoch = session.epoch(),
				"Session changed while confirming, outcome not applied"
			);
		}

		self.event_bus
			.publish(CasinoEvent::Wager(WagerEvent::Confirmed {
				transaction_hash: hash,
				outcome: outcome.clone(),
				applied,
			}))
			.ok();
		Ok(SettledWager {
			transaction,
			outcome,
			applied,
		})
	}

	/// Recomputes history and aggregate for the connected account.
	pub async fn rebuild(&self) -> Result<Arc<CasinoSnapshot>, EngineError> {
		let _sync = self.sync.lock().await;
		let session = self.tracker.session();
		if !session.is_connected() {
			return Err(WalletError::Unavailable("wallet not connected".into()).into());
		}
		Ok(self.rebuild_locked(&session).await?)
	}

	/// Applies wallet notifications already queued, in order.
	/// Returns how many changed the session.
	pub async fn process_notifications(&self) -> usize {
		let mut receiver = self.notifications.lock().await;
		let mut changed = 0;
		while let Ok(notification) = receiver.try_recv() {
			if self.handle_notification(notification).await {
				changed += 1;
			}
		}
		changed
	}

	/// Applies wallet notifications as they arrive until Ctrl+C.
	pub async fn run(&self) -> Result<(), EngineError> {
		let mut receiver = self.notifications.lock().await;
		loop {
			tokio::select! {
				Some(notification) = receiver.recv() => {
					self.handle_notification(notification).await;
				}

				_ = tokio::signal::ctrl_c() => {
					break;
				}
			}
		}
		tracing::info!("Engine stopped");
		Ok(())
	}

	async fn handle_notification(&self, notification: WalletNotification) -> bool {
		let _sync = self.sync.lock().await;
		tracing::debug!(?notification, "Wallet notification");
		match self.tracker.apply(notification).await {
			Some(session) => {
				self.on_session_changed(&session).await;
				true
			},
			None => false,
		}
	}

	/// Resets the derived state for `session` and, when connected, rebuilds
	/// it. Caller holds the sync lock.
	async fn on_session_changed(&self, session: &WalletSession) {
		self.store.reset(session.epoch());
		self.event_bus
			.publish(CasinoEvent::Session(SessionEvent::Changed {
				session: session.clone(),
			}))
			.ok();

		let Some(chain_id) = session.chain_id().filter(|_| session.is_connected()) else {
			return;
		};
		if chain_id != self.network.chain_id {
			tracing::warn!(
				expected = self.network.chain_id,
				actual = chain_id,
				"Wallet is on another chain"
			);
			self.event_bus
				.publish(CasinoEvent::Session(SessionEvent::ChainMismatch {
					expected: self.network.chain_id,
					actual: chain_id,
				}))
				.ok();
		}
		self.rebuild_locked(session).await.ok();
	}

	/// Rebuilds for `session` and publishes the result if the store still
	/// belongs to its epoch. Caller holds the sync lock.
	async fn rebuild_locked(
		&self,
		session: &WalletSession,
	) -> Result<Arc<CasinoSnapshot>, HistoryError> {
		let epoch = session.epoch();
		let Some(address) = session.address() else {
			return Ok(self.store.load());
		};

		self.store.begin_rebuild(epoch);
		match self.history.rebuild(address, self.network.chain_id).await {
			Ok((history, aggregate)) => match self.store.complete(epoch, history, aggregate) {
				Some(snapshot) => {
					self.event_bus
						.publish(CasinoEvent::History(HistoryEvent::Rebuilt {
							snapshot: (*snapshot).clone(),
						}))
						.ok();
					Ok(snapshot)
				},
				None => {
					tracing::debug!(epoch, "Discarding rebuild for a stale session");
					Ok(self.store.load())
				},
			},
			Err(e) => {
				tracing::warn!(error = %e, epoch, "History rebuild failed");
				self.store.fail(epoch, &e.to_string());
				self.event_bus
					.publish(CasinoEvent::History(HistoryEvent::RebuildFailed {
						epoch,
						reason: e.to_string(),
					}))
					.ok();
				Err(e)
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_utils::{
		config, ether, mock_hash, resolved_event, roll_receipt, started_event, Ledger, PLAYER,
	};
	use alloy_primitives::Bytes;
	use alloy_sol_types::SolCall;
	use casino_decoder::abi;
	use casino_endpoint::implementations::mock::MockEndpoint;
	use casino_types::{Address, SyncStatus, WagerOutcome};
	use casino_wallet::implementations::mock::MockWallet;

	async fn setup() -> (Arc<MockEndpoint>, Arc<MockWallet>, CasinoEngine) {
		let endpoint = Arc::new(MockEndpoint::new());
		endpoint
			.set_call_response(
				abi::minBetCall::SELECTOR,
				Bytes::from(ether("0.01").to_be_bytes::<32>().to_vec()),
			)
			.await;
		endpoint
			.set_call_response(
				abi::maxBetCall::SELECTOR,
				Bytes::from(ether("0.1").to_be_bytes::<32>().to_vec()),
			)
			.await;
		let ledger = Ledger::new(&endpoint);
		ledger.started(1, PLAYER, "0.01", 10).await;
		ledger.resolved(1, PLAYER, 4, 2, "0", 11).await;
		ledger.started(2, PLAYER, "0.05", 12).await;
		ledger.resolved(2, PLAYER, 5, 5, "0.30", 13).await;

		let wallet = Arc::new(MockWallet::new(PLAYER, 545));
		let engine = CasinoEngine::new(&config(), endpoint.clone(), wallet.clone());
		(endpoint, wallet, engine)
	}

	#[tokio::test]
	async fn test_connect_rebuilds_history() {
		let (_endpoint, _wallet, engine) = setup().await;
		let mut events = engine.subscribe();

		let session = engine.connect().await.unwrap();
		let snapshot = engine.snapshot();

		assert_eq!(snapshot.epoch, session.epoch());
		assert_eq!(snapshot.status, SyncStatus::Ready);
		assert_eq!(snapshot.history.len(), 2);
		assert_eq!(snapshot.aggregate.games_played, 2);
		assert_eq!(snapshot.aggregate.total_won, ether("0.30"));

		assert!(matches!(
			events.recv().await.unwrap(),
			CasinoEvent::Session(SessionEvent::Changed { .. })
		));
		assert!(matches!(
			events.recv().await.unwrap(),
			CasinoEvent::History(HistoryEvent::Rebuilt { .. })
		));
	}

	#[tokio::test]
	async fn test_disconnect_resets_state() {
		let (_endpoint, _wallet, engine) = setup().await;
		engine.connect().await.unwrap();
		assert_eq!(engine.snapshot().aggregate.games_played, 2);

		engine.disconnect().await;
		let snapshot = engine.snapshot();
		assert!(snapshot.history.is_empty());
		assert_eq!(snapshot.aggregate.games_played, 0);
		assert_eq!(snapshot.aggregate.total_wagered, U256::ZERO);
		assert_eq!(snapshot.status, SyncStatus::Idle);
	}

	#[tokio::test]
	async fn test_confirmed_wager_appends_one_fact() {
		let (endpoint, _wallet, engine) = setup().await;
		engine.connect().await.unwrap();

		let pending = engine
			.submit_wager(engine.wager_request(3, ether("0.05")))
			.await
			.unwrap();
		endpoint
			.insert_receipt(roll_receipt(
				pending.transaction_hash,
				&started_event(3, PLAYER, "0.05", 20),
				&resolved_event(3, PLAYER, 3, 3, "0.30", 20),
			))
			.await;

		let settled = engine.confirm(pending).await.unwrap();
		assert!(settled.applied);
		assert_eq!(settled.transaction.state, TransactionState::Confirmed);
		assert_eq!(settled.outcome.payout(), ether("0.30"));

		let snapshot = engine.snapshot();
		assert_eq!(snapshot.history.len(), 3);
		assert_eq!(snapshot.history.games[0].game_id, U256::from(3));
		assert_eq!(snapshot.aggregate.games_won, 2);
		assert!(engine.in_flight().is_none());
	}

	#[tokio::test]
	async fn test_failed_wager_leaves_history_unchanged() {
		let (endpoint, _wallet, engine) = setup().await;
		engine.connect().await.unwrap();
		let before = engine.snapshot();

		let pending = engine
			.submit_wager(engine.wager_request(3, ether("0.05")))
			.await
			.unwrap();
		endpoint
			.insert_receipt(casino_types::TransactionReceipt {
				hash: pending.transaction_hash,
				block_number: 20,
				success: false,
				logs: vec![],
			})
			.await;

		let result = engine.confirm(pending).await;
		assert!(matches!(
			result,
			Err(EngineError::Submit(SubmitError::TransactionFailed { .. }))
		));
		assert_eq!(engine.snapshot(), before);
		assert!(engine.in_flight().is_none());
	}

	#[tokio::test]
	async fn test_amount_over_max_creates_nothing() {
		let (_endpoint, wallet, engine) = setup().await;
		engine.connect().await.unwrap();

		let result = engine
			.submit_wager(engine.wager_request(3, ether("0.2")))
			.await;

		assert!(matches!(
			result,
			Err(EngineError::Submit(SubmitError::InvalidAmount(_)))
		));
		assert!(engine.in_flight().is_none());
		assert!(wallet.sent_transactions().await.is_empty());
	}

	#[tokio::test]
	async fn test_accounts_cleared_while_confirming() {
		let (endpoint, wallet, engine) = setup().await;
		engine.connect().await.unwrap();
		let pending = engine
			.submit_wager(engine.wager_request(3, ether("0.05")))
			.await
			.unwrap();

		let confirming = {
			let engine = engine.clone();
			let pending = pending.clone();
			tokio::spawn(async move { engine.confirm(pending).await })
		};

		wallet.set_accounts(vec![]).await;
		assert_eq!(engine.process_notifications().await, 1);
		assert!(!engine.session().is_connected());
		assert_eq!(engine.snapshot().aggregate.games_played, 0);
		assert!(engine.snapshot().history.is_empty());

		endpoint
			.insert_receipt(roll_receipt(
				pending.transaction_hash,
				&started_event(3, PLAYER, "0.05", 20),
				&resolved_event(3, PLAYER, 3, 3, "0.30", 20),
			))
			.await;

		let settled = confirming.await.unwrap().unwrap();
		assert!(!settled.applied);
		assert!(matches!(settled.outcome, WagerOutcome::Won { .. }));
		assert_eq!(engine.snapshot().aggregate.games_played, 0);
		assert!(engine.snapshot().history.is_empty());
	}

	#[tokio::test]
	async fn test_account_switch_rebuilds_for_new_address() {
		let (endpoint, wallet, engine) = setup().await;
		engine.connect().await.unwrap();

		let other = Address::with_last_byte(0xbb);
		Ledger::new(&endpoint).started(8, other, "0.1", 30).await;
		Ledger::new(&endpoint)
			.resolved(8, other, 6, 6, "0.6", 31)
			.await;

		wallet.set_accounts(vec![other]).await;
		engine.process_notifications().await;

		let snapshot = engine.snapshot();
		assert_eq!(snapshot.epoch, engine.session().epoch());
		assert_eq!(snapshot.history.address, Some(other));
		assert_eq!(snapshot.history.len(), 1);
		assert_eq!(snapshot.aggregate.total_won, ether("0.6"));
	}

	#[tokio::test]
	async fn test_chain_mismatch_refuses_wagers() {
		let (_endpoint, wallet, engine) = setup().await;
		engine.connect().await.unwrap();
		let mut events = engine.subscribe();

		wallet.set_chain(1).await;
		engine.process_notifications().await;

		let mut saw_mismatch = false;
		while let Ok(event) = events.try_recv() {
			if let CasinoEvent::Session(SessionEvent::ChainMismatch { expected, actual }) = event {
				assert_eq!((expected, actual), (545, 1));
				saw_mismatch = true;
			}
		}
		assert!(saw_mismatch);
		// History still targets the casino chain.
		assert_eq!(engine.snapshot().history.len(), 2);

		let result = engine
			.submit_wager(engine.wager_request(3, ether("0.05")))
			.await;
		assert!(matches!(
			result,
			Err(EngineError::Submit(SubmitError::WalletUnavailable(reason))) if reason.contains("wrong chain")
		));
	}

	#[tokio::test]
	async fn test_rebuild_failure_keeps_previous_values() {
		let (endpoint, _wallet, engine) = setup().await;
		engine.connect().await.unwrap();

		endpoint.fail_next(1).await;
		assert!(matches!(
			engine.rebuild().await,
			Err(EngineError::History(HistoryError::EndpointUnavailable(_)))
		));

		let snapshot = engine.snapshot();
		assert!(matches!(snapshot.status, SyncStatus::Unavailable(_)));
		assert_eq!(snapshot.history.len(), 2);

		let snapshot = engine.rebuild().await.unwrap();
		assert_eq!(snapshot.status, SyncStatus::Ready);
	}

	#[tokio::test]
	async fn test_rebuild_requires_connection() {
		let (_endpoint, _wallet, engine) = setup().await;
		assert!(matches!(
			engine.rebuild().await,
			Err(EngineError::Wallet(WalletError::Unavailable(_)))
		));
	}

	#[tokio::test(start_paused = true)]
	async fn test_confirmation_timeout_releases_slot() {
		let (_endpoint, _wallet, engine) = setup().await;
		engine.connect().await.unwrap();
		let pending = engine
			.submit_wager(engine.wager_request(3, ether("0.05")))
			.await
			.unwrap();

		let mut events = engine.subscribe();

		let result = engine.confirm(pending).await;
		assert_eq!(
			result,
			Err(EngineError::Submit(SubmitError::ConfirmationTimeout(
				mock_hash(1)
			)))
		);
		assert!(engine.in_flight().is_none());
		assert!(matches!(
			events.recv().await.unwrap(),
			CasinoEvent::Wager(WagerEvent::TimedOut { transaction_hash }) if transaction_hash == mock_hash(1)
		));
	}

	#[tokio::test]
	async fn test_cancelled_confirmation_frees_slot() {
		let (_endpoint, _wallet, engine) = setup().await;
		engine.connect().await.unwrap();
		let pending = engine
			.submit_wager(engine.wager_request(3, ether("0.05")))
			.await
			.unwrap();

		let confirming = {
			let engine = engine.clone();
			tokio::spawn(async move { engine.confirm(pending).await })
		};
		while engine.in_flight().map(|p| p.state) != Some(TransactionState::Confirming) {
			tokio::task::yield_now().await;
		}
		confirming.abort();
		assert!(confirming.await.unwrap_err().is_cancelled());
		assert!(engine.in_flight().is_none());

		engine.disconnect().await;
		engine.connect().await.unwrap();
		let second = engine
			.submit_wager(engine.wager_request(2, ether("0.01")))
			.await;
		assert!(second.is_ok());
	}

	#[tokio::test]
	async fn test_rejected_connect_stays_disconnected() {
		let (_endpoint, wallet, engine) = setup().await;
		wallet.reject_next().await;

		assert!(matches!(
			engine.connect().await,
			Err(EngineError::Wallet(WalletError::UserRejected(_)))
		));
		assert!(!engine.session().is_connected());
		assert!(engine.snapshot().history.is_empty());
	}
}
