//! Observable wallet session.
//!
//! The tracker owns the [`WalletSession`] and is its only writer. Front ends
//! read it through [`SessionTracker::session`] or follow it through a watch
//! receiver. Every identity change bumps the session epoch.

use crate::{WalletError, WalletInterface, WalletSubscription};
use casino_types::{short_address, Address, WalletNotification, WalletSession};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tracing::instrument;

pub struct SessionTracker {
	wallet: Arc<dyn WalletInterface>,
	state: watch::Sender<WalletSession>,
	/// Held while the session is connected. Also serializes mutations.
	subscription: Mutex<Option<WalletSubscription>>,
	/// Where provider notifications are forwarded once connected.
	notifications: mpsc::UnboundedSender<WalletNotification>,
}

impl SessionTracker {
	pub fn new(
		wallet: Arc<dyn WalletInterface>,
		notifications: mpsc::UnboundedSender<WalletNotification>,
	) -> Self {
		let (state, _) = watch::channel(WalletSession::default());
		Self {
			wallet,
			state,
			subscription: Mutex::new(None),
			notifications,
		}
	}

	pub fn wallet(&self) -> &Arc<dyn WalletInterface> {
		&self.wallet
	}

	/// Current session.
	pub fn session(&self) -> WalletSession {
		self.state.borrow().clone()
	}

	/// Receiver that observes every published session.
	pub fn watch(&self) -> watch::Receiver<WalletSession> {
		self.state.subscribe()
	}

	/// Whether a notification subscription is currently held.
	pub async fn is_subscribed(&self) -> bool {
		self.subscription.lock().await.is_some()
	}

	fn next_epoch(&self) -> u64 {
		self.state.borrow().epoch() + 1
	}

	fn publish(&self, session: WalletSession) {
		self.state.send_replace(session);
	}

	/// Connects the wallet and starts observing its notifications.
	///
	/// Returns the current session unchanged if already connected. On failure
	/// the session falls back to disconnected.
	#[instrument(skip_all)]
	pub async fn connect(&self) -> Result<WalletSession, WalletError> {
		let mut subscription = self.subscription.lock().await;
		let current = self.session();
		if current.is_connected() {
			return Ok(current);
		}

		self.publish(WalletSession::connecting(self.next_epoch()));
		match self.authorize().await {
			Ok((address, chain_id)) => {
				let balance = self.fetch_balance(address).await;
				let session =
					WalletSession::connected(address, chain_id, self.next_epoch()).with_balance(balance);
				*subscription = Some(self.wallet.subscribe(self.notifications.clone()));
				self.publish(session.clone());
				tracing::info!(
					address = %short_address(&address),
					chain_id,
					epoch = session.epoch(),
					"Wallet connected"
				);
				Ok(session)
			},
			Err(e) => {
				tracing::warn!(error = %e, "Wallet connection failed");
				self.publish(WalletSession::disconnected(self.next_epoch()));
				Err(e)
			},
		}
	}

	async fn authorize(&self) -> Result<(Address, u64), WalletError> {
		let accounts = self.wallet.request_accounts().await?;
		let address = accounts
			.first()
			.copied()
			.ok_or_else(|| WalletError::Unavailable("No accounts authorized".into()))?;
		let chain_id = self.wallet.chain_id().await?;
		Ok((address, chain_id))
	}

	async fn fetch_balance(&self, address: Address) -> Option<casino_types::U256> {
		match self.wallet.balance(address).await {
			Ok(balance) => Some(balance),
			Err(e) => {
				tracing::warn!(error = %e, "Failed to fetch balance");
				None
			},
		}
	}

	/// Clears the identity and releases the notification subscription.
	pub async fn disconnect(&self) -> WalletSession {
		let mut subscription = self.subscription.lock().await;
		self.disconnect_locked(&mut subscription)
	}

	fn disconnect_locked(&self, subscription: &mut Option<WalletSubscription>) -> WalletSession {
		subscription.take();
		let session = WalletSession::disconnected(self.next_epoch());
		self.publish(session.clone());
		tracing::info!(epoch = session.epoch(), "Wallet disconnected");
		session
	}

	/// Applies a provider notification.
	///
	/// Returns the new session when the identity changed, `None` when the
	/// notification was a no-op. An empty account list disconnects.
	pub async fn apply(&self, notification: WalletNotification) -> Option<WalletSession> {
		let mut subscription = self.subscription.lock().await;
		let current = self.session();

		match notification {
			WalletNotification::AccountsChanged(accounts) => {
				let Some(address) = accounts.first().copied() else {
					if current.is_connected() {
						return Some(self.disconnect_locked(&mut subscription));
					}
					return None;
				};
				let chain_id = current.chain_id().filter(|_| current.is_connected())?;
				if current.address() == Some(address) {
					return None;
				}
				let balance = self.fetch_balance(address).await;
				let session =
					WalletSession::connected(address, chain_id, self.next_epoch()).with_balance(balance);
				tracing::info!(
					address = %short_address(&address),
					epoch = session.epoch(),
					"Wallet account changed"
				);
				self.publish(session.clone());
				Some(session)
			},
			WalletNotification::ChainChanged(chain_id) => {
				let address = current.address()?;
				if current.chain_id() == Some(chain_id) {
					return None;
				}
				let balance = self.fetch_balance(address).await;
				let session =
					WalletSession::connected(address, chain_id, self.next_epoch()).with_balance(balance);
				tracing::info!(chain_id, epoch = session.epoch(), "Wallet chain changed");
				self.publish(session.clone());
				Some(session)
			},
			WalletNotification::Disconnected => {
				if current.is_connected() {
					Some(self.disconnect_locked(&mut subscription))
				} else {
					None
				}
			},
		}
	}

	/// Re-reads the native balance of the connected account without
	/// changing the epoch.
	pub async fn refresh_balance(&self) -> Option<casino_types::U256> {
		let _guard = self.subscription.lock().await;
		let current = self.session();
		let address = current.address()?;
		let balance = self.fetch_balance(address).await?;
		self.state.send_if_modified(|session| {
			if session.epoch() == current.epoch() {
				*session = session.clone().with_balance(Some(balance));
				true
			} else {
				false
			}
		});
		Some(balance)
	}
}
