//! Notification subscriptions.

use casino_types::WalletNotification;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Guard for a wallet notification subscription.
///
/// Dropping the guard unsubscribes.
#[must_use = "dropping the subscription unsubscribes immediately"]
pub struct WalletSubscription {
	disposer: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl WalletSubscription {
	pub fn new(disposer: impl FnOnce() + Send + Sync + 'static) -> Self {
		Self {
			disposer: Some(Box::new(disposer)),
		}
	}

	/// A subscription with nothing to release.
	pub fn noop() -> Self {
		Self { disposer: None }
	}
}

impl Drop for WalletSubscription {
	fn drop(&mut self) {
		if let Some(dispose) = self.disposer.take() {
			dispose();
		}
	}
}

impl std::fmt::Debug for WalletSubscription {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("WalletSubscription")
			.field("active", &self.disposer.is_some())
			.finish()
	}
}

type Subscribers = HashMap<u64, mpsc::UnboundedSender<WalletNotification>>;

/// Set of subscribers a provider fans notifications out to.
#[derive(Clone, Default)]
pub struct SubscriberSet {
	inner: Arc<Mutex<Subscribers>>,
	next_id: Arc<AtomicU64>,
}

impl SubscriberSet {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers `sender`; the guard removes it again.
	pub fn register(&self, sender: mpsc::UnboundedSender<WalletNotification>) -> WalletSubscription {
		let id = self.next_id.fetch_add(1, Ordering::Relaxed);
		if let Ok(mut subscribers) = self.inner.lock() {
			subscribers.insert(id, sender);
		}

		let inner = Arc::clone(&self.inner);
		WalletSubscription::new(move || {
			if let Ok(mut subscribers) = inner.lock() {
				subscribers.remove(&id);
			}
		})
	}

	/// Sends `notification` to every live subscriber, pruning closed ones.
	pub fn notify(&self, notification: WalletNotification) {
		if let Ok(mut subscribers) = self.inner.lock() {
			subscribers.retain(|_, sender| sender.send(notification.clone()).is_ok());
		}
	}

	pub fn len(&self) -> usize {
		self.inner.lock().map(|s| s.len()).unwrap_or_default()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_drop_unsubscribes() {
		let set = SubscriberSet::new();
		let (tx, mut rx) = mpsc::unbounded_channel();

		let guard = set.register(tx);
		assert_eq!(set.len(), 1);
		set.notify(WalletNotification::ChainChanged(1));
		assert_eq!(rx.try_recv().unwrap(), WalletNotification::ChainChanged(1));

		drop(guard);
		assert!(set.is_empty());
		set.notify(WalletNotification::ChainChanged(2));
		assert!(rx.try_recv().is_err());
	}

	#[test]
	fn test_closed_receivers_pruned() {
		let set = SubscriberSet::new();
		let (tx, rx) = mpsc::unbounded_channel();
		let _guard = set.register(tx);
		drop(rx);

		set.notify(WalletNotification::Disconnected);
		assert!(set.is_empty());
	}
}
