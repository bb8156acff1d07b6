//! Snapshot store for the derived state.
//!
//! Holds the current [`CasinoSnapshot`] behind an `ArcSwap`. Readers load an
//! `Arc` and never observe a partially applied rebuild. Writes are tagged
//! with the session epoch they were computed for and are dropped when the
//! store has since been reset for another epoch.

use arc_swap::ArcSwap;
use casino_types::{CasinoSnapshot, History, PlayerAggregate, SyncStatus};
use std::sync::Arc;

pub struct SnapshotStore {
	current: ArcSwap<CasinoSnapshot>,
}

impl Default for SnapshotStore {
	fn default() -> Self {
		Self::new()
	}
}

impl SnapshotStore {
	pub fn new() -> Self {
		Self {
			current: ArcSwap::from_pointee(CasinoSnapshot::default()),
		}
	}

	pub fn load(&self) -> Arc<CasinoSnapshot> {
		self.current.load_full()
	}

	/// Clears history and aggregate and moves the store to `epoch`.
	pub fn reset(&self, epoch: u64) -> Arc<CasinoSnapshot> {
		let snapshot = Arc::new(CasinoSnapshot::empty(epoch));
		self.current.store(snapshot.clone());
		snapshot
	}

	/// Flags the values of `epoch` as being recomputed.
	pub fn begin_rebuild(&self, epoch: u64) -> Option<Arc<CasinoSnapshot>> {
		self.update(epoch, |current| CasinoSnapshot {
			status: SyncStatus::Loading,
			..current.clone()
		})
	}

	/// Replaces the values of `epoch` with a finished rebuild.
	pub fn complete(
		&self,
		epoch: u64,
		history: History,
		aggregate: PlayerAggregate,
	) -> Option<Arc<CasinoSnapshot>> {
		self.update(epoch, |_| CasinoSnapshot {
			history: history.clone(),
			aggregate,
			status: SyncStatus::Ready,
			epoch,
		})
	}

	/// Records a failed rebuild of `epoch`, keeping the previous values.
	pub fn fail(&self, epoch: u64, reason: &str) -> Option<Arc<CasinoSnapshot>> {
		self.update(epoch, |current| CasinoSnapshot {
			status: SyncStatus::Unavailable(reason.to_string()),
			..current.clone()
		})
	}

	/// Swaps in `f(current)` if the store still belongs to `epoch`.
	/// Returns the stored snapshot, or `None` when the write was stale.
	fn update(
		&self,
		epoch: u64,
		f: impl Fn(&CasinoSnapshot) -> CasinoSnapshot,
	) -> Option<Arc<CasinoSnapshot>> {
		let mut written = None;
		self.current.rcu(|current| {
			if current.epoch == epoch {
				let next = Arc::new(f(current));
				written = Some(next.clone());
				next
			} else {
				written = None;
				current.clone()
			}
		});
		written
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use casino_types::Address;

	#[test]
	fn test_stale_writes_are_dropped() {
		let store = SnapshotStore::new();
		store.reset(3);
		assert!(store.begin_rebuild(3).is_some());
		assert_eq!(store.load().status, SyncStatus::Loading);

		store.reset(4);
		let history = History::new(Address::ZERO, 545, vec![]);
		assert!(store
			.complete(3, history, PlayerAggregate::default())
			.is_none());
		assert_eq!(store.load().epoch, 4);
		assert_eq!(store.load().status, SyncStatus::Idle);
	}

	#[test]
	fn test_failure_keeps_values() {
		let store = SnapshotStore::new();
		store.reset(1);
		let history = History::new(Address::ZERO, 545, vec![]);
		store.complete(1, history.clone(), PlayerAggregate::default());

		let failed = store.fail(1, "endpoint down").unwrap();
		assert_eq!(failed.history, history);
		assert_eq!(
			failed.status,
			SyncStatus::Unavailable("endpoint down".into())
		);
	}

	#[test]
	fn test_readers_keep_their_snapshot() {
		let store = SnapshotStore::new();
		store.reset(1);
		let before = store.load();
		store.reset(2);
		assert_eq!(before.epoch, 1);
		assert_eq!(store.load().epoch, 2);
	}
}
