//! Wallet session types.
//!
//! A `WalletSession` is the identity of the current actor. Its fields are only
//! reachable through constructors that keep the address and the connection
//! state consistent: an address exists exactly when the session is connected.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// Connectivity of the wallet provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectionState {
	#[default]
	Disconnected,
	Connecting,
	Connected,
}

/// Identity of the current actor as reported by the wallet provider.
///
/// `epoch` increases on every identity change (connect, disconnect, account
/// switch, chain switch). Work started under one epoch must not write into
/// state belonging to another.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WalletSession {
	address: Option<Address>,
	chain_id: Option<u64>,
	connection_state: ConnectionState,
	native_balance: Option<U256>,
	epoch: u64,
}

impl WalletSession {
	/// A session with no identity.
	pub fn disconnected(epoch: u64) -> Self {
		Self {
			epoch,
			..Self::default()
		}
	}

	/// A session waiting on the wallet provider for authorization.
	pub fn connecting(epoch: u64) -> Self {
		Self {
			connection_state: ConnectionState::Connecting,
			epoch,
			..Self::default()
		}
	}

	/// A connected session for `address` on `chain_id`.
	pub fn connected(address: Address, chain_id: u64, epoch: u64) -> Self {
		Self {
			address: Some(address),
			chain_id: Some(chain_id),
			connection_state: ConnectionState::Connected,
			native_balance: None,
			epoch,
		}
	}

	/// Returns a copy with the native balance attached.
	pub fn with_balance(mut self, balance: Option<U256>) -> Self {
		if self.is_connected() {
			self.native_balance = balance;
		}
		self
	}

	pub fn address(&self) -> Option<Address> {
		self.address
	}

	pub fn chain_id(&self) -> Option<u64> {
		self.chain_id
	}

	pub fn connection_state(&self) -> ConnectionState {
		self.connection_state
	}

	pub fn native_balance(&self) -> Option<U256> {
		self.native_balance
	}

	pub fn epoch(&self) -> u64 {
		self.epoch
	}

	pub fn is_connected(&self) -> bool {
		self.connection_state == ConnectionState::Connected
	}

	/// True when connected to the given chain.
	pub fn is_on_chain(&self, chain_id: u64) -> bool {
		self.is_connected() && self.chain_id == Some(chain_id)
	}

	/// True when `address` is the connected account of epoch `epoch`.
	pub fn is_same_identity(&self, address: Address, epoch: u64) -> bool {
		self.epoch == epoch && self.address == Some(address)
	}
}

/// Notifications emitted by a wallet provider, delivered in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletNotification {
	/// The set of linked accounts changed. An empty list means the user
	/// disconnected every account.
	AccountsChanged(Vec<Address>),
	/// The wallet switched networks.
	ChainChanged(u64),
	/// The provider dropped the connection.
	Disconnected,
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::address;

	#[test]
	fn test_address_only_when_connected() {
		let player = address!("00000000000000000000000000000000000000aa");

		let session = WalletSession::connected(player, 545, 3);
		assert!(session.is_connected());
		assert_eq!(session.address(), Some(player));
		assert!(session.is_on_chain(545));
		assert!(!session.is_on_chain(1));

		let session = WalletSession::connecting(4);
		assert_eq!(session.address(), None);
		assert_eq!(session.connection_state(), ConnectionState::Connecting);

		let session = WalletSession::disconnected(5);
		assert_eq!(session.address(), None);
		assert_eq!(session.chain_id(), None);
	}

	#[test]
	fn test_balance_ignored_when_not_connected() {
		let session = WalletSession::disconnected(1).with_balance(Some(U256::from(10)));
		assert_eq!(session.native_balance(), None);
	}

	#[test]
	fn test_identity_check_uses_epoch() {
		let player = address!("00000000000000000000000000000000000000aa");
		let session = WalletSession::connected(player, 545, 7);

		assert!(session.is_same_identity(player, 7));
		assert!(!session.is_same_identity(player, 6));
		assert!(!session.is_same_identity(Address::ZERO, 7));
	}
}
