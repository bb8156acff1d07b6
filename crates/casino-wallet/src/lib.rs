//! Wallet provider capability and session tracking for the dice casino client.
//!
//! A wallet provider authorizes accounts, reports the active chain, signs and
//! broadcasts transactions, and pushes account/chain notifications to
//! subscribers. The [`SessionTracker`] turns those into an observable
//! [`WalletSession`](casino_types::WalletSession).

use async_trait::async_trait;
use casino_types::{
	Address, ConfigSchema, ImplementationRegistry, NetworkConfig, TransactionHash,
	WagerTransaction, WalletNotification, U256,
};
use thiserror::Error;
use tokio::sync::mpsc;

pub mod subscription;
pub mod tracker;

pub mod implementations {
	pub mod local;
	pub mod mock;
}

pub use subscription::{SubscriberSet, WalletSubscription};
pub use tracker::SessionTracker;

/// Errors that can occur during wallet operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WalletError {
	/// No provider, no account, or the session cannot sign for this request.
	#[error("Wallet unavailable: {0}")]
	Unavailable(String),
	/// The user declined authorization or signing.
	#[error("User rejected: {0}")]
	UserRejected(String),
	/// The provider failed to broadcast.
	#[error("Network error: {0}")]
	Network(String),
	#[error("Invalid wallet configuration: {0}")]
	Configuration(String),
}

/// Capability of an external wallet provider.
#[async_trait]
pub trait WalletInterface: Send + Sync {
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Asks the user to authorize accounts. Returns the linked accounts,
	/// primary first.
	async fn request_accounts(&self) -> Result<Vec<Address>, WalletError>;

	/// Currently linked accounts without prompting.
	async fn accounts(&self) -> Result<Vec<Address>, WalletError>;

	/// Chain the wallet is currently on.
	async fn chain_id(&self) -> Result<u64, WalletError>;

	/// Native balance of `address` in wei.
	async fn balance(&self, address: Address) -> Result<U256, WalletError>;

	/// Signs and broadcasts `tx`, returning its hash once accepted.
	async fn send_transaction(&self, tx: WagerTransaction) -> Result<TransactionHash, WalletError>;

	/// Delivers notifications to `sender` until the returned guard is dropped.
	fn subscribe(&self, sender: mpsc::UnboundedSender<WalletNotification>) -> WalletSubscription;
}

/// Builds a wallet from its TOML table and the target network.
pub type WalletFactory =
	fn(&toml::Value, &NetworkConfig) -> Result<Box<dyn WalletInterface>, WalletError>;

pub trait WalletRegistry: ImplementationRegistry<Factory = WalletFactory> {}

/// Every wallet implementation as (name, factory).
pub fn get_all_implementations() -> Vec<(&'static str, WalletFactory)> {
	use implementations::{local, mock};

	vec![
		(local::Registry::NAME, local::Registry::factory()),
		(mock::Registry::NAME, mock::Registry::factory()),
	]
}

/// Builds the wallet named `name`.
pub fn create_wallet(
	name: &str,
	config: &toml::Value,
	network: &NetworkConfig,
) -> Result<Box<dyn WalletInterface>, WalletError> {
	let (_, factory) = get_all_implementations()
		.into_iter()
		.find(|(implementation, _)| *implementation == name)
		.ok_or_else(|| {
			WalletError::Configuration(format!("Unknown wallet implementation '{}'", name))
		})?;
	factory(config, network)
}
