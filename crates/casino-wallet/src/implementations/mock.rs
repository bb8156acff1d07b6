//! Scriptable wallet for tests and dry runs.
//!
//! Accounts, chain and availability are set from the outside; changing them
//! notifies subscribers exactly like a browser wallet would. Sent
//! transactions are recorded and receive sequential hashes.

use crate::{SubscriberSet, WalletError, WalletInterface, WalletSubscription};
use async_trait::async_trait;
use casino_types::{
	Address, ConfigSchema, Field, FieldType, NetworkConfig, Schema, TransactionHash,
	ValidationError, WagerTransaction, WalletNotification, B256, U256,
};
use std::collections::HashMap;
use std::str::FromStr;
use tokio::sync::{mpsc, Mutex};

struct MockState {
	accounts: Vec<Address>,
	chain_id: u64,
	balances: HashMap<Address, U256>,
	available: bool,
	reject_next: bool,
	sent: Vec<WagerTransaction>,
}

pub struct MockWallet {
	state: Mutex<MockState>,
	subscribers: SubscriberSet,
}

impl MockWallet {
	pub fn new(account: Address, chain_id: u64) -> Self {
		Self {
			state: Mutex::new(MockState {
				accounts: vec![account],
				chain_id,
				balances: HashMap::new(),
				available: true,
				reject_next: false,
				sent: Vec::new(),
			}),
			subscribers: SubscriberSet::new(),
		}
	}

	/// Seeds a balance before the wallet is shared.
	pub fn with_balance(mut self, address: Address, balance: U256) -> Self {
		self.state.get_mut().balances.insert(address, balance);
		self
	}

	/// Replaces the linked accounts and notifies subscribers.
	pub async fn set_accounts(&self, accounts: Vec<Address>) {
		self.state.lock().await.accounts = accounts.clone();
		self.subscribers
			.notify(WalletNotification::AccountsChanged(accounts));
	}

	/// Switches networks and notifies subscribers.
	pub async fn set_chain(&self, chain_id: u64) {
		self.state.lock().await.chain_id = chain_id;
		self.subscribers
			.notify(WalletNotification::ChainChanged(chain_id));
	}

	/// Simulates the provider dropping the connection.
	pub fn drop_connection(&self) {
		self.subscribers.notify(WalletNotification::Disconnected);
	}

	pub async fn set_balance(&self, address: Address, balance: U256) {
		self.state.lock().await.balances.insert(address, balance);
	}

	/// Makes every request fail with `Unavailable` while false.
	pub async fn set_available(&self, available: bool) {
		self.state.lock().await.available = available;
	}

	/// The next authorization or signing request is declined.
	pub async fn reject_next(&self) {
		self.state.lock().await.reject_next = true;
	}

	pub async fn sent_transactions(&self) -> Vec<WagerTransaction> {
		self.state.lock().await.sent.clone()
	}

	pub fn listener_count(&self) -> usize {
		self.subscribers.len()
	}

	fn check(state: &mut MockState, action: &str) -> Result<(), WalletError> {
		if !state.available {
			return Err(WalletError::Unavailable("No wallet provider".into()));
		}
		if std::mem::take(&mut state.reject_next) {
			return Err(WalletError::UserRejected(format!("User declined {}", action)));
		}
		Ok(())
	}
}

pub struct MockWalletSchema;

impl ConfigSchema for MockWalletSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(
			vec![Field::new("address", FieldType::Address)],
			vec![
				Field::new(
					"chain_id",
					FieldType::Integer {
						min: Some(1),
						max: None,
					},
				),
				Field::new("balance", FieldType::String).with_validator(|value| {
					let raw = value.as_str().unwrap_or_default();
					U256::from_str(raw)
						.map(|_| ())
						.map_err(|e| format!("balance must be an integer in wei: {}", e))
				}),
			],
		)
		.validate(config)
	}
}

#[async_trait]
impl WalletInterface for MockWallet {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MockWalletSchema)
	}

	async fn request_accounts(&self) -> Result<Vec<Address>, WalletError> {
		let mut state = self.state.lock().await;
		Self::check(&mut state, "authorization")?;
		Ok(state.accounts.clone())
	}

	async fn accounts(&self) -> Result<Vec<Address>, WalletError> {
		let state = self.state.lock().await;
		if !state.available {
			return Err(WalletError::Unavailable("No wallet provider".into()));
		}
		Ok(state.accounts.clone())
	}

	async fn chain_id(&self) -> Result<u64, WalletError> {
		Ok(self.state.lock().await.chain_id)
	}

	async fn balance(&self, address: Address) -> Result<U256, WalletError> {
		Ok(self
			.state
			.lock()
			.await
			.balances
			.get(&address)
			.copied()
			.unwrap_or_default())
	}

	async fn send_transaction(&self, tx: WagerTransaction) -> Result<TransactionHash, WalletError> {
		let mut state = self.state.lock().await;
		Self::check(&mut state, "signing")?;
		if !state.accounts.contains(&tx.from) {
			return Err(WalletError::Unavailable(format!("Cannot sign for {}", tx.from)));
		}
		state.sent.push(tx);
		Ok(TransactionHash(B256::from(U256::from(state.sent.len()))))
	}

	fn subscribe(&self, sender: mpsc::UnboundedSender<WalletNotification>) -> WalletSubscription {
		self.subscribers.register(sender)
	}
}

/// Factory for the mock wallet.
///
/// `address` is the single linked account; `chain_id` defaults to the
/// network's and `balance` (wei, decimal string) to zero.
pub fn create_mock_wallet(
	config: &toml::Value,
	network: &NetworkConfig,
) -> Result<Box<dyn WalletInterface>, WalletError> {
	MockWalletSchema
		.validate(config)
		.map_err(|e| WalletError::Configuration(e.to_string()))?;

	let address = config
		.get("address")
		.and_then(|v| v.as_str())
		.and_then(|s| Address::from_str(s).ok())
		.ok_or_else(|| WalletError::Configuration("address is required".into()))?;
	let chain_id = config
		.get("chain_id")
		.and_then(|v| v.as_integer())
		.map(|id| id as u64)
		.unwrap_or(network.chain_id);
	let balance = config
		.get("balance")
		.and_then(|v| v.as_str())
		.and_then(|s| U256::from_str(s).ok())
		.unwrap_or_default();

	Ok(Box::new(
		MockWallet::new(address, chain_id).with_balance(address, balance),
	))
}

pub struct Registry;

impl casino_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "mock";
	type Factory = crate::WalletFactory;

	fn factory() -> Self::Factory {
		create_mock_wallet
	}
}

impl crate::WalletRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_factory_seeds_balance() {
		let config: toml::Value = toml::from_str(
			"address = \"0x00000000000000000000000000000000000000aa\"\nbalance = \"5000\"",
		)
		.unwrap();
		let wallet = create_mock_wallet(&config, &NetworkConfig::flow_testnet()).unwrap();

		let account = Address::with_last_byte(0xaa);
		assert_eq!(wallet.balance(account).await.unwrap(), U256::from(5000));
		assert_eq!(wallet.chain_id().await.unwrap(), 545);
	}

	#[tokio::test]
	async fn test_sequential_hashes_and_rejection() {
		let account = Address::repeat_byte(0xaa);
		let wallet = MockWallet::new(account, 545);
		let tx = WagerTransaction {
			from: account,
			to: Address::repeat_byte(0x3c),
			value: U256::from(10),
			input: Default::default(),
			chain_id: 545,
		};

		let first = wallet.send_transaction(tx.clone()).await.unwrap();
		let second = wallet.send_transaction(tx.clone()).await.unwrap();
		assert_ne!(first, second);

		wallet.reject_next().await;
		assert!(matches!(
			wallet.send_transaction(tx).await,
			Err(WalletError::UserRejected(_))
		));
		assert_eq!(wallet.sent_transactions().await.len(), 2);
	}

	#[tokio::test]
	async fn test_set_accounts_notifies() {
		let wallet = MockWallet::new(Address::repeat_byte(0xaa), 545);
		let (tx, mut rx) = mpsc::unbounded_channel();
		let _subscription = wallet.subscribe(tx);

		wallet.set_chain(1).await;
		assert_eq!(rx.recv().await, Some(WalletNotification::ChainChanged(1)));
	}
}
