//! Private-key wallet signing through an alloy provider.
//!
//! Signs locally with a [`PrivateKeySigner`] bound to the configured chain and
//! broadcasts over HTTP. A key-backed wallet never switches accounts or
//! chains on its own, so subscribers only hear from it on shutdown.

use crate::{SubscriberSet, WalletError, WalletInterface, WalletSubscription};
use alloy_network::EthereumWallet;
use alloy_provider::{Provider, ProviderBuilder};
use alloy_rpc_types::TransactionRequest;
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use alloy_transport_http::Http;
use async_trait::async_trait;
use casino_types::{
	truncate_id, Address, ConfigSchema, Field, FieldType, NetworkConfig, Schema, SecretString,
	TransactionHash, ValidationError, WagerTransaction, WalletNotification, U256,
};
use std::sync::Arc;
use tokio::sync::mpsc;

pub struct LocalWallet {
	address: Address,
	provider: Arc<dyn Provider<Http<reqwest::Client>> + Send + Sync>,
	subscribers: SubscriberSet,
}

impl LocalWallet {
	pub fn new(
		private_key: &SecretString,
		rpc_url: &str,
		chain_id: u64,
	) -> Result<Self, WalletError> {
		let signer: PrivateKeySigner = private_key.with_exposed(|key| {
			key.parse()
				.map_err(|_| WalletError::Configuration("Invalid private key format".into()))
		})?;
		let address = signer.address();

		let url = rpc_url
			.parse()
			.map_err(|e| WalletError::Configuration(format!("Invalid RPC URL: {}", e)))?;
		let wallet = EthereumWallet::from(signer.with_chain_id(Some(chain_id)));
		let provider = ProviderBuilder::new()
			.with_recommended_fillers()
			.wallet(wallet)
			.on_http(url);

		Ok(Self {
			address,
			provider: Arc::new(provider),
			subscribers: SubscriberSet::new(),
		})
	}
}

impl Drop for LocalWallet {
	fn drop(&mut self) {
		self.subscribers.notify(WalletNotification::Disconnected);
	}
}

/// Configuration schema for the local wallet.
pub struct LocalWalletSchema;

impl ConfigSchema for LocalWalletSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(
			vec![Field::new("private_key", FieldType::String).with_validator(|value| {
				let key = value.as_str().unwrap_or_default();
				let hex = key.strip_prefix("0x").unwrap_or(key);
				if hex.len() == 64 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
					Ok(())
				} else {
					Err("private_key must be 32 bytes of hex".to_string())
				}
			})],
			vec![Field::new("rpc_url", FieldType::Url)],
		)
		.validate(config)
	}
}

#[async_trait]
impl WalletInterface for LocalWallet {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(LocalWalletSchema)
	}

	async fn request_accounts(&self) -> Result<Vec<Address>, WalletError> {
		Ok(vec![self.address])
	}

	async fn accounts(&self) -> Result<Vec<Address>, WalletError> {
		Ok(vec![self.address])
	}

	async fn chain_id(&self) -> Result<u64, WalletError> {
		self.provider
			.get_chain_id()
			.await
			.map_err(|e| WalletError::Unavailable(format!("Failed to get chain id: {}", e)))
	}

	async fn balance(&self, address: Address) -> Result<U256, WalletError> {
		self.provider
			.get_balance(address)
			.await
			.map_err(|e| WalletError::Network(format!("Failed to get balance: {}", e)))
	}

	async fn send_transaction(&self, tx: WagerTransaction) -> Result<TransactionHash, WalletError> {
		if tx.from != self.address {
			return Err(WalletError::Unavailable(format!(
				"Cannot sign for {}",
				tx.from
			)));
		}

		let mut request = TransactionRequest::default()
			.from(tx.from)
			.to(tx.to)
			.value(tx.value)
			.input(tx.input.into());
		request.chain_id = Some(tx.chain_id);

		let pending = self
			.provider
			.send_transaction(request)
			.await
			.map_err(|e| WalletError::Network(format!("Failed to send transaction: {}", e)))?;

		let hash = TransactionHash(*pending.tx_hash());
		tracing::info!(
			tx_hash = %truncate_id(&hash.to_string()),
			chain_id = tx.chain_id,
			"Submitted transaction"
		);
		Ok(hash)
	}

	fn subscribe(&self, sender: mpsc::UnboundedSender<WalletNotification>) -> WalletSubscription {
		self.subscribers.register(sender)
	}
}

/// Factory for the local wallet.
///
/// # Parameters
/// - `config`: table with `private_key` (required) and `rpc_url` (optional
///   override of the network URL)
/// - `network`: target network; the signer is bound to its chain id
pub fn create_local_wallet(
	config: &toml::Value,
	network: &NetworkConfig,
) -> Result<Box<dyn WalletInterface>, WalletError> {
	LocalWalletSchema
		.validate(config)
		.map_err(|e| WalletError::Configuration(e.to_string()))?;

	let private_key = config
		.get("private_key")
		.and_then(|v| v.as_str())
		.map(SecretString::from)
		.ok_or_else(|| WalletError::Configuration("private_key is required".into()))?;
	let rpc_url = config
		.get("rpc_url")
		.and_then(|v| v.as_str())
		.unwrap_or(&network.rpc_url);

	Ok(Box::new(LocalWallet::new(
		&private_key,
		rpc_url,
		network.chain_id,
	)?))
}

pub struct Registry;

impl casino_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "local";
	type Factory = crate::WalletFactory;

	fn factory() -> Self::Factory {
		create_local_wallet
	}
}

impl crate::WalletRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;

	const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

	#[tokio::test]
	async fn test_accounts_are_signer_address() {
		let config: toml::Value = toml::from_str(&format!("private_key = \"{}\"", TEST_KEY)).unwrap();
		let wallet = create_local_wallet(&config, &NetworkConfig::flow_testnet()).unwrap();

		let expected: Address = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".parse().unwrap();
		assert_eq!(wallet.request_accounts().await.unwrap(), vec![expected]);
		assert_eq!(wallet.accounts().await.unwrap(), vec![expected]);
	}

	#[test]
	fn test_schema_rejects_short_key() {
		let config: toml::Value = toml::from_str("private_key = \"0x1234\"").unwrap();
		assert!(LocalWalletSchema.validate(&config).is_err());
		let config: toml::Value = toml::from_str("rpc_url = \"http://localhost:8545\"").unwrap();
		assert!(LocalWalletSchema.validate(&config).is_err());
	}

	#[tokio::test]
	async fn test_refuses_foreign_sender() {
		let wallet = LocalWallet::new(
			&SecretString::from(TEST_KEY),
			"http://localhost:8545",
			545,
		)
		.unwrap();

		let tx = WagerTransaction {
			from: Address::repeat_byte(0x01),
			to: Address::repeat_byte(0x3c),
			value: U256::from(1),
			input: Default::default(),
			chain_id: 545,
		};
		assert!(matches!(
			wallet.send_transaction(tx).await,
			Err(WalletError::Unavailable(_))
		));
	}
}
