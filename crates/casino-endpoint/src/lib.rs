//! Chain endpoint adapter for the dice casino client.
//!
//! Read-only access to the ledger: event logs, transaction receipts, the
//! latest block, view calls and native balances. Implementations are
//! stateless and never retry; every failure surfaces as
//! [`EndpointError::Unavailable`] and the caller decides what to do.

use async_trait::async_trait;
use casino_types::{
	Address, Bytes, ConfigSchema, ImplementationRegistry, LogFilter, NetworkConfig, RawLog,
	TransactionHash, TransactionReceipt, U256,
};
use thiserror::Error;

pub mod implementations {
	pub mod alloy;
	pub mod mock;
}

/// Errors returned by endpoint implementations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EndpointError {
	#[error("Endpoint unavailable: {0}")]
	Unavailable(String),
	#[error("Invalid endpoint configuration: {0}")]
	Configuration(String),
}

/// Read-only view of the ledger.
#[async_trait]
pub trait EndpointInterface: Send + Sync {
	/// Schema of the implementation's TOML table.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Logs matching `filter`, in ledger order.
	async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<RawLog>, EndpointError>;

	/// Receipt of `hash`, or `None` while the transaction is not yet included.
	async fn get_receipt(
		&self,
		hash: &TransactionHash,
	) -> Result<Option<TransactionReceipt>, EndpointError>;

	async fn get_block_number(&self) -> Result<u64, EndpointError>;

	/// Executes a view call against `to` and returns the raw return data.
	async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, EndpointError>;

	/// Native balance of `address` in wei.
	async fn get_balance(&self, address: Address) -> Result<U256, EndpointError>;
}

/// Builds an endpoint from its TOML table and the target network.
pub type EndpointFactory =
	fn(&toml::Value, &NetworkConfig) -> Result<Box<dyn EndpointInterface>, EndpointError>;

pub trait EndpointRegistry: ImplementationRegistry<Factory = EndpointFactory> {}

/// Every endpoint implementation as (name, factory).
pub fn get_all_implementations() -> Vec<(&'static str, EndpointFactory)> {
	use implementations::{alloy, mock};

	vec![
		(alloy::Registry::NAME, alloy::Registry::factory()),
		(mock::Registry::NAME, mock::Registry::factory()),
	]
}

/// Builds the endpoint named `name`.
pub fn create_endpoint(
	name: &str,
	config: &toml::Value,
	network: &NetworkConfig,
) -> Result<Box<dyn EndpointInterface>, EndpointError> {
	let (_, factory) = get_all_implementations()
		.into_iter()
		.find(|(implementation, _)| *implementation == name)
		.ok_or_else(|| {
			EndpointError::Configuration(format!("Unknown endpoint implementation '{}'", name))
		})?;
	factory(config, network)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_create_known_and_unknown() {
		let network = NetworkConfig::flow_testnet();
		let empty = toml::Value::Table(toml::map::Map::new());

		assert!(create_endpoint("mock", &empty, &network).is_ok());
		assert!(matches!(
			create_endpoint("websocket", &empty, &network),
			Err(EndpointError::Configuration(_))
		));
	}
}
