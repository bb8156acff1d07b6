//! JSON-RPC endpoint backed by an alloy HTTP provider.

use crate::{EndpointError, EndpointInterface};
use alloy_provider::{Provider, RootProvider};
use alloy_rpc_types::{BlockNumberOrTag, Filter, Log, TransactionRequest};
use alloy_transport_http::Http;
use async_trait::async_trait;
use casino_types::{
	Address, Bytes, ConfigSchema, Field, FieldType, LogFilter, NetworkConfig, RawLog, Schema,
	TransactionHash, TransactionReceipt, ValidationError, B256, U256,
};

/// Endpoint talking to one JSON-RPC node over HTTP.
pub struct AlloyEndpoint {
	provider: RootProvider<Http<reqwest::Client>>,
	chain_id: u64,
}

impl AlloyEndpoint {
	pub fn new(rpc_url: &str, chain_id: u64) -> Result<Self, EndpointError> {
		let url = rpc_url
			.parse()
			.map_err(|e| EndpointError::Configuration(format!("Invalid RPC URL: {}", e)))?;
		Ok(Self {
			provider: RootProvider::new_http(url),
			chain_id,
		})
	}

	fn to_filter(filter: &LogFilter) -> Filter {
		let mut rpc_filter = Filter::new()
			.address(filter.address)
			.event_signature(filter.event_signature)
			.from_block(filter.from_block);
		rpc_filter = match filter.to_block {
			Some(block) => rpc_filter.to_block(block),
			None => rpc_filter.to_block(BlockNumberOrTag::Latest),
		};
		if let Some(game_id) = filter.game_id {
			rpc_filter = rpc_filter.topic1(B256::from(game_id));
		}
		if let Some(player) = filter.player {
			rpc_filter = rpc_filter.topic2(player.into_word());
		}
		rpc_filter
	}

	fn to_raw_log(log: &Log) -> RawLog {
		RawLog {
			address: log.address(),
			topics: log.topics().to_vec(),
			data: log.data().data.clone(),
			block_number: log.block_number,
			transaction_hash: log.transaction_hash.map(TransactionHash),
			log_index: log.log_index,
		}
	}
}

/// Configuration schema for the alloy endpoint.
///
/// The table is optional; `rpc_url` overrides the network's URL.
pub struct AlloyEndpointSchema;

impl ConfigSchema for AlloyEndpointSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(vec![], vec![Field::new("rpc_url", FieldType::Url)]).validate(config)
	}
}

#[async_trait]
impl EndpointInterface for AlloyEndpoint {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(AlloyEndpointSchema)
	}

	async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<RawLog>, EndpointError> {
		let logs = self
			.provider
			.get_logs(&Self::to_filter(filter))
			.await
			.map_err(|e| EndpointError::Unavailable(format!("Failed to get logs: {}", e)))?;

		tracing::debug!(
			chain_id = self.chain_id,
			from_block = filter.from_block,
			to_block = ?filter.to_block,
			count = logs.len(),
			"Fetched logs"
		);
		Ok(logs.iter().map(Self::to_raw_log).collect())
	}

	async fn get_receipt(
		&self,
		hash: &TransactionHash,
	) -> Result<Option<TransactionReceipt>, EndpointError> {
		let receipt = self
			.provider
			.get_transaction_receipt(hash.0)
			.await
			.map_err(|e| EndpointError::Unavailable(format!("Failed to get receipt: {}", e)))?;

		Ok(receipt.map(|receipt| TransactionReceipt {
			hash: TransactionHash(receipt.transaction_hash),
			block_number: receipt.block_number.unwrap_or_default(),
			success: receipt.status(),
			logs: receipt.inner.logs().iter().map(Self::to_raw_log).collect(),
		}))
	}

	async fn get_block_number(&self) -> Result<u64, EndpointError> {
		self.provider
			.get_block_number()
			.await
			.map_err(|e| EndpointError::Unavailable(format!("Failed to get block number: {}", e)))
	}

	async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, EndpointError> {
		let request = TransactionRequest::default().to(to).input(data.into());
		self.provider
			.call(&request)
			.await
			.map_err(|e| EndpointError::Unavailable(format!("Call to {} failed: {}", to, e)))
	}

	async fn get_balance(&self, address: Address) -> Result<U256, EndpointError> {
		self.provider
			.get_balance(address)
			.await
			.map_err(|e| EndpointError::Unavailable(format!("Failed to get balance: {}", e)))
	}
}

/// Factory for the alloy endpoint.
pub fn create_alloy_endpoint(
	config: &toml::Value,
	network: &NetworkConfig,
) -> Result<Box<dyn EndpointInterface>, EndpointError> {
	AlloyEndpointSchema
		.validate(config)
		.map_err(|e| EndpointError::Configuration(e.to_string()))?;

	let rpc_url = config
		.get("rpc_url")
		.and_then(|v| v.as_str())
		.unwrap_or(&network.rpc_url);

	Ok(Box::new(AlloyEndpoint::new(rpc_url, network.chain_id)?))
}

pub struct Registry;

impl casino_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "alloy";
	type Factory = crate::EndpointFactory;

	fn factory() -> Self::Factory {
		create_alloy_endpoint
	}
}

impl crate::EndpointRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_filter_carries_player_in_topic2() {
		let network = NetworkConfig::flow_testnet();
		let player = Address::repeat_byte(0xaa);
		let filter = LogFilter::new(network.casino_address, B256::repeat_byte(0x01))
			.player(player)
			.game_id(U256::from(9))
			.from_block(100)
			.to_block(200);

		let rpc_filter = AlloyEndpoint::to_filter(&filter);
		assert!(rpc_filter.topics[2].matches(&player.into_word()));
		assert!(rpc_filter.topics[1].matches(&B256::from(U256::from(9))));
		assert_eq!(rpc_filter.get_from_block(), Some(100));
		assert_eq!(rpc_filter.get_to_block(), Some(200));
	}

	#[test]
	fn test_factory_rejects_bad_url() {
		let network = NetworkConfig::flow_testnet();
		let config: toml::Value = toml::from_str("rpc_url = \"ftp://node\"").unwrap();
		assert!(matches!(
			create_alloy_endpoint(&config, &network),
			Err(EndpointError::Configuration(_))
		));
	}
}
