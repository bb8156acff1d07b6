//! In-memory endpoint for tests and dry runs.
//!
//! Holds a scripted ledger: logs, receipts, view-call responses keyed by
//! selector, and balances. Queries are answered from that state and can be
//! made to fail on demand.

use crate::{EndpointError, EndpointInterface};
use async_trait::async_trait;
use casino_types::{
	Address, Bytes, ConfigSchema, Field, FieldType, LogFilter, NetworkConfig, RawLog, Schema,
	TransactionHash, TransactionReceipt, ValidationError, U256,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

#[derive(Default)]
struct LedgerState {
	logs: Vec<RawLog>,
	receipts: HashMap<TransactionHash, TransactionReceipt>,
	calls: HashMap<[u8; 4], Bytes>,
	balances: HashMap<Address, U256>,
	block_number: u64,
	/// Number of upcoming queries that fail.
	failures: usize,
}

/// Scriptable endpoint.
#[derive(Default)]
pub struct MockEndpoint {
	state: Mutex<LedgerState>,
	log_queries: AtomicUsize,
	view_calls: AtomicUsize,
}

impl MockEndpoint {
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends a log and raises the head to its block.
	pub async fn push_log(&self, log: RawLog) {
		let mut state = self.state.lock().await;
		if let Some(block) = log.block_number {
			state.block_number = state.block_number.max(block);
		}
		state.logs.push(log);
	}

	/// Stores a receipt and appends its logs to the ledger.
	pub async fn insert_receipt(&self, receipt: TransactionReceipt) {
		let mut state = self.state.lock().await;
		state.block_number = state.block_number.max(receipt.block_number);
		if receipt.success {
			state.logs.extend(receipt.logs.iter().cloned());
		}
		state.receipts.insert(receipt.hash, receipt);
	}

	/// Answers view calls whose calldata starts with `selector`.
	pub async fn set_call_response(&self, selector: [u8; 4], response: Bytes) {
		self.state.lock().await.calls.insert(selector, response);
	}

	pub async fn set_balance(&self, address: Address, balance: U256) {
		self.state.lock().await.balances.insert(address, balance);
	}

	pub async fn set_block_number(&self, block: u64) {
		self.state.lock().await.block_number = block;
	}

	/// Makes the next `count` queries fail with `Unavailable`.
	pub async fn fail_next(&self, count: usize) {
		self.state.lock().await.failures = count;
	}

	/// Number of `get_logs` calls served so far.
	pub fn log_queries(&self) -> usize {
		self.log_queries.load(Ordering::SeqCst)
	}

	/// Number of `call` invocations served so far.
	pub fn view_calls(&self) -> usize {
		self.view_calls.load(Ordering::SeqCst)
	}

	fn take_failure(state: &mut LedgerState, what: &str) -> Result<(), EndpointError> {
		if state.failures > 0 {
			state.failures -= 1;
			return Err(EndpointError::Unavailable(format!("{} failed", what)));
		}
		Ok(())
	}
}

pub struct MockEndpointSchema;

impl ConfigSchema for MockEndpointSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(
			vec![],
			vec![Field::new(
				"block_number",
				FieldType::Integer {
					min: Some(0),
					max: None,
				},
			)],
		)
		.validate(config)
	}
}

#[async_trait]
impl EndpointInterface for MockEndpoint {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MockEndpointSchema)
	}

	async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<RawLog>, EndpointError> {
		self.log_queries.fetch_add(1, Ordering::SeqCst);
		let mut state = self.state.lock().await;
		Self::take_failure(&mut state, "get_logs")?;
		Ok(state
			.logs
			.iter()
			.filter(|log| filter.matches(log))
			.cloned()
			.collect())
	}

	async fn get_receipt(
		&self,
		hash: &TransactionHash,
	) -> Result<Option<TransactionReceipt>, EndpointError> {
		let mut state = self.state.lock().await;
		Self::take_failure(&mut state, "get_receipt")?;
		Ok(state.receipts.get(hash).cloned())
	}

	async fn get_block_number(&self) -> Result<u64, EndpointError> {
		let mut state = self.state.lock().await;
		Self::take_failure(&mut state, "get_block_number")?;
		Ok(state.block_number)
	}

	async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, EndpointError> {
		self.view_calls.fetch_add(1, Ordering::SeqCst);
		let mut state = self.state.lock().await;
		Self::take_failure(&mut state, "call")?;
		let selector: [u8; 4] = data
			.get(..4)
			.and_then(|s| s.try_into().ok())
			.ok_or_else(|| EndpointError::Unavailable("Calldata shorter than a selector".into()))?;
		state
			.calls
			.get(&selector)
			.cloned()
			.ok_or_else(|| EndpointError::Unavailable(format!("Call to {} reverted", to)))
	}

	async fn get_balance(&self, address: Address) -> Result<U256, EndpointError> {
		let mut state = self.state.lock().await;
		Self::take_failure(&mut state, "get_balance")?;
		Ok(state.balances.get(&address).copied().unwrap_or_default())
	}
}

/// Factory for the mock endpoint. `block_number` seeds the head.
pub fn create_mock_endpoint(
	config: &toml::Value,
	_network: &NetworkConfig,
) -> Result<Box<dyn EndpointInterface>, EndpointError> {
	MockEndpointSchema
		.validate(config)
		.map_err(|e| EndpointError::Configuration(e.to_string()))?;

	let block_number = config
		.get("block_number")
		.and_then(|v| v.as_integer())
		.unwrap_or(0) as u64;

	Ok(Box::new(MockEndpoint {
		state: Mutex::new(LedgerState {
			block_number,
			..LedgerState::default()
		}),
		..MockEndpoint::default()
	}))
}

pub struct Registry;

impl casino_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "mock";
	type Factory = crate::EndpointFactory;

	fn factory() -> Self::Factory {
		create_mock_endpoint
	}
}

impl crate::EndpointRegistry for Registry {}
