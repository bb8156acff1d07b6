//! Network configuration for the chain the casino is deployed on.
//!
//! The client targets exactly one chain. Everything it needs to reach that
//! chain and its casino contract lives in [`NetworkConfig`].

use alloy_primitives::{address, Address};
use serde::{Deserialize, Serialize};

/// Chain id of the Flow EVM testnet.
pub const FLOW_TESTNET_CHAIN_ID: u64 = 545;

/// Configuration of the single target network.
///
/// # Fields
///
/// * `chain_id` - Chain the casino contract lives on
/// * `name` - Human readable network name
/// * `rpc_url` - HTTP(S) JSON-RPC endpoint used for reads
/// * `casino_address` - Address of the deployed casino contract
/// * `native_symbol` - Symbol of the native currency, e.g. "FLOW"
/// * `native_decimals` - Decimals of the native currency
/// * `start_block` - First block searched when rebuilding history
/// * `log_chunk_size` - Maximum block span per log query, 0 for unbounded
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NetworkConfig {
	pub chain_id: u64,
	#[serde(default = "default_network_name")]
	pub name: String,
	pub rpc_url: String,
	pub casino_address: Address,
	#[serde(default = "default_native_symbol")]
	pub native_symbol: String,
	#[serde(default = "default_native_decimals")]
	pub native_decimals: u8,
	#[serde(default)]
	pub start_block: u64,
	#[serde(default = "default_log_chunk_size")]
	pub log_chunk_size: u64,
}

impl NetworkConfig {
	/// The Flow EVM testnet deployment.
	pub fn flow_testnet() -> Self {
		Self {
			chain_id: FLOW_TESTNET_CHAIN_ID,
			name: default_network_name(),
			rpc_url: "https://testnet.evm.nodes.onflow.org".to_string(),
			casino_address: address!("3C40F3B7488a80D6Cf06697f4537Fb73D3B8d27F"),
			native_symbol: default_native_symbol(),
			native_decimals: default_native_decimals(),
			start_block: 0,
			log_chunk_size: default_log_chunk_size(),
		}
	}
}

fn default_network_name() -> String {
	"Flow EVM Testnet".to_string()
}

fn default_native_symbol() -> String {
	"FLOW".to_string()
}

fn default_native_decimals() -> u8 {
	18
}

fn default_log_chunk_size() -> u64 {
	10_000
}
