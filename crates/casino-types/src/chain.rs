//! Raw chain data as seen by the endpoint adapter.
//!
//! These types are deliberately free of any RPC client so the decoder and the
//! reconstructor can be exercised against in-memory logs.

use crate::TransactionHash;
use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

/// An event log emitted by a contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLog {
	pub address: Address,
	/// topic0 is the event signature hash.
	pub topics: Vec<B256>,
	pub data: Bytes,
	/// None while the log is pending.
	pub block_number: Option<u64>,
	pub transaction_hash: Option<TransactionHash>,
	pub log_index: Option<u64>,
}

impl RawLog {
	pub fn signature(&self) -> Option<B256> {
		self.topics.first().copied()
	}
}

/// Query over logs of one contract and one event signature.
///
/// `game_id` filters topic1 and `player` filters topic2, matching the layout
/// of the casino events where both are indexed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LogFilter {
	pub address: Address,
	pub event_signature: B256,
	pub game_id: Option<U256>,
	pub player: Option<Address>,
	pub from_block: u64,
	/// None means up to the latest block.
	pub to_block: Option<u64>,
}

impl LogFilter {
	pub fn new(address: Address, event_signature: B256) -> Self {
		Self {
			address,
			event_signature,
			..Self::default()
		}
	}

	pub fn game_id(mut self, game_id: U256) -> Self {
		self.game_id = Some(game_id);
		self
	}

	pub fn player(mut self, player: Address) -> Self {
		self.player = Some(player);
		self
	}

	pub fn from_block(mut self, block: u64) -> Self {
		self.from_block = block;
		self
	}

	pub fn to_block(mut self, block: u64) -> Self {
		self.to_block = Some(block);
		self
	}

	/// Whether `log` satisfies every constraint of this filter.
	pub fn matches(&self, log: &RawLog) -> bool {
		if log.address != self.address || log.signature() != Some(self.event_signature) {
			return false;
		}
		if let Some(game_id) = self.game_id {
			if log.topics.get(1) != Some(&B256::from(game_id)) {
				return false;
			}
		}
		if let Some(player) = self.player {
			if log.topics.get(2) != Some(&player.into_word()) {
				return false;
			}
		}
		match log.block_number {
			Some(block) => {
				block >= self.from_block && self.to_block.is_none_or(|to| block <= to)
			},
			None => false,
		}
	}
}

/// Receipt of an included transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
	pub hash: TransactionHash,
	pub block_number: u64,
	pub success: bool,
	pub logs: Vec<RawLog>,
}
