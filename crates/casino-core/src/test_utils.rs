//! Helpers for scripting a ledger in tests.

use casino_config::Config;
use casino_decoder::{encode_dice_rolled, encode_game_started};
use casino_endpoint::implementations::mock::MockEndpoint;
use casino_types::{
	Address, GameResolved, GameStarted, RawLog, TransactionHash, TransactionReceipt, B256,
	U256,
};

pub const CASINO: Address = Address::new([0xca; 20]);
pub const PLAYER: Address = Address::new([0xaa; 20]);

pub fn ether(amount: &str) -> U256 {
	alloy_primitives::utils::parse_ether(amount).unwrap()
}

pub fn config() -> Config {
	format!(
		r#"
[client]
id = "dice-test"
confirmation_timeout_seconds = 30
poll_interval_ms = 100

[network]
chain_id = 545
rpc_url = "http://127.0.0.1:8545"
casino_address = "{CASINO}"
log_chunk_size = 0

[wallet]
primary = "mock"
[wallet.implementations.mock]
address = "{PLAYER}"
"#
	)
	.parse()
	.unwrap()
}

pub fn started_event(game_id: u64, player: Address, bet: &str, block: u64) -> GameStarted {
	GameStarted {
		game_id: U256::from(game_id),
		player,
		game_type: 1,
		bet_amount: ether(bet),
		timestamp: 1_700_000_000 + block,
		block_number: Some(block),
	}
}

pub fn resolved_event(
	game_id: u64,
	player: Address,
	guess: u8,
	result: u8,
	payout: &str,
	block: u64,
) -> GameResolved {
	let payout = ether(payout);
	GameResolved {
		game_id: U256::from(game_id),
		player,
		guess,
		result,
		won: payout > U256::ZERO,
		payout,
		block_number: Some(block),
	}
}

/// Receipt of a successful roll that opened and settled `game_id`.
pub fn roll_receipt(
	hash: TransactionHash,
	started: &GameStarted,
	resolved: &GameResolved,
) -> TransactionReceipt {
	let block = resolved.block_number.unwrap_or_default();
	TransactionReceipt {
		hash,
		block_number: block,
		success: true,
		logs: vec![
			encode_game_started(CASINO, started),
			encode_dice_rolled(CASINO, resolved),
		],
	}
}

/// Sequential hash the mock wallet assigns to its `n`-th transaction.
pub fn mock_hash(n: u64) -> TransactionHash {
	TransactionHash(B256::from(U256::from(n)))
}

/// Writes casino events into a mock endpoint.
pub struct Ledger<'a> {
	endpoint: &'a MockEndpoint,
}

impl<'a> Ledger<'a> {
	pub fn new(endpoint: &'a MockEndpoint) -> Self {
		Self { endpoint }
	}

	pub async fn started(&self, game_id: u64, player: Address, bet: &str, block: u64) {
		self.started_with_type(game_id, player, bet, 1, block)
			.await;
	}

	pub async fn started_with_type(
		&self,
		game_id: u64,
		player: Address,
		bet: &str,
		game_type: u8,
		block: u64,
	) {
		let mut event = started_event(game_id, player, bet, block);
		event.game_type = game_type;
		self.endpoint
			.push_log(encode_game_started(CASINO, &event))
			.await;
	}

	pub async fn resolved(
		&self,
		game_id: u64,
		player: Address,
		guess: u8,
		result: u8,
		payout: &str,
		block: u64,
	) {
		let event = resolved_event(game_id, player, guess, result, payout, block);
		self.endpoint
			.push_log(encode_dice_rolled(CASINO, &event))
			.await;
	}

	/// A `GameStarted` log emitted by some other contract.
	pub async fn foreign_started(&self, game_id: u64, player: Address, block: u64) {
		let event = started_event(game_id, player, "0.01", block);
		let log: RawLog = encode_game_started(Address::new([0xee; 20]), &event);
		self.endpoint.push_log(log).await;
	}
}
