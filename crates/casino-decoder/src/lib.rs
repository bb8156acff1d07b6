//! Event decoding for the casino contract.
//!
//! Turns raw logs into typed [`DomainEvent`]s and builds or reads the ABI
//! payloads of the contract calls the client makes. Logs from other contracts
//! or with unknown signatures are [`DecodeError::NotOurEvent`]; logs with our
//! signature and a payload that does not decode are
//! [`DecodeError::Malformed`]. Neither is fatal to callers.

use alloy_primitives::{Log as PrimLog, LogData};
use alloy_sol_types::{sol, SolCall, SolEvent};
use casino_types::{
	Address, Bytes, DomainEvent, GameResolved, GameStarted, RawLog, B256, MAX_GUESS, MIN_GUESS,
	U256,
};
use thiserror::Error;

pub mod abi {
	//! Solidity definitions of the casino contract surface the client uses.

	use super::sol;

	sol! {
		/// Emitted when a bet is accepted, for every game type.
		event GameStarted(
			uint256 indexed gameId,
			address indexed player,
			uint8 gameType,
			uint256 betAmount,
			uint256 timestamp
		);

		/// Emitted when a dice round is settled.
		event DiceRolled(
			uint256 indexed gameId,
			address indexed player,
			uint8 guess,
			uint8 result,
			bool win,
			uint256 payout
		);

		function rollDice(uint8 guess) external payable returns (uint256);
		function minBet() external view returns (uint256);
		function maxBet() external view returns (uint256);
	}
}

/// Errors from decoding logs or call results.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
	#[error("Not a casino event")]
	NotOurEvent,
	#[error("Malformed event: {0}")]
	Malformed(String),
}

/// topic0 of `GameStarted`.
pub fn game_started_signature() -> B256 {
	abi::GameStarted::SIGNATURE_HASH
}

/// topic0 of `DiceRolled`.
pub fn dice_rolled_signature() -> B256 {
	abi::DiceRolled::SIGNATURE_HASH
}

/// Decoder bound to one deployed casino contract.
#[derive(Debug, Clone, Copy)]
pub struct EventDecoder {
	casino: Address,
}

impl EventDecoder {
	pub fn new(casino: Address) -> Self {
		Self { casino }
	}

	pub fn casino(&self) -> Address {
		self.casino
	}

	/// Decodes one log into a domain event.
	pub fn decode(&self, log: &RawLog) -> Result<DomainEvent, DecodeError> {
		if log.address != self.casino {
			return Err(DecodeError::NotOurEvent);
		}
		let signature = log.signature().ok_or(DecodeError::NotOurEvent)?;

		let prim_log = PrimLog {
			address: log.address,
			data: LogData::new_unchecked(log.topics.clone(), log.data.clone()),
		};

		if signature == abi::GameStarted::SIGNATURE_HASH {
			let event = abi::GameStarted::decode_log(&prim_log, true)
				.map_err(|e| DecodeError::Malformed(format!("GameStarted: {}", e)))?;
			Ok(DomainEvent::GameStarted(GameStarted {
				game_id: event.gameId,
				player: event.player,
				game_type: event.gameType,
				bet_amount: event.betAmount,
				timestamp: event.timestamp.saturating_to::<u64>(),
				block_number: log.block_number,
			}))
		} else if signature == abi::DiceRolled::SIGNATURE_HASH {
			let event = abi::DiceRolled::decode_log(&prim_log, true)
				.map_err(|e| DecodeError::Malformed(format!("DiceRolled: {}", e)))?;
			let resolved = GameResolved {
				game_id: event.gameId,
				player: event.player,
				guess: event.guess,
				result: event.result,
				won: event.win,
				payout: event.payout,
				block_number: log.block_number,
			};
			warn_unusual_resolution(&resolved);
			Ok(DomainEvent::DiceRolled(resolved))
		} else {
			Err(DecodeError::NotOurEvent)
		}
	}

	/// Decodes every log it can, skipping foreign and malformed ones.
	pub fn decode_all<'a>(&self, logs: impl IntoIterator<Item = &'a RawLog>) -> Vec<DomainEvent> {
		logs.into_iter()
			.filter_map(|log| match self.decode(log) {
				Ok(event) => Some(event),
				Err(DecodeError::NotOurEvent) => {
					tracing::trace!(address = %log.address, "Skipping foreign log");
					None
				},
				Err(e) => {
					tracing::warn!(error = %e, block = ?log.block_number, "Skipping malformed log");
					None
				},
			})
			.collect()
	}
}

/// The ledger's word is final; odd resolutions are kept and only logged.
fn warn_unusual_resolution(resolved: &GameResolved) {
	let faces = MIN_GUESS..=MAX_GUESS;
	if !faces.contains(&resolved.guess) || !faces.contains(&resolved.result) {
		tracing::warn!(
			game_id = %resolved.game_id,
			guess = resolved.guess,
			result = resolved.result,
			"DiceRolled face out of range"
		);
	}
	if resolved.won != (resolved.payout > U256::ZERO) {
		tracing::warn!(
			game_id = %resolved.game_id,
			won = resolved.won,
			payout = %resolved.payout,
			"DiceRolled win flag disagrees with payout"
		);
	}
}

/// Calldata for `rollDice(guess)`.
pub fn encode_roll_dice(guess: u8) -> Bytes {
	abi::rollDiceCall { guess }.abi_encode().into()
}

/// Calldata for `minBet()`.
pub fn encode_min_bet() -> Bytes {
	abi::minBetCall {}.abi_encode().into()
}

/// Calldata for `maxBet()`.
pub fn encode_max_bet() -> Bytes {
	abi::maxBetCall {}.abi_encode().into()
}

/// Reads the return value of `minBet()` or `maxBet()`.
pub fn decode_bet_limit(data: &[u8]) -> Result<U256, DecodeError> {
	abi::minBetCall::abi_decode_returns(data, true)
		.map(|ret| ret._0)
		.map_err(|e| DecodeError::Malformed(format!("bet limit: {}", e)))
}

/// Builds the log the contract emits for an accepted bet.
pub fn encode_game_started(casino: Address, event: &GameStarted) -> RawLog {
	let data = abi::GameStarted {
		gameId: event.game_id,
		player: event.player,
		gameType: event.game_type,
		betAmount: event.bet_amount,
		timestamp: U256::from(event.timestamp),
	}
	.encode_log_data();
	to_raw_log(casino, data, event.block_number)
}

/// Builds the log the contract emits for a settled dice round.
pub fn encode_dice_rolled(casino: Address, event: &GameResolved) -> RawLog {
	let data = abi::DiceRolled {
		gameId: event.game_id,
		player: event.player,
		guess: event.guess,
		result: event.result,
		win: event.won,
		payout: event.payout,
	}
	.encode_log_data();
	to_raw_log(casino, data, event.block_number)
}

fn to_raw_log(casino: Address, data: LogData, block_number: Option<u64>) -> RawLog {
	RawLog {
		address: casino,
		topics: data.topics().to_vec(),
		data: data.data,
		block_number,
		transaction_hash: None,
		log_index: None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::address;

	const CASINO: Address = address!("3C40F3B7488a80D6Cf06697f4537Fb73D3B8d27F");
	const PLAYER: Address = address!("00000000000000000000000000000000000000aa");

	fn started() -> GameStarted {
		GameStarted {
			game_id: U256::from(42),
			player: PLAYER,
			game_type: 1,
			bet_amount: U256::from(10_000_000_000_000_000u64),
			timestamp: 1_700_000_000,
			block_number: Some(100),
		}
	}

	fn resolved(won: bool) -> GameResolved {
		GameResolved {
			game_id: U256::from(42),
			player: PLAYER,
			guess: 4,
			result: if won { 4 } else { 2 },
			won,
			payout: if won {
				U256::from(58_000_000_000_000_000u64)
			} else {
				U256::ZERO
			},
			block_number: Some(101),
		}
	}

	#[test]
	fn test_decodes_game_started() {
		let decoder = EventDecoder::new(CASINO);
		let log = encode_game_started(CASINO, &started());

		assert_eq!(log.topics[0], game_started_signature());
		assert_eq!(log.topics[2], PLAYER.into_word());
		assert_eq!(
			decoder.decode(&log).unwrap(),
			DomainEvent::GameStarted(started())
		);
	}

	#[test]
	fn test_decodes_dice_rolled_with_exact_payout() {
		let decoder = EventDecoder::new(CASINO);
		let log = encode_dice_rolled(CASINO, &resolved(true));

		match decoder.decode(&log).unwrap() {
			DomainEvent::DiceRolled(event) => {
				assert!(event.won);
				assert_eq!(event.payout, U256::from(58_000_000_000_000_000u64));
				assert_eq!(event.block_number, Some(101));
			},
			other => panic!("unexpected event {:?}", other),
		}
	}

	#[test]
	fn test_foreign_logs_are_not_ours() {
		let decoder = EventDecoder::new(CASINO);

		let foreign_contract = encode_dice_rolled(Address::repeat_byte(0x01), &resolved(false));
		assert_eq!(decoder.decode(&foreign_contract), Err(DecodeError::NotOurEvent));

		let mut unknown_topic = encode_dice_rolled(CASINO, &resolved(false));
		unknown_topic.topics[0] = B256::repeat_byte(0x99);
		assert_eq!(decoder.decode(&unknown_topic), Err(DecodeError::NotOurEvent));

		let mut no_topics = unknown_topic.clone();
		no_topics.topics.clear();
		assert_eq!(decoder.decode(&no_topics), Err(DecodeError::NotOurEvent));
	}

	#[test]
	fn test_truncated_payload_is_malformed() {
		let decoder = EventDecoder::new(CASINO);
		let mut log = encode_dice_rolled(CASINO, &resolved(true));
		log.data = Bytes::from(log.data[..31].to_vec());

		assert!(matches!(decoder.decode(&log), Err(DecodeError::Malformed(_))));
	}

	#[test]
	fn test_unusual_resolution_is_kept() {
		let decoder = EventDecoder::new(CASINO);
		let mut event = resolved(false);
		event.payout = U256::from(1);
		event.result = 9;
		let log = encode_dice_rolled(CASINO, &event);

		assert_eq!(decoder.decode(&log), Ok(DomainEvent::DiceRolled(event)));
	}

	#[test]
	fn test_decode_all_keeps_only_casino_events() {
		let decoder = EventDecoder::new(CASINO);
		let logs = vec![
			encode_game_started(CASINO, &started()),
			encode_game_started(Address::repeat_byte(0x02), &started()),
			encode_dice_rolled(CASINO, &resolved(true)),
		];

		assert_eq!(decoder.decode_all(&logs).len(), 2);
	}

	#[test]
	fn test_call_payloads() {
		let calldata = encode_roll_dice(3);
		assert_eq!(&calldata[..4], abi::rollDiceCall::SELECTOR.as_slice());
		assert_eq!(calldata.len(), 36);
		assert_eq!(calldata[35], 3);

		assert_eq!(&encode_min_bet()[..], abi::minBetCall::SELECTOR.as_slice());
		assert_eq!(&encode_max_bet()[..], abi::maxBetCall::SELECTOR.as_slice());

		let limit = U256::from(100_000_000_000_000_000u64);
		let encoded = limit.to_be_bytes::<32>();
		assert_eq!(decode_bet_limit(&encoded).unwrap(), limit);
		assert!(decode_bet_limit(&encoded[..8]).is_err());
	}
}
