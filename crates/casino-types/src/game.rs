//! Game facts and the views derived from them.
//!
//! `GameStarted` and `GameResolved` mirror the two ledger events the client
//! cares about. A `GameFact` is the join of both for one game id. `History`
//! and `PlayerAggregate` are pure functions of a set of facts and carry no
//! truth of their own.

use alloy_primitives::{Address, I256, U256};
use serde::{Deserialize, Serialize};

/// A bet accepted by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStarted {
	pub game_id: U256,
	pub player: Address,
	pub game_type: u8,
	pub bet_amount: U256,
	/// Ledger timestamp in unix seconds.
	pub timestamp: u64,
	pub block_number: Option<u64>,
}

/// A dice round settled by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameResolved {
	pub game_id: U256,
	pub player: Address,
	pub guess: u8,
	pub result: u8,
	pub won: bool,
	pub payout: U256,
	pub block_number: Option<u64>,
}

/// A ledger log decoded into a domain fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DomainEvent {
	GameStarted(GameStarted),
	DiceRolled(GameResolved),
}

/// One resolved game, joined from its started and resolved events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameFact {
	pub game_id: U256,
	pub player: Address,
	pub guess: u8,
	pub result: u8,
	pub won: bool,
	pub bet_amount: U256,
	/// Zero when the game was lost.
	pub payout: U256,
	pub timestamp: u64,
	pub block_number: u64,
}

impl GameFact {
	/// Joins a resolution with the bet that opened it.
	///
	/// Returns `None` when the two events describe different games or
	/// different players.
	pub fn join(started: &GameStarted, resolved: &GameResolved) -> Option<Self> {
		if started.game_id != resolved.game_id || started.player != resolved.player {
			return None;
		}
		Some(Self {
			game_id: resolved.game_id,
			player: resolved.player,
			guess: resolved.guess,
			result: resolved.result,
			won: resolved.won,
			bet_amount: started.bet_amount,
			payout: resolved.payout,
			timestamp: started.timestamp,
			block_number: resolved
				.block_number
				.or(started.block_number)
				.unwrap_or_default(),
		})
	}
}

/// Counters over one address's facts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlayerAggregate {
	pub games_played: u64,
	pub games_won: u64,
	pub games_lost: u64,
	/// Sum of bets in wei.
	pub total_wagered: U256,
	/// Sum of payouts over won games in wei.
	pub total_won: U256,
}

impl PlayerAggregate {
	/// Folds facts into a fresh aggregate.
	pub fn from_facts<'a>(facts: impl IntoIterator<Item = &'a GameFact>) -> Self {
		facts.into_iter().fold(Self::default(), |mut aggregate, fact| {
			aggregate.record(fact);
			aggregate
		})
	}

	/// Adds one fact to the counters.
	pub fn record(&mut self, fact: &GameFact) {
		self.games_played += 1;
		self.total_wagered = self.total_wagered.saturating_add(fact.bet_amount);
		if fact.won {
			self.games_won += 1;
			self.total_won = self.total_won.saturating_add(fact.payout);
		} else {
			self.games_lost += 1;
		}
	}

	/// Percentage of games won, for display.
	pub fn win_rate(&self) -> f64 {
		if self.games_played == 0 {
			return 0.0;
		}
		self.games_won as f64 / self.games_played as f64 * 100.0
	}

	/// Total won minus total wagered, in wei.
	pub fn net_result(&self) -> I256 {
		I256::from_raw(self.total_won).saturating_sub(I256::from_raw(self.total_wagered))
	}
}

/// Resolved games of one address, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct History {
	pub address: Option<Address>,
	pub chain_id: Option<u64>,
	pub games: Vec<GameFact>,
}

impl History {
	/// Builds a history for `address`, ordering facts newest first.
	///
	/// Facts are ordered by block number, then game id, both descending.
	pub fn new(address: Address, chain_id: u64, mut games: Vec<GameFact>) -> Self {
		games.sort_by(|a, b| {
			b.block_number
				.cmp(&a.block_number)
				.then_with(|| b.game_id.cmp(&a.game_id))
		});
		Self {
			address: Some(address),
			chain_id: Some(chain_id),
			games,
		}
	}

	pub fn len(&self) -> usize {
		self.games.len()
	}

	pub fn is_empty(&self) -> bool {
		self.games.is_empty()
	}

	pub fn contains(&self, game_id: U256) -> bool {
		self.games.iter().any(|g| g.game_id == game_id)
	}

	/// Aggregate over every fact in the history.
	pub fn aggregate(&self) -> PlayerAggregate {
		PlayerAggregate::from_facts(&self.games)
	}
}

/// Freshness of the derived state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SyncStatus {
	/// Nothing to show (no session).
	#[default]
	Idle,
	/// A rebuild is running; the previous values may be stale.
	Loading,
	/// The values reflect the ledger as of the last rebuild.
	Ready,
	/// The last rebuild failed; the previous values are kept.
	Unavailable(String),
}

/// A consistent view of the derived state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CasinoSnapshot {
	pub history: History,
	pub aggregate: PlayerAggregate,
	pub status: SyncStatus,
	/// Session epoch the values belong to.
	pub epoch: u64,
}

impl CasinoSnapshot {
	/// Empty snapshot for a session without identity.
	pub fn empty(epoch: u64) -> Self {
		Self {
			epoch,
			..Self::default()
		}
	}
}
