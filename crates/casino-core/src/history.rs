//! History reconstruction from ledger logs.
//!
//! The ledger is the only source of truth. A rebuild queries every
//! `GameStarted` and `DiceRolled` log of one player, joins them by game id
//! and folds the result into a fresh [`History`] and [`PlayerAggregate`].
//! Nothing is merged into earlier results, so running a rebuild twice over
//! the same ledger yields identical values.

use backoff::ExponentialBackoffBuilder;
use casino_decoder::{dice_rolled_signature, game_started_signature, EventDecoder};
use casino_endpoint::{EndpointError, EndpointInterface};
use casino_types::{
	short_address, truncate_id, Address, DomainEvent, GameFact, GameResolved, GameStarted,
	History, LogFilter, NetworkConfig, PlayerAggregate, RawLog, B256, U256,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::instrument;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HistoryError {
	#[error("Endpoint unavailable: {0}")]
	EndpointUnavailable(String),
}

impl From<EndpointError> for HistoryError {
	fn from(e: EndpointError) -> Self {
		Self::EndpointUnavailable(e.to_string())
	}
}

/// Rebuilds a player's history from the ledger.
pub struct HistoryReconstructor {
	endpoint: Arc<dyn EndpointInterface>,
	decoder: EventDecoder,
	start_block: u64,
	/// Maximum block span per log query, 0 for a single query.
	chunk_size: u64,
	/// Total retry budget on endpoint failures; `None` fails fast.
	retry_max_elapsed: Option<Duration>,
}

impl HistoryReconstructor {
	pub fn new(endpoint: Arc<dyn EndpointInterface>, network: &NetworkConfig) -> Self {
		Self {
			endpoint,
			decoder: EventDecoder::new(network.casino_address),
			start_block: network.start_block,
			chunk_size: network.log_chunk_size,
			retry_max_elapsed: None,
		}
	}

	/// Retries failed rebuilds with exponential backoff for up to
	/// `max_elapsed`. A zero duration disables retries.
	pub fn with_retry(mut self, max_elapsed: Duration) -> Self {
		self.retry_max_elapsed = (!max_elapsed.is_zero()).then_some(max_elapsed);
		self
	}

	/// Rebuilds the history of `address`, tagging it with `chain_id`.
	#[instrument(skip_all, fields(address = %short_address(&address), chain_id = chain_id))]
	pub async fn rebuild(
		&self,
		address: Address,
		chain_id: u64,
	) -> Result<(History, PlayerAggregate), HistoryError> {
		let facts = match self.retry_max_elapsed {
			None => self.collect_facts(address).await?,
			Some(max_elapsed) => {
				let policy = ExponentialBackoffBuilder::new()
					.with_initial_interval(Duration::from_millis(500))
					.with_max_interval(Duration::from_secs(10))
					.with_max_elapsed_time(Some(max_elapsed))
					.build();
				backoff::future::retry_notify(
					policy,
					|| async move {
						self.collect_facts(address)
							.await
							.map_err(backoff::Error::transient)
					},
					|e: HistoryError, wait: Duration| {
						tracing::warn!(
							error = %e,
							retry_in_ms = wait.as_millis() as u64,
							"Rebuild failed, retrying"
						);
					},
				)
				.await?
			},
		};

		let history = History::new(address, chain_id, facts);
		let aggregate = history.aggregate();
		tracing::info!(
			games = aggregate.games_played,
			won = aggregate.games_won,
			"History rebuilt"
		);
		Ok((history, aggregate))
	}

	async fn collect_facts(&self, player: Address) -> Result<Vec<GameFact>, HistoryError> {
		let head = self.endpoint.get_block_number().await?;
		let started = self
			.fetch_logs(game_started_signature(), player, head)
			.await?;
		let resolved = self
			.fetch_logs(dice_rolled_signature(), player, head)
			.await?;
		Ok(self.join(player, &started, &resolved))
	}

	/// Queries logs of one event for `player` from the start block to `head`,
	/// split into spans of at most `chunk_size` blocks.
	async fn fetch_logs(
		&self,
		signature: B256,
		player: Address,
		head: u64,
	) -> Result<Vec<RawLog>, HistoryError> {
		let mut logs = Vec::new();
		let mut from = self.start_block;
		while from <= head {
			let to = match self.chunk_size {
				0 => head,
				size => from.saturating_add(size - 1).min(head),
			};
			let filter = LogFilter::new(self.decoder.casino(), signature)
				.player(player)
				.from_block(from)
				.to_block(to);
			logs.extend(self.endpoint.get_logs(&filter).await?);
			tracing::debug!(from, to, total = logs.len(), "Fetched log range");
			match to.checked_add(1) {
				Some(next) => from = next,
				None => break,
			}
		}
		Ok(logs)
	}

	fn join(&self, player: Address, started: &[RawLog], resolved: &[RawLog]) -> Vec<GameFact> {
		let mut bets: HashMap<U256, GameStarted> = HashMap::new();
		for event in self.decoder.decode_all(started) {
			if let DomainEvent::GameStarted(started) = event {
				if started.player == player {
					bets.insert(started.game_id, started);
				}
			}
		}

		let mut seen = HashSet::new();
		let mut facts = Vec::new();
		for event in self.decoder.decode_all(resolved) {
			let DomainEvent::DiceRolled(resolved) = event else {
				continue;
			};
			if resolved.player != player || !seen.insert(resolved.game_id) {
				continue;
			}
			match bets.get(&resolved.game_id).and_then(|s| GameFact::join(s, &resolved)) {
				Some(fact) => facts.push(fact),
				None => warn_unjoinable(&resolved),
			}
		}
		facts
	}
}

fn warn_unjoinable(resolved: &GameResolved) {
	tracing::warn!(
		game_id = %truncate_id(&resolved.game_id.to_string()),
		block = ?resolved.block_number,
		"Dropping resolved game without a started event"
	);
}
