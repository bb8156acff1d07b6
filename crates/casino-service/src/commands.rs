//! Command implementations for the CLI.
//!
//! Each command connects the wallet through the engine and prints what it
//! reads from the engine's session and snapshot. Amounts are rendered with
//! the network's native decimals and symbol.

use casino_core::{CasinoEngine, EngineError};
use casino_types::{
	format_native_amount, parse_native_amount, short_address, CasinoEvent, CasinoSnapshot,
	HistoryEvent, NetworkConfig, PlayerAggregate, SessionEvent, SyncStatus, WagerEvent,
	WagerOutcome, I256, QUICK_BETS, U256,
};
use tokio::sync::broadcast::error::RecvError;

type CommandResult = Result<(), Box<dyn std::error::Error>>;

fn amount(value: U256, network: &NetworkConfig) -> String {
	format!(
		"{} {}",
		format_native_amount(value, network.native_decimals),
		network.native_symbol
	)
}

fn signed_amount(value: I256, network: &NetworkConfig) -> String {
	let sign = if value.is_negative() { "-" } else { "+" };
	format!("{}{}", sign, amount(value.unsigned_abs(), network))
}

fn print_sync_status(snapshot: &CasinoSnapshot) {
	match &snapshot.status {
		SyncStatus::Unavailable(reason) => {
			println!("warning: history unavailable ({}), showing last known values", reason)
		},
		SyncStatus::Loading => println!("warning: history is still loading"),
		SyncStatus::Idle | SyncStatus::Ready => {},
	}
}

fn print_aggregate(aggregate: &PlayerAggregate, network: &NetworkConfig) {
	println!("Games played:  {}", aggregate.games_played);
	println!("Games won:     {}", aggregate.games_won);
	println!("Games lost:    {}", aggregate.games_lost);
	println!("Win rate:      {:.1}%", aggregate.win_rate());
	println!("Total wagered: {}", amount(aggregate.total_wagered, network));
	println!("Total won:     {}", amount(aggregate.total_won, network));
	println!(
		"Net result:    {}",
		signed_amount(aggregate.net_result(), network)
	);
}

pub async fn status(engine: &CasinoEngine) -> CommandResult {
	let session = engine.connect().await?;
	let network = engine.network();

	if let Some(address) = session.address() {
		println!("Account:  {} ({})", short_address(&address), address);
	}
	if let Some(chain_id) = session.chain_id() {
		let marker = if chain_id == network.chain_id {
			""
		} else {
			" (wrong network)"
		};
		println!("Chain:    {}{}", chain_id, marker);
	}
	match session.native_balance() {
		Some(balance) => println!("Balance:  {}", amount(balance, network)),
		None => println!("Balance:  unavailable"),
	}

	match engine.bet_limits().await {
		Ok(limits) => println!(
			"Bets:     {} to {}",
			amount(limits.min_bet, network),
			amount(limits.max_bet, network)
		),
		Err(e) => println!("Bets:     unavailable ({})", e),
	}
	println!("Quick:    {}", QUICK_BETS.join(", "));
	Ok(())
}

pub async fn history(engine: &CasinoEngine) -> CommandResult {
	engine.connect().await?;
	let snapshot = engine.snapshot();
	let network = engine.network();
	print_sync_status(&snapshot);

	if snapshot.history.is_empty() {
		println!("No games yet");
		return Ok(());
	}
	println!(
		"{:>8}  {:>5}  {:>6}  {:>6}  {:>20}  {:>20}  {:>10}",
		"game", "guess", "result", "won", "bet", "payout", "block"
	);
	for game in &snapshot.history.games {
		println!(
			"{:>8}  {:>5}  {:>6}  {:>6}  {:>20}  {:>20}  {:>10}",
			game.game_id.to_string(),
			game.guess,
			game.result,
			if game.won { "yes" } else { "no" },
			amount(game.bet_amount, network),
			amount(game.payout, network),
			game.block_number
		);
	}
	Ok(())
}

pub async fn stats(engine: &CasinoEngine) -> CommandResult {
	engine.connect().await?;
	let snapshot = engine.snapshot();
	print_sync_status(&snapshot);
	print_aggregate(&snapshot.aggregate, engine.network());
	Ok(())
}

pub async fn roll(engine: &CasinoEngine, guess: u8, bet: &str) -> CommandResult {
	engine.connect().await?;
	let network = engine.network();
	let bet_amount = parse_native_amount(bet, network.native_decimals)?;

	let pending = engine
		.submit_wager(engine.wager_request(guess, bet_amount))
		.await?;
	println!(
		"Submitted {} on {} ({})",
		amount(bet_amount, network),
		guess,
		pending.transaction_hash
	);

	let settled = match engine.confirm(pending).await {
		Ok(settled) => settled,
		Err(EngineError::Submit(casino_core::SubmitError::ConfirmationTimeout(hash))) => {
			println!(
				"Transaction {} is not confirmed yet; its result will show up in history",
				hash
			);
			return Ok(());
		},
		Err(e) => return Err(e.into()),
	};

	match &settled.outcome {
		WagerOutcome::Won { result, payout, .. } => {
			println!("Rolled {}: you won {}", result, amount(*payout, network))
		},
		WagerOutcome::Lost { result, .. } => println!("Rolled {}: you lost", result),
		WagerOutcome::Unresolved => println!("Confirmed, but the roll result was not found"),
	}

	let snapshot = engine.snapshot();
	print_sync_status(&snapshot);
	print_aggregate(&snapshot.aggregate, network);
	Ok(())
}

pub async fn watch(engine: &CasinoEngine) -> CommandResult {
	let mut events = engine.subscribe();
	let network = engine.network().clone();
	let printer = tokio::spawn(async move {
		loop {
			match events.recv().await {
				Ok(event) => print_event(&event, &network),
				Err(RecvError::Lagged(skipped)) => {
					tracing::warn!(skipped, "Event printer lagged");
				},
				Err(RecvError::Closed) => break,
			}
		}
	});

	engine.connect().await?;
	let result = engine.run().await;
	printer.abort();
	Ok(result?)
}

fn print_event(event: &CasinoEvent, network: &NetworkConfig) {
	match event {
		CasinoEvent::Session(SessionEvent::Changed { session }) => match session.address() {
			Some(address) => println!(
				"session: {} on chain {}",
				short_address(&address),
				session.chain_id().unwrap_or_default()
			),
			None => println!("session: {:?}", session.connection_state()),
		},
		CasinoEvent::Session(SessionEvent::ChainMismatch { expected, actual }) => {
			println!("session: wallet on chain {}, casino on {}", actual, expected)
		},
		CasinoEvent::Wager(WagerEvent::Submitted { transaction }) => {
			println!("wager: submitted {}", transaction.transaction_hash)
		},
		CasinoEvent::Wager(WagerEvent::Confirmed {
			transaction_hash,
			outcome,
			..
		}) => println!(
			"wager: {} confirmed, payout {}",
			transaction_hash,
			amount(outcome.payout(), network)
		),
		CasinoEvent::Wager(WagerEvent::Failed { reason, .. }) => {
			println!("wager: failed ({})", reason)
		},
		CasinoEvent::Wager(WagerEvent::TimedOut { transaction_hash }) => println!(
			"wager: {} not confirmed yet, result pending",
			transaction_hash
		),
		CasinoEvent::History(HistoryEvent::Rebuilt { snapshot }) => println!(
			"history: {} games, net {}",
			snapshot.aggregate.games_played,
			signed_amount(snapshot.aggregate.net_result(), network)
		),
		CasinoEvent::History(HistoryEvent::RebuildFailed { reason, .. }) => {
			println!("history: unavailable ({})", reason)
		},
	}
}
