//! Main entry point for the dice casino client.
//!
//! A thin command-line front end over the casino engine: it loads the
//! configuration, builds the engine with the configured wallet and the chain
//! endpoint, and runs one command against it.

use casino_config::Config;
use casino_core::CasinoBuilder;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

/// Command-line arguments for the casino client.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Connect and show the wallet session and bet limits
	Status,
	/// Show the resolved games of the connected account, newest first
	History,
	/// Show win/loss statistics of the connected account
	Stats,
	/// Place a dice wager and wait for its outcome
	Roll {
		/// Face of the die to bet on (1-6)
		#[arg(short, long)]
		guess: u8,
		/// Bet in native currency, e.g. 0.05
		#[arg(short, long)]
		amount: String,
	},
	/// Stream session, wager and history events until Ctrl+C
	Watch,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
	fmt()
		.with_env_filter(env_filter)
		.with_target(true)
		.with_writer(std::io::stderr)
		.init();

	let config_path = args
		.config
		.to_str()
		.ok_or("Configuration path is not valid UTF-8")?;
	let config = Config::from_file(config_path).await?;
	tracing::info!(client = %config.client.id, network = %config.network.name, "Loaded configuration");

	let engine = CasinoBuilder::new(config).build()?;

	match args.command {
		Command::Status => commands::status(&engine).await?,
		Command::History => commands::history(&engine).await?,
		Command::Stats => commands::stats(&engine).await?,
		Command::Roll { guess, amount } => commands::roll(&engine, guess, &amount).await?,
		Command::Watch => commands::watch(&engine).await?,
	}

	Ok(())
}
