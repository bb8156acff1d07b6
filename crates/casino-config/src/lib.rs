//! Configuration module for the dice casino client.
//!
//! Loads the client configuration from TOML, resolving `${VAR}` and
//! `${VAR:-default}` references from the environment first, and validates
//! it before anything is built from it.
//!
//! ## Modular Configuration Support
//!
//! A file may pull other files in with `include = ["network.toml"]`. Each
//! top-level section must be defined in exactly one file.

mod loader;

use casino_types::{Address, NetworkConfig};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("Configuration error: {0}")]
	Parse(String),
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep the message, drop the input dump.
		ConfigError::Parse(err.message().to_string())
	}
}

/// Top-level client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	pub client: ClientConfig,
	/// The single network the casino is deployed on.
	pub network: NetworkConfig,
	pub wallet: WalletConfig,
}

/// Behaviour of the client itself.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
	/// Identifier used in logs.
	pub id: String,
	/// Upper bound on waiting for a wager receipt.
	#[serde(default = "default_confirmation_timeout_seconds")]
	pub confirmation_timeout_seconds: u64,
	/// Receipt polling interval.
	#[serde(default = "default_poll_interval_ms")]
	pub poll_interval_ms: u64,
	/// Total time budget for retrying a failed rebuild. 0 disables retries.
	#[serde(default)]
	pub rebuild_retry_max_elapsed_seconds: u64,
}

fn default_confirmation_timeout_seconds() -> u64 {
	300
}

fn default_poll_interval_ms() -> u64 {
	2000
}

/// Wallet provider selection.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WalletConfig {
	/// Which implementation to use.
	pub primary: String,
	/// Implementation name to its raw TOML table.
	pub implementations: HashMap<String, toml::Value>,
}

impl WalletConfig {
	/// Table of the primary implementation.
	pub fn primary_config(&self) -> Option<&toml::Value> {
		self.implementations.get(&self.primary)
	}
}

/// Replaces `${VAR}` and `${VAR:-default}` with environment values.
///
/// Inputs over 1MB are rejected to bound regex work.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut missing = None;
	let resolved = re.replace_all(input, |caps: &regex::Captures<'_>| {
		let var_name = &caps[1];
		match (std::env::var(var_name), caps.get(2)) {
			(Ok(value), _) => value,
			(Err(_), Some(default)) => default.as_str().to_string(),
			(Err(_), None) => {
				missing.get_or_insert_with(|| var_name.to_string());
				String::new()
			},
		}
	});

	match missing {
		Some(var_name) => Err(ConfigError::Validation(format!(
			"Environment variable '{}' not found",
			var_name
		))),
		None => Ok(resolved.into_owned()),
	}
}

impl Config {
	/// Loads configuration from a file, following `include` directives.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path_buf = Path::new(path);
		let base_dir = path_buf
			.parent()
			.filter(|p| !p.as_os_str().is_empty())
			.unwrap_or_else(|| Path::new("."));

		let mut loader = loader::ConfigLoader::new(base_dir);
		let file_name = path_buf
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path)))?;
		loader.load_config(file_name).await
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.client.id.is_empty() {
			return Err(ConfigError::Validation("Client ID cannot be empty".into()));
		}
		if self.client.confirmation_timeout_seconds == 0
			|| self.client.confirmation_timeout_seconds > 3600
		{
			return Err(ConfigError::Validation(
				"confirmation_timeout_seconds must be between 1 and 3600".into(),
			));
		}
		if self.client.poll_interval_ms < 100 {
			return Err(ConfigError::Validation(
				"poll_interval_ms must be at least 100".into(),
			));
		}

		let network = &self.network;
		if network.chain_id == 0 {
			return Err(ConfigError::Validation(
				"Network chain_id must be positive".into(),
			));
		}
		if !(network.rpc_url.starts_with("http://") || network.rpc_url.starts_with("https://")) {
			return Err(ConfigError::Validation(format!(
				"Network rpc_url '{}' must be an http(s) URL",
				network.rpc_url
			)));
		}
		if network.casino_address == Address::ZERO {
			return Err(ConfigError::Validation(
				"Network casino_address cannot be the zero address".into(),
			));
		}

		if self.wallet.primary.is_empty() {
			return Err(ConfigError::Validation(
				"Wallet primary implementation cannot be empty".into(),
			));
		}
		if self.wallet.primary_config().is_none() {
			return Err(ConfigError::Validation(format!(
				"Primary wallet '{}' not found in implementations",
				self.wallet.primary
			)));
		}

		Ok(())
	}
}

/// Parses and validates a configuration from TOML text.
///
/// Environment references are resolved before parsing.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const BASE: &str = r#"
[client]
id = "dice-client"

[network]
chain_id = 545
rpc_url = "https://testnet.evm.nodes.onflow.org"
casino_address = "0x3C40F3B7488a80D6Cf06697f4537Fb73D3B8d27F"

[wallet]
primary = "local"
[wallet.implementations.local]
private_key = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"
"#;

	#[test]
	fn test_defaults_applied() {
		let config: Config = BASE.parse().unwrap();
		assert_eq!(config.client.confirmation_timeout_seconds, 300);
		assert_eq!(config.client.poll_interval_ms, 2000);
		assert_eq!(config.client.rebuild_retry_max_elapsed_seconds, 0);
		assert_eq!(config.network.native_symbol, "FLOW");
		assert_eq!(config.network.native_decimals, 18);
		assert_eq!(config.network.log_chunk_size, 10_000);
		assert_eq!(config.network, NetworkConfig::flow_testnet());
	}

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("CASINO_TEST_CHAIN_ID", "646");
		let input = "chain_id = ${CASINO_TEST_CHAIN_ID}\nname = \"${CASINO_TEST_UNSET_NAME:-Flow EVM}\"";
		let resolved = resolve_env_vars(input).unwrap();
		assert_eq!(resolved, "chain_id = 646\nname = \"Flow EVM\"");
		std::env::remove_var("CASINO_TEST_CHAIN_ID");
	}

	#[test]
	fn test_missing_env_var_is_error() {
		let result = resolve_env_vars("key = \"${CASINO_TEST_DEFINITELY_UNSET}\"");
		assert!(matches!(result, Err(ConfigError::Validation(msg)) if msg.contains("CASINO_TEST_DEFINITELY_UNSET")));
	}

	#[test]
	fn test_unknown_primary_wallet() {
		let input = BASE.replace("primary = \"local\"", "primary = \"browser\"");
		let err = input.parse::<Config>().unwrap_err();
		assert!(err.to_string().contains("Primary wallet 'browser'"));
	}

	#[test]
	fn test_rejects_bad_network() {
		let input = BASE.replace(
			"https://testnet.evm.nodes.onflow.org",
			"wss://testnet.evm.nodes.onflow.org",
		);
		assert!(input.parse::<Config>().is_err());

		let input = BASE.replace(
			"0x3C40F3B7488a80D6Cf06697f4537Fb73D3B8d27F",
			"0x0000000000000000000000000000000000000000",
		);
		assert!(input.parse::<Config>().is_err());
	}

	#[test]
	fn test_timeout_bounds() {
		let input = BASE.replace(
			"id = \"dice-client\"",
			"id = \"dice-client\"\nconfirmation_timeout_seconds = 0",
		);
		assert!(input.parse::<Config>().is_err());

		let input = BASE.replace(
			"id = \"dice-client\"",
			"id = \"dice-client\"\npoll_interval_ms = 10",
		);
		assert!(input.parse::<Config>().is_err());
	}
}
