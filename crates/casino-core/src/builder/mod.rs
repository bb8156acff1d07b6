//! Builder for constructing casino engines.
//!
//! Resolves the endpoint and wallet implementations named by the
//! configuration through their factories. Either one can be replaced with a
//! ready-made instance, which is how dry runs and tests plug in mocks.

use crate::engine::CasinoEngine;
use casino_config::Config;
use casino_endpoint::{create_endpoint, EndpointInterface};
use casino_wallet::{create_wallet, WalletInterface};
use std::sync::Arc;
use thiserror::Error;

/// Endpoint implementation used when none is injected.
const DEFAULT_ENDPOINT: &str = "alloy";

#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
}

pub struct CasinoBuilder {
	config: Config,
	endpoint: Option<Arc<dyn EndpointInterface>>,
	wallet: Option<Arc<dyn WalletInterface>>,
}

impl CasinoBuilder {
	pub fn new(config: Config) -> Self {
		Self {
			config,
			endpoint: None,
			wallet: None,
		}
	}

	pub fn with_endpoint(mut self, endpoint: Arc<dyn EndpointInterface>) -> Self {
		self.endpoint = Some(endpoint);
		self
	}

	pub fn with_wallet(mut self, wallet: Arc<dyn WalletInterface>) -> Self {
		self.wallet = Some(wallet);
		self
	}

	pub fn build(self) -> Result<CasinoEngine, BuilderError> {
		let network = &self.config.network;

		let endpoint = match self.endpoint {
			Some(endpoint) => endpoint,
			None => {
				let table = toml::Value::Table(toml::map::Map::new());
				let endpoint = create_endpoint(DEFAULT_ENDPOINT, &table, network).map_err(|e| {
					tracing::error!(
						component = "endpoint",
						implementation = DEFAULT_ENDPOINT,
						error = %e,
						"Failed to create endpoint implementation"
					);
					BuilderError::Config(format!(
						"Failed to create endpoint implementation '{}': {}",
						DEFAULT_ENDPOINT, e
					))
				})?;
				tracing::info!(component = "endpoint", implementation = DEFAULT_ENDPOINT, "Loaded");
				Arc::from(endpoint)
			},
		};

		let wallet = match self.wallet {
			Some(wallet) => wallet,
			None => {
				let primary = &self.config.wallet.primary;
				let table = self.config.wallet.primary_config().ok_or_else(|| {
					BuilderError::Config(format!(
						"Primary wallet '{}' not found in implementations",
						primary
					))
				})?;
				let wallet = create_wallet(primary, table, network).map_err(|e| {
					tracing::error!(
						component = "wallet",
						implementation = %primary,
						error = %e,
						"Failed to create wallet implementation"
					);
					BuilderError::Config(format!(
						"Failed to create wallet implementation '{}': {}",
						primary, e
					))
				})?;
				tracing::info!(component = "wallet", implementation = %primary, "Loaded");
				Arc::from(wallet)
			},
		};

		Ok(CasinoEngine::new(&self.config, endpoint, wallet))
	}
}
