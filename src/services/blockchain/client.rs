//! Entry point for chain operations.
//!
//! Bundles the racer, the miner services and an optional [`Monitor`] behind one
//! handle built from [`ChainstateConfig`].

use std::{sync::Arc, time::Duration};

use crate::{
	models::{ChainstateConfig, Network, RequiredIn, TransactionInfo},
	services::{
		blockchain::{
			build_providers, ChainProvider, ChainRacer, ChainstateError, MinerSet, MinerSnapshot,
		},
		monitor::Monitor,
	},
};

pub struct ChainstateClient {
	config: ChainstateConfig,
	racer: ChainRacer,
	miners: MinerSet,
	monitor: Option<Arc<Monitor>>,
}

impl ChainstateClient {
	pub fn new(config: ChainstateConfig, providers: Vec<Arc<dyn ChainProvider>>) -> Self {
		Self {
			miners: MinerSet::new(&providers),
			racer: ChainRacer::new(providers),
			config,
			monitor: None,
		}
	}

	/// Builds the provider adapters named in the configuration
	pub fn from_config(config: ChainstateConfig) -> Result<Self, ChainstateError> {
		let providers = build_providers(&config)?;
		if providers.is_empty() {
			return Err(ChainstateError::configuration("no enabled providers"));
		}
		Ok(Self::new(config, providers))
	}

	pub fn with_monitor(mut self, monitor: Arc<Monitor>) -> Self {
		self.monitor = Some(monitor);
		self
	}

	/// Broadcasts the transaction and returns the name of the accepting provider
	pub async fn broadcast(
		&self,
		id: &str,
		tx_hex: &str,
		timeout: Option<Duration>,
	) -> Result<String, ChainstateError> {
		let timeout = timeout.unwrap_or_else(|| self.config.broadcast_timeout());
		let result = self.racer.broadcast(id, tx_hex, timeout).await?;
		Ok(result.provider)
	}

	pub async fn query_transaction(
		&self,
		id: &str,
		required_in: RequiredIn,
		timeout: Option<Duration>,
	) -> Result<TransactionInfo, ChainstateError> {
		let timeout = timeout.unwrap_or_else(|| self.query_timeout());
		self.racer.query_transaction(id, required_in, timeout).await
	}

	pub async fn query_transaction_fastest(
		&self,
		id: &str,
		required_in: RequiredIn,
		timeout: Option<Duration>,
	) -> Result<TransactionInfo, ChainstateError> {
		let timeout = timeout.unwrap_or_else(|| self.query_timeout());
		self.racer
			.query_transaction_fastest(id, required_in, timeout)
			.await
	}

	pub async fn broadcast_miners(&self) -> Vec<MinerSnapshot> {
		self.miners.broadcast_miners().await
	}

	pub async fn query_miners(&self) -> Vec<MinerSnapshot> {
		self.miners.query_miners().await
	}

	pub async fn refresh_fee_quotes(&self) -> Result<usize, ChainstateError> {
		self.miners.refresh_fee_quotes(self.query_timeout()).await
	}

	pub fn network(&self) -> Network {
		self.config.network
	}

	pub fn query_timeout(&self) -> Duration {
		self.config.query_timeout()
	}

	pub fn is_debug(&self) -> bool {
		self.config.debug
	}

	pub fn monitor(&self) -> Option<&Arc<Monitor>> {
		self.monitor.as_ref()
	}

	/// Stops the monitor, if any
	pub async fn close(&self) {
		if let Some(monitor) = &self.monitor {
			if let Err(error) = monitor.stop().await {
				tracing::warn!("monitor did not stop cleanly: {}", error);
			}
		}
	}
}
