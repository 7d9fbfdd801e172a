//! Miner services: eligible provider snapshots and fee quote refresh.
//!
//! The fee schedule of the whole set is one immutable snapshot. A refresh fetches
//! every quote first and then swaps the snapshot in a single write, so readers see
//! either the previous set of quotes or the new one.

use futures::future::join_all;
use std::{sync::Arc, time::Duration};
use tokio::sync::{Mutex, RwLock};
use tracing::{info, instrument, warn};

use crate::{
	models::{FeeQuote, ProviderCapabilities},
	services::blockchain::{ChainProvider, ChainstateError, ProviderError},
};

/// Point-in-time view of one miner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinerSnapshot {
	pub name: String,
	pub priority: u32,
	pub capabilities: ProviderCapabilities,
	pub fee_quote: Option<FeeQuote>,
}

impl MinerSnapshot {
	fn of(provider: &dyn ChainProvider) -> Self {
		Self {
			name: provider.name().to_string(),
			priority: provider.priority(),
			capabilities: provider.capabilities(),
			fee_quote: None,
		}
	}
}

pub struct MinerSet {
	/// Same order as `snapshot`
	providers: Vec<Arc<dyn ChainProvider>>,
	snapshot: RwLock<Arc<Vec<MinerSnapshot>>>,
	/// Serializes refreshes so one cannot overwrite a newer one
	refresh: Mutex<()>,
}

impl MinerSet {
	pub fn new(providers: &[Arc<dyn ChainProvider>]) -> Self {
		let snapshot = providers
			.iter()
			.map(|provider| MinerSnapshot::of(provider.as_ref()))
			.collect();
		Self {
			providers: providers.to_vec(),
			snapshot: RwLock::new(Arc::new(snapshot)),
			refresh: Mutex::new(()),
		}
	}

	/// The current snapshot of every miner
	pub async fn snapshot(&self) -> Arc<Vec<MinerSnapshot>> {
		self.snapshot.read().await.clone()
	}

	async fn snapshots(&self, eligible: impl Fn(&ProviderCapabilities) -> bool) -> Vec<MinerSnapshot> {
		self.snapshot()
			.await
			.iter()
			.filter(|miner| eligible(&miner.capabilities))
			.cloned()
			.collect()
	}

	/// Miners that accept broadcasts
	pub async fn broadcast_miners(&self) -> Vec<MinerSnapshot> {
		self.snapshots(|c| c.broadcast).await
	}

	/// Miners that answer transaction queries
	pub async fn query_miners(&self) -> Vec<MinerSnapshot> {
		self.snapshots(|c| c.query).await
	}

	/// Fetches a fresh quote from every fee-quoting miner
	///
	/// All miners are attempted. A miner that fails keeps its previous quote and its
	/// failure is part of the aggregate error returned once every attempt finished.
	/// Returns the number of quotes updated.
	#[instrument(skip_all)]
	pub async fn refresh_fee_quotes(&self, timeout: Duration) -> Result<usize, ChainstateError> {
		let _refreshing = self.refresh.lock().await;

		let attempts = self
			.providers
			.iter()
			.enumerate()
			.filter(|(_, provider)| provider.capabilities().fee_quotes)
			.map(|(index, provider)| async move {
				let result = match tokio::time::timeout(timeout, provider.fee_quote()).await {
					Ok(result) => result,
					Err(_) => Err(ProviderError::network(format!(
						"fee quote exceeded {:?}",
						timeout
					))),
				};
				(index, provider, result)
			});
		let results = join_all(attempts).await;

		let mut next = self.snapshot().await.as_ref().clone();
		let mut refreshed = 0;
		let mut failures = Vec::new();
		for (index, provider, result) in results {
			match result {
				Ok(quote) => {
					next[index].fee_quote = Some(quote);
					refreshed += 1;
				}
				Err(error) => {
					warn!(miner = %provider.name(), "keeping previous fee quote: {}", error);
					failures.push((provider.name().to_string(), error));
				}
			}
		}
		*self.snapshot.write().await = Arc::new(next);

		info!(refreshed, failed = failures.len(), "fee quotes refreshed");
		if failures.is_empty() {
			Ok(refreshed)
		} else {
			Err(ChainstateError::provider(&failures))
		}
	}
}
