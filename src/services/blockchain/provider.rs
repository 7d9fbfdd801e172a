//! Provider abstraction shared by the racer and the miner services.
//!
//! A provider is described by what it can do rather than which vendor it is.
//! Operations outside its capabilities answer [`ProviderError::Unsupported`].

use async_trait::async_trait;

use crate::{
	models::{BroadcastResult, FeeQuote, ProviderCapabilities, TransactionInfo},
	services::blockchain::ProviderError,
};

pub const DEFAULT_PROVIDER_PRIORITY: u32 = 10;

#[async_trait]
pub trait ChainProvider: Send + Sync {
	/// Unique name of the provider within the configured set
	fn name(&self) -> &str;

	fn capabilities(&self) -> ProviderCapabilities;

	/// Lower values are tried first by sequential queries
	fn priority(&self) -> u32 {
		DEFAULT_PROVIDER_PRIORITY
	}

	/// Submits a raw transaction
	///
	/// A transaction the provider already knows is reported as success with
	/// `already_known` set.
	async fn broadcast(&self, id: &str, tx_hex: &str) -> Result<BroadcastResult, ProviderError>;

	/// Looks up a transaction by id
	async fn query_transaction(&self, id: &str) -> Result<TransactionInfo, ProviderError>;

	/// Fetches the current fee policy
	async fn fee_quote(&self) -> Result<FeeQuote, ProviderError> {
		Err(ProviderError::unsupported(format!(
			"{} does not provide fee quotes",
			self.name()
		)))
	}
}
