//! Provider adapters.
//!
//! Each adapter normalises one vendor's wire format into [`TransactionInfo`],
//! [`BroadcastResult`] and [`FeeQuote`]:
//! - WhatsOnChain REST API (also the mempool snapshot source)
//! - Merchant API (mAPI) with fee quotes
//! - NowNodes JSON-RPC
//!
//! [`TransactionInfo`]: crate::models::TransactionInfo
//! [`BroadcastResult`]: crate::models::BroadcastResult
//! [`FeeQuote`]: crate::models::FeeQuote

mod mapi;
mod nownodes;
mod whatsonchain;

pub use mapi::MapiProvider;
pub use nownodes::NowNodesProvider;
pub use whatsonchain::WhatsOnChainProvider;

use reqwest::StatusCode;
use std::sync::Arc;

use crate::{
	models::{ChainstateConfig, ProviderKind},
	services::blockchain::{ChainProvider, ChainstateError, ProviderError},
};

/// Rejection messages meaning the transaction is already accepted upstream
const ALREADY_KNOWN_MESSAGES: [&str; 6] = [
	"already known",
	"already in the mempool",
	"txn-already-known",
	"txn-already-in-mempool",
	"already in block chain",
	"transaction already exists",
];

pub(crate) fn is_already_known(msg: &str) -> bool {
	let msg = msg.to_ascii_lowercase();
	ALREADY_KNOWN_MESSAGES.iter().any(|known| msg.contains(known))
}

/// Maps a non-success HTTP answer to a provider error
///
/// Throttling and server-side failures are transient; any other 4xx is the
/// provider refusing the transaction.
pub(crate) fn classify_rejection(status: StatusCode, body: &str) -> ProviderError {
	if status == StatusCode::REQUEST_TIMEOUT
		|| status == StatusCode::TOO_MANY_REQUESTS
		|| status.is_server_error()
	{
		ProviderError::network(format!("status {}: {}", status.as_u16(), body.trim()))
	} else {
		ProviderError::invalid_transaction(format!("status {}: {}", status.as_u16(), body.trim()))
	}
}

/// Reads a response body, returning the status alongside it
pub(crate) async fn read_response(
	response: reqwest::Response,
) -> Result<(StatusCode, String), ProviderError> {
	let status = response.status();
	let body = response.text().await?;
	Ok((status, body))
}

/// Builds an adapter for every enabled provider in the configuration
pub fn build_providers(
	config: &ChainstateConfig,
) -> Result<Vec<Arc<dyn ChainProvider>>, ChainstateError> {
	config
		.enabled_providers()
		.map(|provider| {
			let adapter: Result<Arc<dyn ChainProvider>, ProviderError> = match provider.kind {
				ProviderKind::WhatsOnChain => {
					WhatsOnChainProvider::new(provider, config.http_max_retries)
						.map(|p| Arc::new(p) as Arc<dyn ChainProvider>)
				}
				ProviderKind::Mapi => MapiProvider::new(provider, config.http_max_retries)
					.map(|p| Arc::new(p) as Arc<dyn ChainProvider>),
				ProviderKind::NowNodes => NowNodesProvider::new(provider, config.http_max_retries)
					.map(|p| Arc::new(p) as Arc<dyn ChainProvider>),
			};
			adapter.map_err(|e| {
				ChainstateError::configuration(format!("provider {}: {}", provider.name, e))
			})
		})
		.collect()
}
