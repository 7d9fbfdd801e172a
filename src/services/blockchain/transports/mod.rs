//! Network transport for provider adapters.
//!
//! Every adapter talks HTTP through an [`HttpEndpointManager`] wrapping a retrying
//! client, so weighted failover behaves the same for all providers.

mod endpoint_manager;

pub use endpoint_manager::{HttpEndpointManager, ROTATE_ON_ERROR_CODES};

use crate::{
	models::ProviderConfig,
	services::blockchain::ProviderError,
	utils::{create_retryable_http_client, HttpRetryConfig, TransientErrorRetryStrategy},
};
use std::time::Duration;

/// Upper bound of a single HTTP exchange; racer deadlines are usually shorter
const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Builds the endpoint manager for a configured provider
pub fn endpoint_manager_for(
	config: &ProviderConfig,
	max_retries: u32,
) -> Result<HttpEndpointManager, ProviderError> {
	let base_client = reqwest::Client::builder()
		.timeout(HTTP_REQUEST_TIMEOUT)
		.build()
		.map_err(ProviderError::from)?;

	let client = create_retryable_http_client(
		&HttpRetryConfig::default().with_max_retries(max_retries),
		base_client,
		Some(TransientErrorRetryStrategy),
	);

	HttpEndpointManager::new(client, &config.urls)
}
