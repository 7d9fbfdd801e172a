//! Manages the rotation of provider HTTP endpoints
//!
//! Provides methods for rotating between multiple URLs and sending requests to the active endpoint
//! with automatic fallback to other URLs on failure.

use reqwest_middleware::{ClientWithMiddleware, RequestBuilder};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::{models::EndpointUrl, services::blockchain::ProviderError};

/// HTTP status codes that trigger endpoint rotation
/// - 429: Too Many Requests
/// - 502, 503, 504: upstream unavailable
pub const ROTATE_ON_ERROR_CODES: [u16; 4] = [429, 502, 503, 504];

/// Manages the rotation of provider endpoints
///
/// # Fields
/// * `active_url` - The current active URL
/// * `fallback_urls` - Remaining URLs, highest weight first
/// * `client` - The retrying client shared by all URLs
/// * `rotation_lock` - Serialises rotations
#[derive(Clone, Debug)]
pub struct HttpEndpointManager {
	pub active_url: Arc<RwLock<String>>,
	pub fallback_urls: Arc<RwLock<Vec<String>>>,
	client: ClientWithMiddleware,
	rotation_lock: Arc<Mutex<()>>,
}

impl HttpEndpointManager {
	/// Creates a manager over the given URLs
	///
	/// URLs with weight 0 are disabled. The highest weight becomes the active URL,
	/// the rest are kept as fallbacks in weight order.
	pub fn new(client: ClientWithMiddleware, urls: &[EndpointUrl]) -> Result<Self, ProviderError> {
		let mut enabled: Vec<&EndpointUrl> = urls.iter().filter(|u| u.weight > 0).collect();
		enabled.sort_by(|a, b| b.weight.cmp(&a.weight));

		let mut normalized = enabled
			.iter()
			.map(|u| u.url.trim_end_matches('/').to_string());
		let active = normalized
			.next()
			.ok_or_else(|| ProviderError::network("no enabled endpoint URLs"))?;

		Ok(Self {
			active_url: Arc::new(RwLock::new(active)),
			fallback_urls: Arc::new(RwLock::new(normalized.collect())),
			client,
			rotation_lock: Arc::new(Mutex::new(())),
		})
	}

	pub async fn get_current_url(&self) -> String {
		self.active_url.read().await.clone()
	}

	/// Number of URLs known to the manager
	pub async fn url_count(&self) -> usize {
		self.fallback_urls.read().await.len() + 1
	}

	/// Rotates to the next fallback URL, pushing the current one to the back
	///
	/// Returns false when there is nothing to rotate to.
	pub async fn rotate_url(&self) -> bool {
		let _guard = self.rotation_lock.lock().await;

		let mut fallback_urls = self.fallback_urls.write().await;
		if fallback_urls.is_empty() {
			return false;
		}
		let next = fallback_urls.remove(0);

		let mut active_url = self.active_url.write().await;
		tracing::debug!("Rotating endpoint - from: {}, to: {}", active_url, next);
		let previous = std::mem::replace(&mut *active_url, next);
		fallback_urls.push(previous);
		true
	}

	/// Sends a request built against the active base URL, rotating on failure
	///
	/// Each URL is tried at most once per call. Network errors and the status codes
	/// in [`ROTATE_ON_ERROR_CODES`] move on to the next URL; any other response is
	/// handed back to the caller for interpretation.
	pub async fn send<F>(&self, build: F) -> Result<reqwest::Response, ProviderError>
	where
		F: Fn(&ClientWithMiddleware, &str) -> RequestBuilder + Send + Sync,
	{
		let attempts = self.url_count().await;
		let mut last_error = None;

		for attempt in 0..attempts {
			let base_url = self.get_current_url().await;
			let has_next = attempt + 1 < attempts;

			match build(&self.client, &base_url).send().await {
				Ok(response) => {
					let status = response.status().as_u16();
					if has_next && ROTATE_ON_ERROR_CODES.contains(&status) {
						tracing::warn!("Endpoint {} answered {}, rotating", base_url, status);
						last_error = Some(ProviderError::network(format!(
							"{} answered with status {}",
							base_url, status
						)));
						self.rotate_url().await;
						continue;
					}
					return Ok(response);
				}
				Err(network_error) => {
					tracing::warn!("Network error while sending request: {}", network_error);
					last_error = Some(ProviderError::from(network_error));
					if has_next {
						self.rotate_url().await;
					}
				}
			}
		}

		Err(last_error.unwrap_or_else(|| ProviderError::network("no endpoint attempted")))
	}
}
