//! Webhook notifier.
//!
//! Posts every model lifecycle event as JSON to a single URL.

use async_trait::async_trait;
use chrono::Utc;
use reqwest_middleware::ClientWithMiddleware;
use serde::Serialize;
use serde_json::Value;

use crate::{
	services::notification::{EventType, NotificationError, Notifier},
	utils::{create_retryable_http_client, HttpRetryConfig, TransientErrorRetryStrategy},
};

/// Body posted to the webhook
#[derive(Serialize, Debug)]
pub struct WebhookMessage<'a> {
	pub model: &'a str,
	pub event: EventType,
	pub id: &'a str,
	pub timestamp: i64,
	pub data: &'a Value,
}

pub struct WebhookNotifier {
	url: String,
	client: ClientWithMiddleware,
}

impl WebhookNotifier {
	pub fn new(url: impl Into<String>, max_retries: u32) -> Result<Self, NotificationError> {
		let url = url.into();
		if !(url.starts_with("http://") || url.starts_with("https://")) {
			return Err(NotificationError::config_error(format!(
				"webhook url must be http(s): {}",
				url
			)));
		}

		let client = create_retryable_http_client(
			&HttpRetryConfig::default().with_max_retries(max_retries),
			reqwest::Client::new(),
			Some(TransientErrorRetryStrategy),
		);
		Ok(Self { url, client })
	}
}

#[async_trait]
impl Notifier for WebhookNotifier {
	async fn notify(
		&self,
		model_name: &str,
		event: EventType,
		model: &Value,
		id: &str,
	) -> Result<(), NotificationError> {
		let message = WebhookMessage {
			model: model_name,
			event,
			id,
			timestamp: Utc::now().timestamp_millis(),
			data: model,
		};

		let response = self.client.post(&self.url).json(&message).send().await?;
		if !response.status().is_success() {
			return Err(NotificationError::network_error(format!(
				"webhook answered {}",
				response.status()
			)));
		}
		Ok(())
	}
}
