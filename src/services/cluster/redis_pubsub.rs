//! Redis coordinator backend.
//!
//! Publishing shares one multiplexed connection. Every subscription opens its own
//! pub/sub connection, drained by a dedicated task. All network calls are bounded
//! by the connect timeout so an unreachable server fails fast.

use async_trait::async_trait;
use futures::{Future, StreamExt};
use redis::{aio::MultiplexedConnection, AsyncCommands, Client};
use std::{sync::Arc, time::Duration};
use tracing::{debug, warn};

use crate::services::cluster::{
	pubsub::dispatch, ClusterError, MessageHandler, PubSub, Subscription,
};

pub struct RedisPubSub {
	client: Client,
	connection: MultiplexedConnection,
	timeout: Duration,
}

async fn bounded<T, F>(timeout: Duration, what: &str, future: F) -> Result<T, ClusterError>
where
	F: Future<Output = redis::RedisResult<T>>,
{
	match tokio::time::timeout(timeout, future).await {
		Ok(result) => result.map_err(ClusterError::from),
		Err(_) => Err(ClusterError::connection_error(format!(
			"{} timed out after {:?}",
			what, timeout
		))),
	}
}

impl RedisPubSub {
	/// Connects to the server, failing if it does not answer within `timeout`
	pub async fn connect(url: &str, timeout: Duration) -> Result<Self, ClusterError> {
		let client = Client::open(url)
			.map_err(|e| ClusterError::connection_error(format!("invalid redis url: {}", e)))?;
		let connection = bounded(timeout, "redis connect", client.get_multiplexed_async_connection())
			.await?;
		debug!("connected to redis coordinator");

		Ok(Self {
			client,
			connection,
			timeout,
		})
	}
}

#[async_trait]
impl PubSub for RedisPubSub {
	async fn publish(&self, channel: &str, payload: &str) -> Result<(), ClusterError> {
		let mut connection = self.connection.clone();
		bounded(
			self.timeout,
			"redis publish",
			connection.publish::<_, _, ()>(channel, payload),
		)
		.await
	}

	async fn subscribe(
		&self,
		channel: &str,
		handler: Arc<dyn MessageHandler>,
	) -> Result<Subscription, ClusterError> {
		let mut pubsub = bounded(self.timeout, "redis subscribe", self.client.get_async_pubsub())
			.await?;
		bounded(self.timeout, "redis subscribe", pubsub.subscribe(channel)).await?;

		let name = channel.to_string();
		let task = tokio::spawn(async move {
			let mut messages = pubsub.into_on_message();
			while let Some(message) = messages.next().await {
				match message.get_payload::<String>() {
					Ok(payload) => dispatch(&handler, &name, &payload).await,
					Err(error) => warn!(channel = %name, "undecodable payload: {}", error),
				}
			}
			warn!(channel = %name, "redis subscription closed");
		});

		Ok(Subscription::new(channel, task))
	}
}
