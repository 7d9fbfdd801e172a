//! Cluster client selecting the coordinator backend and namespacing channels.

use std::sync::Arc;

use crate::{
	models::{ClusterConfig, ClusterMessage, CoordinatorKind},
	services::cluster::{
		ClusterError, MemoryPubSub, MessageHandler, PubSub, RedisPubSub, Subscription,
	},
};

/// Pub/sub handle shared by every component of one instance
///
/// All channel names are prefixed with the cluster prefix before they reach the
/// backend.
#[derive(Clone)]
pub struct ClusterClient {
	backend: Arc<dyn PubSub>,
	coordinator: CoordinatorKind,
	prefix: String,
}

impl ClusterClient {
	/// Connects the backend named in the configuration
	pub async fn new(config: &ClusterConfig) -> Result<Self, ClusterError> {
		let backend: Arc<dyn PubSub> = match config.coordinator {
			CoordinatorKind::Memory => Arc::new(MemoryPubSub::new()),
			CoordinatorKind::Redis => {
				let url = config
					.redis_url
					.as_deref()
					.filter(|url| !url.is_empty())
					.ok_or_else(|| {
						ClusterError::unsupported_backend("redis coordinator without redis_url")
					})?;
				Arc::new(RedisPubSub::connect(url, config.connect_timeout()).await?)
			}
		};

		Ok(Self::with_backend(backend, config.coordinator, &config.prefix))
	}

	pub fn with_backend(
		backend: Arc<dyn PubSub>,
		coordinator: CoordinatorKind,
		prefix: impl Into<String>,
	) -> Self {
		Self {
			backend,
			coordinator,
			prefix: prefix.into(),
		}
	}

	/// In-memory client, mostly for single-process deployments and tests
	pub fn memory(prefix: impl Into<String>) -> Self {
		Self::with_backend(Arc::new(MemoryPubSub::new()), CoordinatorKind::Memory, prefix)
	}

	pub fn coordinator(&self) -> CoordinatorKind {
		self.coordinator
	}

	pub fn prefix(&self) -> &str {
		&self.prefix
	}

	/// Backend channel name for `channel`
	pub fn channel_name(&self, channel: &str) -> String {
		format!("{}{}", self.prefix, channel)
	}

	pub async fn publish(&self, channel: &str, payload: &str) -> Result<(), ClusterError> {
		self.backend
			.publish(&self.channel_name(channel), payload)
			.await
	}

	pub async fn publish_message(
		&self,
		channel: &str,
		message: &ClusterMessage,
	) -> Result<(), ClusterError> {
		self.publish(channel, &message.to_payload()?).await
	}

	pub async fn subscribe(
		&self,
		channel: &str,
		handler: Arc<dyn MessageHandler>,
	) -> Result<Subscription, ClusterError> {
		self.backend
			.subscribe(&self.channel_name(channel), handler)
			.await
	}
}
