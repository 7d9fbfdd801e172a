//! In-process coordinator backend.
//!
//! Each subscriber owns an unbounded queue drained by its own task, so a slow
//! handler never blocks publishers and messages from one publisher arrive in order.

use async_trait::async_trait;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{mpsc, RwLock};

use crate::services::cluster::{
	pubsub::dispatch, ClusterError, MessageHandler, PubSub, Subscription,
};

#[derive(Clone, Default)]
pub struct MemoryPubSub {
	channels: Arc<RwLock<HashMap<String, Vec<mpsc::UnboundedSender<String>>>>>,
}

impl MemoryPubSub {
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of live subscribers on `channel`
	pub async fn subscriber_count(&self, channel: &str) -> usize {
		self.channels
			.read()
			.await
			.get(channel)
			.map(|subscribers| subscribers.iter().filter(|s| !s.is_closed()).count())
			.unwrap_or_default()
	}
}

#[async_trait]
impl PubSub for MemoryPubSub {
	async fn publish(&self, channel: &str, payload: &str) -> Result<(), ClusterError> {
		let mut channels = self.channels.write().await;
		if let Some(subscribers) = channels.get_mut(channel) {
			subscribers.retain(|subscriber| subscriber.send(payload.to_string()).is_ok());
			if subscribers.is_empty() {
				channels.remove(channel);
			}
		}
		Ok(())
	}

	async fn subscribe(
		&self,
		channel: &str,
		handler: Arc<dyn MessageHandler>,
	) -> Result<Subscription, ClusterError> {
		let (tx, mut rx) = mpsc::unbounded_channel::<String>();
		self.channels
			.write()
			.await
			.entry(channel.to_string())
			.or_default()
			.push(tx);

		let name = channel.to_string();
		let task = tokio::spawn(async move {
			while let Some(payload) = rx.recv().await {
				dispatch(&handler, &name, &payload).await;
			}
		});

		Ok(Subscription::new(channel, task))
	}
}
