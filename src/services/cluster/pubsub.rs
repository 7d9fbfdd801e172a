//! Publish/subscribe contract shared by the coordinator backends.

use async_trait::async_trait;
use futures::FutureExt;
use std::{panic::AssertUnwindSafe, sync::Arc};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::warn;

use crate::services::cluster::ClusterError;

/// Receives every message published on a subscribed channel
#[async_trait]
pub trait MessageHandler: Send + Sync {
	async fn on_message(&self, channel: &str, payload: &str) -> Result<(), ClusterError>;
}

/// Forwards payloads into a channel so they can be consumed elsewhere
#[async_trait]
impl MessageHandler for mpsc::UnboundedSender<String> {
	async fn on_message(&self, _channel: &str, payload: &str) -> Result<(), ClusterError> {
		self.send(payload.to_string())
			.map_err(|_| ClusterError::subscribe_error("receiver dropped"))
	}
}

#[async_trait]
pub trait PubSub: Send + Sync {
	/// Fans the payload out to the current subscribers of `channel`
	async fn publish(&self, channel: &str, payload: &str) -> Result<(), ClusterError>;

	/// Registers `handler` for every message published on `channel` from now on
	async fn subscribe(
		&self,
		channel: &str,
		handler: Arc<dyn MessageHandler>,
	) -> Result<Subscription, ClusterError>;
}

/// Live subscription; delivery stops when it is dropped or unsubscribed
#[derive(Debug)]
pub struct Subscription {
	channel: String,
	task: JoinHandle<()>,
}

impl Subscription {
	pub(crate) fn new(channel: impl Into<String>, task: JoinHandle<()>) -> Self {
		Self {
			channel: channel.into(),
			task,
		}
	}

	pub fn channel(&self) -> &str {
		&self.channel
	}

	pub fn is_active(&self) -> bool {
		!self.task.is_finished()
	}

	pub fn unsubscribe(self) {
		self.task.abort();
	}
}

impl Drop for Subscription {
	fn drop(&mut self) {
		self.task.abort();
	}
}

/// Runs the handler for one message
///
/// Errors and panics are logged; the subscription keeps going either way.
pub(crate) async fn dispatch(handler: &Arc<dyn MessageHandler>, channel: &str, payload: &str) {
	match AssertUnwindSafe(handler.on_message(channel, payload))
		.catch_unwind()
		.await
	{
		Ok(Ok(())) => {}
		Ok(Err(error)) => warn!(channel, "message handler failed: {}", error),
		Err(_) => warn!(channel, "message handler panicked"),
	}
}
