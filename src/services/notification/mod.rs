//! Model lifecycle notifications.
//!
//! Notifications are fire-and-forget: [`NotificationDispatcher`] queues them for a
//! single background worker and never reports delivery failures to the caller.

mod error;
mod webhook;

pub use error::NotificationError;
pub use webhook::{WebhookMessage, WebhookNotifier};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::{
	sync::mpsc::{self, error::TrySendError},
	task::JoinHandle,
};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
	Create,
	Update,
	Delete,
}

/// Delivers one notification
#[async_trait]
pub trait Notifier: Send + Sync {
	async fn notify(
		&self,
		model_name: &str,
		event: EventType,
		model: &Value,
		id: &str,
	) -> Result<(), NotificationError>;
}

#[derive(Debug)]
struct Notification {
	model_name: String,
	event: EventType,
	model: Value,
	id: String,
}

/// Bounded queue in front of a [`Notifier`]
pub struct NotificationDispatcher {
	tx: mpsc::Sender<Notification>,
	worker: JoinHandle<()>,
}

impl NotificationDispatcher {
	pub fn new(notifier: Arc<dyn Notifier>, capacity: usize) -> Self {
		let (tx, mut rx) = mpsc::channel::<Notification>(capacity.max(1));
		let worker = tokio::spawn(async move {
			while let Some(n) = rx.recv().await {
				if let Err(error) = notifier.notify(&n.model_name, n.event, &n.model, &n.id).await {
					warn!(model = %n.model_name, id = %n.id, "notification failed: {}", error);
				}
			}
			debug!("notification worker stopped");
		});
		Self { tx, worker }
	}

	/// Queues a notification without waiting
	///
	/// Returns false when the notification was dropped because the queue is full
	/// or the worker is gone.
	pub fn dispatch(&self, model_name: &str, event: EventType, model: Value, id: &str) -> bool {
		let notification = Notification {
			model_name: model_name.to_string(),
			event,
			model,
			id: id.to_string(),
		};
		match self.tx.try_send(notification) {
			Ok(()) => true,
			Err(TrySendError::Full(n)) => {
				warn!(model = %n.model_name, id = %n.id, "notification queue full, dropping");
				false
			}
			Err(TrySendError::Closed(n)) => {
				warn!(model = %n.model_name, id = %n.id, "notification worker stopped, dropping");
				false
			}
		}
	}

	/// Delivers what is queued, then stops the worker
	pub async fn shutdown(self) {
		let Self { tx, worker } = self;
		drop(tx);
		if let Err(error) = worker.await {
			warn!("notification worker ended abnormally: {}", error);
		}
	}
}
