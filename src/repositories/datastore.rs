//! Datastore collaborator interfaces and an in-memory implementation.
//!
//! The engine never talks to a database directly. Models are opaque JSON records
//! addressed by `(model name, id)`; read-replica routing is an implementation
//! detail behind [`ReadPreference`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::{
	models::Destination,
	repositories::RepositoryError,
	services::notification::{EventType, NotificationDispatcher},
};

/// Hint for routing reads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReadPreference {
	#[default]
	Primary,
	Replica,
}

#[async_trait]
pub trait Datastore: Send + Sync {
	async fn create_model(&self, model: &str, id: &str, data: Value) -> Result<(), RepositoryError>;

	async fn get_model(
		&self,
		model: &str,
		id: &str,
		read: ReadPreference,
	) -> Result<Option<Value>, RepositoryError>;

	async fn update_model(&self, model: &str, id: &str, data: Value) -> Result<(), RepositoryError>;

	/// Atomically adds `delta` to a numeric field and returns the new value
	async fn increment_model(
		&self,
		model: &str,
		id: &str,
		field: &str,
		delta: i64,
	) -> Result<i64, RepositoryError>;

	/// Whether reads may be served by a replica
	fn read_replica(&self) -> bool {
		false
	}
}

/// Storage of the destinations watched by the monitor
#[async_trait]
pub trait DestinationStore: Send + Sync {
	/// Destinations whose monitoring started at or after `since`
	async fn get_monitored_destinations(
		&self,
		since: DateTime<Utc>,
	) -> Result<Vec<Destination>, RepositoryError>;

	async fn save_destination(&self, destination: Destination) -> Result<(), RepositoryError>;
}

/// A persisted model with lifecycle hooks
#[async_trait]
pub trait Model: Send + Sync {
	fn model_name(&self) -> &str;

	fn id(&self) -> &str;

	fn to_value(&self) -> Result<Value, RepositoryError>;

	/// Runs after the model was updated in the datastore
	async fn after_updated(&self) -> Result<(), RepositoryError> {
		Ok(())
	}
}

/// Increments `field` of `model`, then runs its after-update hook
///
/// When a dispatcher is given, an update notification is queued without waiting
/// for delivery.
pub async fn increment_field<M: Model>(
	datastore: &dyn Datastore,
	model: &M,
	field: &str,
	delta: i64,
	notifications: Option<&NotificationDispatcher>,
) -> Result<i64, RepositoryError> {
	let value = datastore
		.increment_model(model.model_name(), model.id(), field, delta)
		.await?;
	model.after_updated().await?;

	if let Some(dispatcher) = notifications {
		let mut record = model.to_value()?;
		if let Some(object) = record.as_object_mut() {
			object.insert(field.to_string(), Value::from(value));
		}
		dispatcher.dispatch(model.model_name(), EventType::Update, record, model.id());
	}
	Ok(value)
}

/// Process-local datastore
#[derive(Default)]
pub struct InMemoryDatastore {
	models: RwLock<HashMap<(String, String), Value>>,
	destinations: RwLock<Vec<Destination>>,
}

impl InMemoryDatastore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_destinations(destinations: Vec<Destination>) -> Self {
		Self {
			destinations: RwLock::new(destinations),
			..Self::default()
		}
	}

	fn key(model: &str, id: &str) -> (String, String) {
		(model.to_string(), id.to_string())
	}
}

#[async_trait]
impl Datastore for InMemoryDatastore {
	async fn create_model(&self, model: &str, id: &str, data: Value) -> Result<(), RepositoryError> {
		let mut models = self.models.write().await;
		let key = Self::key(model, id);
		if models.contains_key(&key) {
			return Err(RepositoryError::validation_error(format!(
				"{} {} already exists",
				model, id
			)));
		}
		models.insert(key, data);
		Ok(())
	}

	async fn get_model(
		&self,
		model: &str,
		id: &str,
		_read: ReadPreference,
	) -> Result<Option<Value>, RepositoryError> {
		Ok(self.models.read().await.get(&Self::key(model, id)).cloned())
	}

	async fn update_model(&self, model: &str, id: &str, data: Value) -> Result<(), RepositoryError> {
		match self.models.write().await.get_mut(&Self::key(model, id)) {
			Some(existing) => {
				*existing = data;
				Ok(())
			}
			None => Err(RepositoryError::not_found(format!("{} {}", model, id))),
		}
	}

	async fn increment_model(
		&self,
		model: &str,
		id: &str,
		field: &str,
		delta: i64,
	) -> Result<i64, RepositoryError> {
		let mut models = self.models.write().await;
		let record = models
			.get_mut(&Self::key(model, id))
			.ok_or_else(|| RepositoryError::not_found(format!("{} {}", model, id)))?;
		let object = record.as_object_mut().ok_or_else(|| {
			RepositoryError::validation_error(format!("{} {} is not an object", model, id))
		})?;

		let current = match object.get(field) {
			None | Some(Value::Null) => 0,
			Some(value) => value.as_i64().ok_or_else(|| {
				RepositoryError::validation_error(format!("{} is not an integer field", field))
			})?,
		};
		let updated = current
			.checked_add(delta)
			.ok_or_else(|| RepositoryError::validation_error(format!("{} overflowed", field)))?;
		object.insert(field.to_string(), Value::from(updated));
		Ok(updated)
	}
}

#[async_trait]
impl DestinationStore for InMemoryDatastore {
	async fn get_monitored_destinations(
		&self,
		since: DateTime<Utc>,
	) -> Result<Vec<Destination>, RepositoryError> {
		Ok(self
			.destinations
			.read()
			.await
			.iter()
			.filter(|d| d.monitor.is_some_and(|monitored| monitored >= since))
			.cloned()
			.collect())
	}

	async fn save_destination(&self, destination: Destination) -> Result<(), RepositoryError> {
		let mut destinations = self.destinations.write().await;
		match destinations.iter_mut().find(|d| d.id == destination.id) {
			Some(existing) => *existing = destination,
			None => destinations.push(destination),
		}
		Ok(())
	}
}
