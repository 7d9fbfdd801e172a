use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ClusterError {
	/// The coordination backend could not be reached
	#[error("Connection error: {0}")]
	ConnectionError(String),

	#[error("Publish error: {0}")]
	PublishError(String),

	#[error("Subscribe error: {0}")]
	SubscribeError(String),

	#[error("Serialization error: {0}")]
	SerializationError(String),

	#[error("Unsupported coordinator: {0}")]
	UnsupportedBackend(String),
}

impl ClusterError {
	pub fn connection_error(msg: impl Into<String>) -> Self {
		let error = Self::ConnectionError(msg.into());
		error!("{}", error);
		error
	}

	pub fn publish_error(msg: impl Into<String>) -> Self {
		let error = Self::PublishError(msg.into());
		error!("{}", error);
		error
	}

	pub fn subscribe_error(msg: impl Into<String>) -> Self {
		let error = Self::SubscribeError(msg.into());
		error!("{}", error);
		error
	}

	pub fn serialization_error(msg: impl Into<String>) -> Self {
		let error = Self::SerializationError(msg.into());
		error!("{}", error);
		error
	}

	pub fn unsupported_backend(msg: impl Into<String>) -> Self {
		let error = Self::UnsupportedBackend(msg.into());
		error!("{}", error);
		error
	}

	/// True for failures caused by an unreachable backend
	pub fn is_connectivity(&self) -> bool {
		matches!(self, Self::ConnectionError(_))
	}
}

impl From<serde_json::Error> for ClusterError {
	fn from(err: serde_json::Error) -> Self {
		Self::serialization_error(err.to_string())
	}
}

impl From<redis::RedisError> for ClusterError {
	fn from(err: redis::RedisError) -> Self {
		if err.is_connection_refusal()
			|| err.is_connection_dropped()
			|| err.is_timeout()
			|| err.is_io_error()
		{
			Self::connection_error(err.to_string())
		} else {
			Self::publish_error(err.to_string())
		}
	}
}
