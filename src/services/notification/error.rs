//! Notification error types and handling.

use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum NotificationError {
	/// Delivery failed (e.g., webhook unreachable or answering non-2xx)
	#[error("Network error: {0}")]
	NetworkError(String),

	#[error("Config error: {0}")]
	ConfigError(String),

	#[error("Internal error: {0}")]
	InternalError(String),
}

impl NotificationError {
	pub fn network_error(msg: impl Into<String>) -> Self {
		let error = Self::NetworkError(msg.into());
		error!("{}", error);
		error
	}

	pub fn config_error(msg: impl Into<String>) -> Self {
		let error = Self::ConfigError(msg.into());
		error!("{}", error);
		error
	}

	pub fn internal_error(msg: impl Into<String>) -> Self {
		let error = Self::InternalError(msg.into());
		error!("{}", error);
		error
	}
}

impl From<reqwest_middleware::Error> for NotificationError {
	fn from(err: reqwest_middleware::Error) -> Self {
		Self::network_error(err.to_string())
	}
}
