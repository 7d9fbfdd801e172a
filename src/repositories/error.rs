//! Error types for repository operations.

use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum RepositoryError {
	#[error("Validation error: {0}")]
	ValidationError(String),

	#[error("Not found: {0}")]
	NotFound(String),

	#[error("Internal error: {0}")]
	InternalError(String),
}

impl RepositoryError {
	pub fn validation_error(msg: impl Into<String>) -> Self {
		let error = Self::ValidationError(msg.into());
		error!("{}", error);
		error
	}

	pub fn not_found(msg: impl Into<String>) -> Self {
		let error = Self::NotFound(msg.into());
		error!("{}", error);
		error
	}

	pub fn internal_error(msg: impl Into<String>) -> Self {
		let error = Self::InternalError(msg.into());
		error!("{}", error);
		error
	}
}

impl From<serde_json::Error> for RepositoryError {
	fn from(err: serde_json::Error) -> Self {
		Self::internal_error(err.to_string())
	}
}
