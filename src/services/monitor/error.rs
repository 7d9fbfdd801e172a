//! Monitor error types and handling.

use thiserror::Error;
use tracing::error;

use crate::{repositories::RepositoryError, services::filter::FilterError};

#[derive(Debug, Error)]
pub enum MonitorError {
	/// The live feed could not be reached or dropped the connection
	#[error("Connection error: {0}")]
	ConnectionError(String),

	/// The feed answered with something the monitor cannot use
	#[error("Feed error: {0}")]
	FeedError(String),

	#[error("Datastore error: {0}")]
	DatastoreError(String),

	#[error("Filter error: {0}")]
	FilterError(String),

	/// Reconnection attempts are exhausted; the session is over
	#[error("Fatal error: {0}")]
	Fatal(String),

	#[error("Invalid state: {0}")]
	InvalidState(String),

	/// Returned by handlers when recording a match failed
	#[error("Handler error: {0}")]
	HandlerError(String),
}

impl MonitorError {
	pub fn connection_error(msg: impl Into<String>) -> Self {
		let error = Self::ConnectionError(msg.into());
		error!("{}", error);
		error
	}

	pub fn feed_error(msg: impl Into<String>) -> Self {
		let error = Self::FeedError(msg.into());
		error!("{}", error);
		error
	}

	pub fn datastore_error(msg: impl Into<String>) -> Self {
		let error = Self::DatastoreError(msg.into());
		error!("{}", error);
		error
	}

	pub fn fatal(msg: impl Into<String>) -> Self {
		let error = Self::Fatal(msg.into());
		error!("{}", error);
		error
	}

	pub fn invalid_state(msg: impl Into<String>) -> Self {
		let error = Self::InvalidState(msg.into());
		error!("{}", error);
		error
	}

	pub fn handler_error(msg: impl Into<String>) -> Self {
		let error = Self::HandlerError(msg.into());
		error!("{}", error);
		error
	}
}

impl From<FilterError> for MonitorError {
	fn from(err: FilterError) -> Self {
		Self::FilterError(err.to_string())
	}
}

impl From<RepositoryError> for MonitorError {
	fn from(err: RepositoryError) -> Self {
		Self::datastore_error(err.to_string())
	}
}

impl From<tokio_tungstenite::tungstenite::Error> for MonitorError {
	fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
		Self::connection_error(err.to_string())
	}
}
