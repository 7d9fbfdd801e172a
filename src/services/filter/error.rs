use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum FilterError {
	#[error("Invalid pattern error: {0}")]
	InvalidPattern(String),

	#[error("Malformed event error: {0}")]
	MalformedEvent(String),

	#[error("Internal error: {0}")]
	InternalError(String),
}

impl FilterError {
	pub fn invalid_pattern(msg: impl Into<String>) -> Self {
		let error = FilterError::InvalidPattern(msg.into());
		error!("{}", error);
		error
	}

	pub fn malformed_event(msg: impl Into<String>) -> Self {
		let error = FilterError::MalformedEvent(msg.into());
		error!("{}", error);
		error
	}

	pub fn internal_error(msg: impl Into<String>) -> Self {
		let error = FilterError::InternalError(msg.into());
		error!("{}", error);
		error
	}
}

impl From<regex::Error> for FilterError {
	fn from(err: regex::Error) -> Self {
		Self::invalid_pattern(err.to_string())
	}
}

impl From<serde_json::Error> for FilterError {
	fn from(err: serde_json::Error) -> Self {
		Self::malformed_event(err.to_string())
	}
}
