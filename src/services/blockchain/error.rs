//! Chain operation error types and handling.
//!
//! Adapter failures are [`ProviderError`]s and stay isolated to the provider that
//! produced them. Callers of the racer only ever see a [`ChainstateError`].

use thiserror::Error;
use tracing::{error, warn};

/// Failure of a single provider call
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
	#[error("Network error: {0}")]
	Network(String),

	/// The provider rejected the transaction itself
	#[error("Invalid transaction: {0}")]
	InvalidTransaction(String),

	#[error("Transaction not found")]
	NotFound,

	#[error("Malformed response: {0}")]
	MalformedResponse(String),

	#[error("Unsupported operation: {0}")]
	Unsupported(String),
}

impl ProviderError {
	pub fn network(msg: impl Into<String>) -> Self {
		let error = Self::Network(msg.into());
		warn!("{}", error);
		error
	}

	pub fn invalid_transaction(msg: impl Into<String>) -> Self {
		let error = Self::InvalidTransaction(msg.into());
		warn!("{}", error);
		error
	}

	pub fn malformed_response(msg: impl Into<String>) -> Self {
		let error = Self::MalformedResponse(msg.into());
		warn!("{}", error);
		error
	}

	pub fn unsupported(msg: impl Into<String>) -> Self {
		Self::Unsupported(msg.into())
	}
}

impl From<reqwest::Error> for ProviderError {
	fn from(err: reqwest::Error) -> Self {
		if err.is_decode() {
			Self::malformed_response(err.to_string())
		} else {
			Self::network(err.to_string())
		}
	}
}

impl From<reqwest_middleware::Error> for ProviderError {
	fn from(err: reqwest_middleware::Error) -> Self {
		Self::network(err.to_string())
	}
}

impl From<serde_json::Error> for ProviderError {
	fn from(err: serde_json::Error) -> Self {
		Self::malformed_response(err.to_string())
	}
}

/// Errors surfaced by broadcast and query operations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChainstateError {
	/// Malformed transaction id or hex, or a transaction rejected as invalid
	#[error("Validation error: {0}")]
	Validation(String),

	/// Every provider failed
	#[error("Provider error: {0}")]
	Provider(String),

	#[error("Transaction not found: {0}")]
	NotFound(String),

	/// Found, but no answer met the requested criteria
	#[error("Transaction {0} did not satisfy the required criteria")]
	Unsatisfied(String),

	#[error("Timeout error: {0}")]
	Timeout(String),

	#[error("Coordination error: {0}")]
	Coordination(String),

	#[error("Configuration error: {0}")]
	Configuration(String),
}

impl ChainstateError {
	pub fn validation(msg: impl Into<String>) -> Self {
		let error = Self::Validation(msg.into());
		error!("{}", error);
		error
	}

	/// Aggregates per-provider failures into a single error
	pub fn provider(failures: &[(String, ProviderError)]) -> Self {
		let msg = if failures.is_empty() {
			"no capable providers".to_string()
		} else {
			failures
				.iter()
				.map(|(name, err)| format!("{}: {}", name, err))
				.collect::<Vec<_>>()
				.join("; ")
		};
		let error = Self::Provider(msg);
		error!("{}", error);
		error
	}

	pub fn not_found(id: impl Into<String>) -> Self {
		let error = Self::NotFound(id.into());
		error!("{}", error);
		error
	}

	pub fn unsatisfied(id: impl Into<String>) -> Self {
		let error = Self::Unsatisfied(id.into());
		error!("{}", error);
		error
	}

	pub fn timeout(msg: impl Into<String>) -> Self {
		let error = Self::Timeout(msg.into());
		error!("{}", error);
		error
	}

	pub fn coordination(msg: impl Into<String>) -> Self {
		let error = Self::Coordination(msg.into());
		error!("{}", error);
		error
	}

	pub fn configuration(msg: impl Into<String>) -> Self {
		let error = Self::Configuration(msg.into());
		error!("{}", error);
		error
	}
}
