//! Errors raised while reading or validating the engine configuration.
//!
//! Validation failures name the section at fault: a provider entry, the cluster
//! coordinator, the monitor or the notification settings. Every constructor logs
//! the error once.

use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ConfigError {
	/// A provider entry cannot be used
	#[error("provider {provider}: {reason}")]
	Provider { provider: String, reason: String },

	#[error("cluster: {0}")]
	Cluster(String),

	#[error("monitor: {0}")]
	Monitor(String),

	#[error("notifications: {0}")]
	Notifications(String),

	/// Settings that apply to the whole document, like timeouts or the provider list
	#[error("configuration: {0}")]
	Document(String),

	#[error("cannot parse configuration: {0}")]
	Parse(String),

	#[error("cannot read configuration: {0}")]
	File(String),
}

impl ConfigError {
	fn logged(self) -> Self {
		error!("{}", self);
		self
	}

	pub fn provider(provider: impl Into<String>, reason: impl Into<String>) -> Self {
		Self::Provider {
			provider: provider.into(),
			reason: reason.into(),
		}
		.logged()
	}

	pub fn cluster(msg: impl Into<String>) -> Self {
		Self::Cluster(msg.into()).logged()
	}

	pub fn monitor(msg: impl Into<String>) -> Self {
		Self::Monitor(msg.into()).logged()
	}

	pub fn notifications(msg: impl Into<String>) -> Self {
		Self::Notifications(msg.into()).logged()
	}

	pub fn document(msg: impl Into<String>) -> Self {
		Self::Document(msg.into()).logged()
	}

	pub fn parse(msg: impl Into<String>) -> Self {
		Self::Parse(msg.into()).logged()
	}

	pub fn file(msg: impl Into<String>) -> Self {
		Self::File(msg.into()).logged()
	}

	/// The document was read but describes an unusable setup
	pub fn is_validation(&self) -> bool {
		!matches!(self, Self::Parse(_) | Self::File(_))
	}
}

impl From<std::io::Error> for ConfigError {
	fn from(err: std::io::Error) -> Self {
		Self::file(err.to_string())
	}
}

impl From<serde_json::Error> for ConfigError {
	fn from(err: serde_json::Error) -> Self {
		Self::parse(err.to_string())
	}
}
