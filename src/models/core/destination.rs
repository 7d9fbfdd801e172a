use serde::{Deserialize, Serialize};

/// One filter rule: items captured by `regex` are tested against the set of watched items
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct WatchedPattern {
	pub id: String,
	pub regex: String,
}

/// A persisted destination whose locking script is monitored on the live feed
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Destination {
	pub id: String,
	pub address: String,
	pub locking_script: String,
	/// Pattern the locking script is registered under
	pub pattern: String,
	pub monitor: Option<chrono::DateTime<chrono::Utc>>,
	pub created_at: chrono::DateTime<chrono::Utc>,
}
