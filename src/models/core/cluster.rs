use serde::{Deserialize, Serialize};

/// Current wire version of [`ClusterMessage`]
pub const CLUSTER_MESSAGE_VERSION: u16 = 1;

/// Events the Monitor fleet exchanges over the coordinator
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClusterEvent {
	/// A filter item was added on the origin instance
	FilterAdded { regex: String, item: String },
	/// Digest of the origin's filter state after its last mutation
	FilterHash { hash: String },
	/// The origin now owns the live feed connection
	ConnectionClaimed,
	/// The origin closed its live feed connection
	ConnectionReleased,
}

/// Versioned envelope published on a cluster channel
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ClusterMessage {
	pub version: u16,
	/// Instance id of the publisher
	pub origin: String,
	pub sent_at: chrono::DateTime<chrono::Utc>,
	pub event: ClusterEvent,
}

impl ClusterMessage {
	pub fn new(origin: impl Into<String>, event: ClusterEvent) -> Self {
		Self {
			version: CLUSTER_MESSAGE_VERSION,
			origin: origin.into(),
			sent_at: chrono::Utc::now(),
			event,
		}
	}

	pub fn to_payload(&self) -> Result<String, serde_json::Error> {
		serde_json::to_string(self)
	}

	pub fn from_payload(payload: &str) -> Result<Self, serde_json::Error> {
		serde_json::from_str(payload)
	}
}
