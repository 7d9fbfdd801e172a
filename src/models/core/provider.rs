use serde::{Deserialize, Serialize};
use std::fmt;

/// Chain network the engine talks to
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Network {
	#[default]
	Main,
	Test,
	Stn,
}

impl Network {
	/// Short network name used in provider URL paths
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Main => "main",
			Self::Test => "test",
			Self::Stn => "stn",
		}
	}
}

impl fmt::Display for Network {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// The external API family a provider adapter speaks
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
	WhatsOnChain,
	Mapi,
	NowNodes,
}

impl ProviderKind {
	/// Capabilities the API family offers out of the box
	pub fn default_capabilities(&self) -> ProviderCapabilities {
		match self {
			Self::WhatsOnChain => ProviderCapabilities {
				broadcast: true,
				query: true,
				fee_quotes: false,
				live_feed: true,
			},
			Self::Mapi => ProviderCapabilities {
				broadcast: true,
				query: true,
				fee_quotes: true,
				live_feed: false,
			},
			Self::NowNodes => ProviderCapabilities {
				broadcast: true,
				query: true,
				fee_quotes: false,
				live_feed: false,
			},
		}
	}
}

/// Capability flags a provider advertises
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProviderCapabilities {
	pub broadcast: bool,
	pub query: bool,
	pub fee_quotes: bool,
	pub live_feed: bool,
}

/// A weighted endpoint belonging to a provider
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EndpointUrl {
	pub url: String,
	#[serde(default = "default_weight")]
	pub weight: u32,
}

fn default_weight() -> u32 {
	100
}

/// Mining fee expressed as satoshis per `bytes` bytes
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct FeeUnit {
	pub satoshis: u64,
	pub bytes: u64,
}

/// Fee policy published by a miner
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FeeQuote {
	pub standard: FeeUnit,
	pub data: FeeUnit,
	pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
	pub fetched_at: chrono::DateTime<chrono::Utc>,
}
