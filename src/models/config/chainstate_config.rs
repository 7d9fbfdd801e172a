//! Engine configuration loaded from a single JSON document.
//!
//! Every blocking chain operation takes its timeout from here unless the caller
//! supplies one, and all collaborators receive the parts they need through their
//! constructors.

use serde::{Deserialize, Serialize};
use std::{collections::HashSet, path::Path, time::Duration};

use crate::models::{
	config::{ConfigError, ConfigLoader},
	EndpointUrl, Network, ProviderCapabilities, ProviderKind,
};

const DEFAULT_QUERY_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_BROADCAST_TIMEOUT_MS: u64 = 15_000;
const DEFAULT_HTTP_MAX_RETRIES: u32 = 2;
const DEFAULT_CLUSTER_PREFIX: &str = "chainstate_cluster_";
const DEFAULT_FALSE_POSITIVE_RATE: f64 = 0.01;
const DEFAULT_MAX_DESTINATIONS: usize = 100_000;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChainstateConfig {
	#[serde(default)]
	pub network: Network,
	#[serde(default)]
	pub debug: bool,
	#[serde(default = "default_query_timeout_ms")]
	pub query_timeout_ms: u64,
	#[serde(default = "default_broadcast_timeout_ms")]
	pub broadcast_timeout_ms: u64,
	#[serde(default = "default_http_max_retries")]
	pub http_max_retries: u32,
	pub providers: Vec<ProviderConfig>,
	#[serde(default)]
	pub cluster: ClusterConfig,
	#[serde(default)]
	pub monitor: Option<MonitorConfig>,
	#[serde(default)]
	pub notifications: Option<NotificationConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
	pub name: String,
	pub kind: ProviderKind,
	pub urls: Vec<EndpointUrl>,
	#[serde(default)]
	pub api_key: Option<String>,
	#[serde(default = "default_true")]
	pub enabled: bool,
	/// Lower values are queried first
	#[serde(default = "default_priority")]
	pub priority: u32,
	#[serde(default)]
	pub broadcast: Option<bool>,
	#[serde(default)]
	pub query: Option<bool>,
	#[serde(default)]
	pub fee_quotes: Option<bool>,
}

impl ProviderConfig {
	/// Capabilities of the provider's API family narrowed by the configured overrides
	pub fn capabilities(&self) -> ProviderCapabilities {
		let defaults = self.kind.default_capabilities();
		ProviderCapabilities {
			broadcast: defaults.broadcast && self.broadcast.unwrap_or(true),
			query: defaults.query && self.query.unwrap_or(true),
			fee_quotes: defaults.fee_quotes && self.fee_quotes.unwrap_or(true),
			live_feed: defaults.live_feed,
		}
	}
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinatorKind {
	#[default]
	Memory,
	Redis,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClusterConfig {
	#[serde(default)]
	pub coordinator: CoordinatorKind,
	#[serde(default = "default_cluster_prefix")]
	pub prefix: String,
	#[serde(default)]
	pub redis_url: Option<String>,
	#[serde(default = "default_connect_timeout_ms")]
	pub connect_timeout_ms: u64,
}

impl Default for ClusterConfig {
	fn default() -> Self {
		Self {
			coordinator: CoordinatorKind::Memory,
			prefix: default_cluster_prefix(),
			redis_url: None,
			connect_timeout_ms: default_connect_timeout_ms(),
		}
	}
}

impl ClusterConfig {
	pub fn connect_timeout(&self) -> Duration {
		Duration::from_millis(self.connect_timeout_ms)
	}
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessorKind {
	#[default]
	Bloom,
	Regex,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MonitorConfig {
	pub feed_url: String,
	/// REST endpoint used for mempool snapshots
	pub api_url: String,
	#[serde(default)]
	pub auth_token: Option<String>,
	#[serde(default)]
	pub processor: ProcessorKind,
	#[serde(default = "default_false_positive_rate")]
	pub false_positive_rate: f64,
	/// Also the cell budget of every bloom filter
	#[serde(default = "default_max_destinations")]
	pub max_number_of_destinations: usize,
	#[serde(default = "default_monitor_days")]
	pub monitor_days: u32,
	#[serde(default = "default_true")]
	pub load_monitored_destinations: bool,
	#[serde(default)]
	pub save_destinations: bool,
	#[serde(default)]
	pub process_mempool_on_connect: bool,
	#[serde(default = "default_max_reconnect_attempts")]
	pub max_reconnect_attempts: usize,
	#[serde(default = "default_reconnect_delay_ms")]
	pub reconnect_delay_ms: u64,
	#[serde(default = "default_connect_timeout_ms")]
	pub connection_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotificationConfig {
	pub webhook_url: String,
	#[serde(default = "default_notification_queue")]
	pub queue_capacity: usize,
}

impl MonitorConfig {
	pub fn reconnect_delay(&self) -> Duration {
		Duration::from_millis(self.reconnect_delay_ms)
	}

	pub fn connection_timeout(&self) -> Duration {
		Duration::from_millis(self.connection_timeout_ms)
	}
}

impl ChainstateConfig {
	pub fn query_timeout(&self) -> Duration {
		Duration::from_millis(self.query_timeout_ms)
	}

	pub fn broadcast_timeout(&self) -> Duration {
		Duration::from_millis(self.broadcast_timeout_ms)
	}

	/// Providers with `enabled` set, in configuration order
	pub fn enabled_providers(&self) -> impl Iterator<Item = &ProviderConfig> {
		self.providers.iter().filter(|p| p.enabled)
	}
}

impl ConfigLoader for ChainstateConfig {
	fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
		if !Self::is_json_file(path) {
			return Err(ConfigError::file(format!(
				"{} is not a JSON file",
				path.display()
			)));
		}

		let file = std::fs::File::open(path)?;
		let config: ChainstateConfig = serde_json::from_reader(file)?;
		config.validate()?;
		Ok(config)
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.enabled_providers().next().is_none() {
			return Err(ConfigError::document("at least one enabled provider is required"));
		}

		let mut names = HashSet::new();
		for provider in &self.providers {
			let name = provider.name.as_str();
			if name.trim().is_empty() {
				return Err(ConfigError::provider(name, "name must not be empty"));
			}
			if !names.insert(name) {
				return Err(ConfigError::provider(name, "duplicate name"));
			}
			if provider.urls.is_empty() {
				return Err(ConfigError::provider(name, "no URLs"));
			}
			if let Some(url) = provider
				.urls
				.iter()
				.find(|u| !has_scheme(&u.url, &["http", "https"]))
			{
				return Err(ConfigError::provider(
					name,
					format!("{} is not an http or https URL", url.url),
				));
			}
			if let Some(url) = provider.urls.iter().find(|u| u.weight > 100) {
				return Err(ConfigError::provider(
					name,
					format!("weight {} of {} is above 100", url.weight, url.url),
				));
			}
		}

		if self.query_timeout_ms == 0 || self.broadcast_timeout_ms == 0 {
			return Err(ConfigError::document("timeouts must be greater than 0"));
		}

		if self.cluster.coordinator == CoordinatorKind::Redis
			&& self.cluster.redis_url.as_deref().map_or(true, str::is_empty)
		{
			return Err(ConfigError::cluster("redis_url is required for the redis coordinator"));
		}

		if let Some(monitor) = &self.monitor {
			if !has_scheme(&monitor.feed_url, &["ws", "wss"]) {
				return Err(ConfigError::monitor("feed_url must be a ws or wss URL"));
			}
			if !has_scheme(&monitor.api_url, &["http", "https"]) {
				return Err(ConfigError::monitor("api_url must be an http or https URL"));
			}
			if !(monitor.false_positive_rate > 0.0 && monitor.false_positive_rate < 1.0) {
				return Err(ConfigError::monitor(format!(
					"false_positive_rate {} is outside (0, 1)",
					monitor.false_positive_rate
				)));
			}
			if monitor.max_number_of_destinations == 0 {
				return Err(ConfigError::monitor(
					"max_number_of_destinations must be greater than 0",
				));
			}
		}

		if let Some(notifications) = &self.notifications {
			if !has_scheme(&notifications.webhook_url, &["http", "https"]) {
				return Err(ConfigError::notifications(
					"webhook_url must be an http or https URL",
				));
			}
		}

		Ok(())
	}
}

/// Whether `raw` parses as a URL with one of the given schemes
fn has_scheme(raw: &str, schemes: &[&str]) -> bool {
	url::Url::parse(raw).is_ok_and(|parsed| schemes.contains(&parsed.scheme()))
}

fn default_notification_queue() -> usize {
	256
}

fn default_true() -> bool {
	true
}

fn default_priority() -> u32 {
	10
}

fn default_query_timeout_ms() -> u64 {
	DEFAULT_QUERY_TIMEOUT_MS
}

fn default_broadcast_timeout_ms() -> u64 {
	DEFAULT_BROADCAST_TIMEOUT_MS
}

fn default_http_max_retries() -> u32 {
	DEFAULT_HTTP_MAX_RETRIES
}

fn default_cluster_prefix() -> String {
	DEFAULT_CLUSTER_PREFIX.to_string()
}

fn default_connect_timeout_ms() -> u64 {
	5_000
}

fn default_false_positive_rate() -> f64 {
	DEFAULT_FALSE_POSITIVE_RATE
}

fn default_max_destinations() -> usize {
	DEFAULT_MAX_DESTINATIONS
}

fn default_monitor_days() -> u32 {
	7
}

fn default_max_reconnect_attempts() -> usize {
	5
}

fn default_reconnect_delay_ms() -> u64 {
	1_000
}
