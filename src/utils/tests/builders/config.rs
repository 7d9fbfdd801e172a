//! Test helper utilities for engine configuration
//!
//! - `ConfigBuilder`: Builder for creating test ChainstateConfig instances
//! - `ProviderConfigBuilder`: Builder for creating test ProviderConfig instances
//! - `MonitorConfigBuilder`: Builder for creating test MonitorConfig instances

use crate::models::{
	ChainstateConfig, ClusterConfig, CoordinatorKind, EndpointUrl, MonitorConfig, Network,
	NotificationConfig, ProcessorKind, ProviderConfig, ProviderKind,
};

/// Builder for creating test ChainstateConfig instances
pub struct ConfigBuilder {
	config: ChainstateConfig,
}

impl Default for ConfigBuilder {
	fn default() -> Self {
		Self {
			config: ChainstateConfig {
				network: Network::Main,
				debug: false,
				query_timeout_ms: 1_000,
				broadcast_timeout_ms: 1_000,
				http_max_retries: 0,
				providers: vec![ProviderConfigBuilder::new().build()],
				cluster: ClusterConfig::default(),
				monitor: None,
				notifications: None,
			},
		}
	}
}

impl ConfigBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn network(mut self, network: Network) -> Self {
		self.config.network = network;
		self
	}

	pub fn debug(mut self, debug: bool) -> Self {
		self.config.debug = debug;
		self
	}

	pub fn query_timeout_ms(mut self, timeout_ms: u64) -> Self {
		self.config.query_timeout_ms = timeout_ms;
		self
	}

	pub fn broadcast_timeout_ms(mut self, timeout_ms: u64) -> Self {
		self.config.broadcast_timeout_ms = timeout_ms;
		self
	}

	pub fn providers(mut self, providers: Vec<ProviderConfig>) -> Self {
		self.config.providers = providers;
		self
	}

	pub fn provider(mut self, provider: ProviderConfig) -> Self {
		self.config.providers.push(provider);
		self
	}

	pub fn redis(mut self, url: &str) -> Self {
		self.config.cluster.coordinator = CoordinatorKind::Redis;
		self.config.cluster.redis_url = Some(url.to_string());
		self
	}

	pub fn cluster_prefix(mut self, prefix: &str) -> Self {
		self.config.cluster.prefix = prefix.to_string();
		self
	}

	pub fn monitor(mut self, monitor: MonitorConfig) -> Self {
		self.config.monitor = Some(monitor);
		self
	}

	pub fn webhook(mut self, url: &str) -> Self {
		self.config.notifications = Some(NotificationConfig {
			webhook_url: url.to_string(),
			queue_capacity: 16,
		});
		self
	}

	pub fn build(self) -> ChainstateConfig {
		self.config
	}
}

/// Builder for creating test ProviderConfig instances
pub struct ProviderConfigBuilder {
	config: ProviderConfig,
}

impl Default for ProviderConfigBuilder {
	fn default() -> Self {
		Self {
			config: ProviderConfig {
				name: "whatsonchain".to_string(),
				kind: ProviderKind::WhatsOnChain,
				urls: vec![EndpointUrl {
					url: "https://api.whatsonchain.com/v1/bsv/main".to_string(),
					weight: 100,
				}],
				api_key: None,
				enabled: true,
				priority: 10,
				broadcast: None,
				query: None,
				fee_quotes: None,
			},
		}
	}
}

impl ProviderConfigBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn name(mut self, name: &str) -> Self {
		self.config.name = name.to_string();
		self
	}

	pub fn kind(mut self, kind: ProviderKind) -> Self {
		self.config.kind = kind;
		self
	}

	pub fn url(mut self, url: &str) -> Self {
		self.config.urls = vec![EndpointUrl {
			url: url.to_string(),
			weight: 100,
		}];
		self
	}

	pub fn urls(mut self, urls: Vec<EndpointUrl>) -> Self {
		self.config.urls = urls;
		self
	}

	pub fn api_key(mut self, api_key: &str) -> Self {
		self.config.api_key = Some(api_key.to_string());
		self
	}

	pub fn enabled(mut self, enabled: bool) -> Self {
		self.config.enabled = enabled;
		self
	}

	pub fn priority(mut self, priority: u32) -> Self {
		self.config.priority = priority;
		self
	}

	pub fn broadcast(mut self, broadcast: bool) -> Self {
		self.config.broadcast = Some(broadcast);
		self
	}

	pub fn query(mut self, query: bool) -> Self {
		self.config.query = Some(query);
		self
	}

	pub fn build(self) -> ProviderConfig {
		self.config
	}
}

/// Builder for creating test MonitorConfig instances
pub struct MonitorConfigBuilder {
	config: MonitorConfig,
}

impl Default for MonitorConfigBuilder {
	fn default() -> Self {
		Self {
			config: MonitorConfig {
				feed_url: "ws://localhost:8000/mempool".to_string(),
				api_url: "http://localhost:8001".to_string(),
				auth_token: None,
				processor: ProcessorKind::Bloom,
				false_positive_rate: 0.01,
				max_number_of_destinations: 1_000,
				monitor_days: 7,
				load_monitored_destinations: true,
				save_destinations: false,
				process_mempool_on_connect: false,
				max_reconnect_attempts: 1,
				reconnect_delay_ms: 5,
				connection_timeout_ms: 200,
			},
		}
	}
}

impl MonitorConfigBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn feed_url(mut self, url: &str) -> Self {
		self.config.feed_url = url.to_string();
		self
	}

	pub fn api_url(mut self, url: &str) -> Self {
		self.config.api_url = url.to_string();
		self
	}

	pub fn processor(mut self, processor: ProcessorKind) -> Self {
		self.config.processor = processor;
		self
	}

	pub fn false_positive_rate(mut self, rate: f64) -> Self {
		self.config.false_positive_rate = rate;
		self
	}

	pub fn max_number_of_destinations(mut self, max: usize) -> Self {
		self.config.max_number_of_destinations = max;
		self
	}

	pub fn save_destinations(mut self, save: bool) -> Self {
		self.config.save_destinations = save;
		self
	}

	pub fn load_monitored_destinations(mut self, load: bool) -> Self {
		self.config.load_monitored_destinations = load;
		self
	}

	pub fn process_mempool_on_connect(mut self, process: bool) -> Self {
		self.config.process_mempool_on_connect = process;
		self
	}

	pub fn max_reconnect_attempts(mut self, attempts: usize) -> Self {
		self.config.max_reconnect_attempts = attempts;
		self
	}

	pub fn build(self) -> MonitorConfig {
		self.config
	}
}
