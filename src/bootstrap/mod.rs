//! Bootstrap module for wiring services from configuration.
//!
//! Builds, in order:
//! - `ClusterClient`: the coordinator backend; an unreachable backend leaves the
//!   instance running standalone
//! - `NotificationDispatcher`: webhook notifications, when configured
//! - `Monitor`: the live feed monitor, when configured
//! - `ChainstateClient`: providers, racer and miner services

use std::sync::Arc;
use tracing::{info, warn};

use crate::{
	models::{ChainstateConfig, ConfigLoader},
	repositories::{DestinationStore, InMemoryDatastore},
	services::{
		blockchain::ChainstateClient,
		cluster::ClusterClient,
		monitor::{Monitor, MonitorServices},
		notification::{NotificationDispatcher, WebhookNotifier},
	},
};

/// Type alias for bootstrap results
pub type Result<T> = anyhow::Result<T>;

/// Everything the binary needs after startup
pub struct Services {
	pub client: Arc<ChainstateClient>,
	pub monitor: Option<Arc<Monitor>>,
	pub cluster: Option<ClusterClient>,
	pub notifications: Option<Arc<NotificationDispatcher>>,
}

/// Connects the coordinator named in the configuration
///
/// Connectivity failures are not fatal: the instance runs without cross-instance
/// sync. An unusable backend selection is.
pub async fn initialize_cluster(config: &ChainstateConfig) -> Result<Option<ClusterClient>> {
	match ClusterClient::new(&config.cluster).await {
		Ok(cluster) => {
			info!(
				coordinator = ?cluster.coordinator(),
				prefix = %cluster.prefix(),
				"cluster coordinator ready"
			);
			Ok(Some(cluster))
		}
		Err(error) if error.is_connectivity() => {
			warn!("cluster coordinator unavailable, running standalone: {}", error);
			Ok(None)
		}
		Err(error) => Err(error.into()),
	}
}

/// Initializes all services described by `config`
///
/// Destinations are read from and saved to `destinations` when given, otherwise
/// to an in-memory store.
pub async fn initialize_services(
	config: ChainstateConfig,
	destinations: Option<Arc<dyn DestinationStore>>,
) -> Result<Services> {
	config
		.validate()
		.map_err(|e| anyhow::anyhow!("invalid configuration: {}", e))?;

	let cluster = initialize_cluster(&config).await?;

	let notifications = match &config.notifications {
		Some(notification_config) => {
			let notifier =
				WebhookNotifier::new(&notification_config.webhook_url, config.http_max_retries)?;
			Some(Arc::new(NotificationDispatcher::new(
				Arc::new(notifier),
				notification_config.queue_capacity,
			)))
		}
		None => None,
	};

	let monitor = match &config.monitor {
		Some(monitor_config) => {
			let destinations =
				destinations.unwrap_or_else(|| Arc::new(InMemoryDatastore::new()));
			let services = MonitorServices {
				destinations: Some(destinations),
				cluster: cluster.clone(),
				notifications: notifications.clone(),
			};
			Some(Arc::new(Monitor::from_config(
				monitor_config.clone(),
				config.http_max_retries,
				services,
			)?))
		}
		None => None,
	};

	let mut client = ChainstateClient::from_config(config)?;
	if let Some(monitor) = &monitor {
		client = client.with_monitor(monitor.clone());
	}

	Ok(Services {
		client: Arc::new(client),
		monitor,
		cluster,
		notifications,
	})
}
