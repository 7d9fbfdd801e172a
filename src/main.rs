//! Chain-state monitor service entry point.
//!
//! Loads the configuration, wires the services, starts the live feed monitor and
//! refreshes miner fee quotes on a fixed interval until Ctrl+C.
//!
//! # Flow
//! 1. Loads `.env`, then the JSON configuration (`--config`, or `CHAINSTATE_CONFIG`)
//! 2. Applies environment overrides (`REDIS_URL`)
//! 3. Initializes the cluster coordinator, notifications, monitor and chain client
//! 4. Starts the monitor with a logging handler
//! 5. Handles graceful shutdown on Ctrl+C or when the monitor gives up reconnecting

use chainstate_monitor::{
	bootstrap::initialize_services,
	models::{ChainstateConfig, ConfigLoader},
	services::monitor::LoggingHandler,
	utils::logging::setup_logging,
};

use clap::{Arg, Command};
use dotenvy::dotenv;
use std::{env::var, path::Path, sync::Arc, time::Duration};
use tracing::{error, info};

const DEFAULT_CONFIG_PATH: &str = "config/chainstate.json";
const FEE_QUOTE_REFRESH_INTERVAL: Duration = Duration::from_secs(600);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let matches = Command::new("chainstate-monitor")
		.version(env!("CARGO_PKG_VERSION"))
		.about(
			"Broadcasts and queries transactions across chain data providers and watches the \
			 mempool feed for watched locking scripts.",
		)
		.arg(
			Arg::new("config")
				.long("config")
				.short('c')
				.help("Path to the JSON configuration (default: config/chainstate.json)")
				.value_name("PATH"),
		)
		.arg(
			Arg::new("debug")
				.long("debug")
				.help("Log at debug level")
				.action(clap::ArgAction::SetTrue),
		)
		.get_matches();

	// Load environment variables from .env file
	dotenv().ok();

	let config_path = matches
		.get_one::<String>("config")
		.cloned()
		.or_else(|| var("CHAINSTATE_CONFIG").ok())
		.unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

	let mut config = ChainstateConfig::load_from_path(Path::new(&config_path))
		.map_err(|e| anyhow::anyhow!("Failed to load {}: {}", config_path, e))?;
	if let Ok(redis_url) = var("REDIS_URL") {
		config.cluster.redis_url = Some(redis_url);
	}
	config.debug |= matches.get_flag("debug");

	setup_logging(config.debug).unwrap_or_else(|e| {
		eprintln!("Failed to setup logging: {}", e);
	});

	let services = initialize_services(config, None)
		.await
		.map_err(|e| anyhow::anyhow!("Failed to initialize services: {}", e))?;

	if let Some(monitor) = &services.monitor {
		monitor.start(Arc::new(LoggingHandler)).await?;
	}

	let client = services.client.clone();
	let refresher = tokio::spawn(async move {
		let mut interval = tokio::time::interval(FEE_QUOTE_REFRESH_INTERVAL);
		loop {
			interval.tick().await;
			match client.refresh_fee_quotes().await {
				Ok(refreshed) => info!(refreshed, "fee quotes refreshed"),
				Err(e) => error!("Fee quote refresh failed: {}", e),
			}
		}
	});

	info!("Service started. Press Ctrl+C to shutdown");

	let monitor = services.monitor.clone();
	let monitor_finished = async move {
		match monitor {
			Some(monitor) => monitor.wait().await,
			None => std::future::pending().await,
		}
	};

	let outcome = tokio::select! {
		result = tokio::signal::ctrl_c() => {
			if let Err(e) = result {
				error!("Error waiting for Ctrl+C: {}", e);
			}
			info!("Shutdown signal received, stopping services...");
			Ok(())
		}
		result = monitor_finished => {
			if let Err(e) = &result {
				error!("Monitor stopped: {}", e);
			}
			result.map_err(anyhow::Error::from)
		}
	};

	refresher.abort();
	services.client.close().await;
	info!("Shutdown complete");
	outcome
}
