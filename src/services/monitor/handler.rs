//! Callbacks receiving what the monitor finds on the live feed.

use async_trait::async_trait;
use tracing::info;

use crate::{models::BlockHeader, services::monitor::MonitorError};

/// Receives matched transactions and new block headers
///
/// The monitor does not persist anything itself. Errors are logged and never stop
/// the feed.
#[async_trait]
pub trait MonitorHandler: Send + Sync {
	async fn record_transaction(&self, tx_hex: &str) -> Result<(), MonitorError>;

	async fn record_block_header(&self, header: &BlockHeader) -> Result<(), MonitorError>;
}

/// Handler that only logs, used by the binary when no persistence is wired in
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

#[async_trait]
impl MonitorHandler for LoggingHandler {
	async fn record_transaction(&self, tx_hex: &str) -> Result<(), MonitorError> {
		info!(bytes = tx_hex.len() / 2, "matched transaction");
		Ok(())
	}

	async fn record_block_header(&self, header: &BlockHeader) -> Result<(), MonitorError> {
		info!(hash = %header.hash, height = header.height, "new block header");
		Ok(())
	}
}
