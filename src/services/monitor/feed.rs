use async_trait::async_trait;

use crate::{models::BlockHeader, services::monitor::MonitorError};

/// One inbound event from the live feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
	/// Raw publication data of a mempool transaction
	Transaction(Vec<u8>),
	BlockHeader(BlockHeader),
}

/// Connection to a live transaction feed
///
/// Implementations are shared between the monitor's feed task and its callers, so
/// every method takes `&self`. `next_event` is the only long-running call and is
/// only ever awaited by one task at a time.
#[async_trait]
pub trait LiveFeed: Send + Sync {
	async fn connect(&self) -> Result<(), MonitorError>;

	/// Waits for the next event; `None` once the feed closed the connection
	async fn next_event(&self) -> Result<Option<FeedEvent>, MonitorError>;

	/// Raw hex of every transaction currently in the mempool
	async fn mempool_snapshot(&self) -> Result<Vec<String>, MonitorError>;

	/// Registers a watched item with the upstream feed
	async fn add_filter(&self, regex: &str, item: &str) -> Result<(), MonitorError>;

	/// Forgets every registered item so the next reload starts from scratch
	async fn clear_filters(&self);

	/// Token sent with the next connect
	async fn set_token(&self, token: String);

	async fn disconnect(&self) -> Result<(), MonitorError>;
}
