//! Live feed monitoring.
//!
//! - `service`: the monitor state machine and its cluster sync
//! - `feed`: the live feed contract
//! - `ws_feed`: websocket implementation of the feed
//! - `handler`: callbacks receiving matches and block headers

mod error;
mod feed;
mod handler;
mod service;
mod state;
mod ws_feed;

pub use error::MonitorError;
pub use feed::{FeedEvent, LiveFeed};
pub use handler::{LoggingHandler, MonitorHandler};
pub use service::{Monitor, MonitorServices};
pub use state::MonitorState;
pub use ws_feed::{
	WsConfig, WsFeed, ADD_FILTER_CHANNEL, BLOCK_HEADERS_CHANNEL, MEMPOOL_CHANNEL,
};
