//! Websocket live feed.
//!
//! Speaks the JSON command protocol of the mempool socket: a `connect` command
//! carrying the auth token, one `subscribe` per channel, and `publish` on the
//! `add_filter` channel to register watched items. Publications arrive as `push`
//! frames, several per websocket message separated by newlines. An empty object is
//! a ping and is answered with an empty object.

use async_trait::async_trait;
use futures_util::{
	stream::{SplitSink, SplitStream},
	SinkExt, StreamExt,
};
use serde_json::{json, Value};
use std::{
	collections::{HashSet, VecDeque},
	sync::atomic::{AtomicU64, Ordering},
	time::Duration,
};
use tokio::{
	net::TcpStream,
	sync::{Mutex, RwLock},
	time::timeout,
};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::{
	models::{BlockHeader, EndpointUrl, MonitorConfig, ProviderConfig, ProviderKind},
	services::{
		blockchain::WhatsOnChainProvider,
		monitor::{FeedEvent, LiveFeed, MonitorError},
	},
};

pub const MEMPOOL_CHANNEL: &str = "mempool";
pub const BLOCK_HEADERS_CHANNEL: &str = "block_headers";
pub const ADD_FILTER_CHANNEL: &str = "add_filter";
const CLIENT_NAME: &str = "chainstate-monitor";
const DEFAULT_MAX_FILTERS: usize = 100_000;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Websocket settings of the live feed
#[derive(Clone, Debug)]
pub struct WsConfig {
	/// How long to wait for the handshake
	pub connection_timeout: Duration,
	/// How long to wait for an outbound command to be written
	pub message_timeout: Duration,
	/// A connection with no inbound frame for this long is considered dead
	pub idle_timeout: Duration,
	/// Most items kept for replay; the oldest are forgotten first
	pub max_filters: usize,
}

impl Default for WsConfig {
	fn default() -> Self {
		Self {
			connection_timeout: Duration::from_secs(10),
			message_timeout: Duration::from_secs(5),
			idle_timeout: Duration::from_secs(60),
			max_filters: DEFAULT_MAX_FILTERS,
		}
	}
}

impl WsConfig {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn from_monitor_config(config: &MonitorConfig) -> Self {
		Self::default()
			.with_connection_timeout(config.connection_timeout())
			.with_max_filters(config.max_number_of_destinations)
	}

	pub fn with_connection_timeout(mut self, connection_timeout: Duration) -> Self {
		self.connection_timeout = connection_timeout;
		self
	}

	pub fn with_message_timeout(mut self, message_timeout: Duration) -> Self {
		self.message_timeout = message_timeout;
		self
	}

	pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
		self.idle_timeout = idle_timeout;
		self
	}

	pub fn with_max_filters(mut self, max_filters: usize) -> Self {
		self.max_filters = max_filters.max(1);
		self
	}
}

/// Items registered upstream, in registration order and without duplicates
#[derive(Debug, Default)]
struct FilterRegistry {
	seen: HashSet<(String, String)>,
	order: VecDeque<(String, String)>,
	capacity: usize,
}

impl FilterRegistry {
	fn with_capacity(capacity: usize) -> Self {
		Self {
			capacity,
			..Self::default()
		}
	}

	/// Returns false when the item was already registered
	fn insert(&mut self, regex: &str, item: &str) -> bool {
		let entry = (regex.to_string(), item.to_string());
		if !self.seen.insert(entry.clone()) {
			return false;
		}
		self.order.push_back(entry);
		while self.order.len() > self.capacity {
			if let Some(oldest) = self.order.pop_front() {
				self.seen.remove(&oldest);
			}
		}
		true
	}

	fn clear(&mut self) {
		self.seen.clear();
		self.order.clear();
	}

	fn len(&self) -> usize {
		self.order.len()
	}

	fn entries(&self) -> Vec<(String, String)> {
		self.order.iter().cloned().collect()
	}
}

/// A parsed line of an inbound websocket message
#[derive(Debug, PartialEq, Eq)]
enum Frame {
	Ping,
	Event(FeedEvent),
	/// Command reply or publication on a channel we do not handle
	Ignored,
}

fn parse_line(line: &str) -> Result<Frame, MonitorError> {
	let value: Value = serde_json::from_str(line)
		.map_err(|e| MonitorError::feed_error(format!("unreadable frame: {}", e)))?;

	if value.as_object().is_some_and(|object| object.is_empty()) {
		return Ok(Frame::Ping);
	}
	if let Some(error) = value.get("error") {
		warn!("feed replied with error: {}", error);
		return Ok(Frame::Ignored);
	}

	let Some(push) = value.get("push") else {
		return Ok(Frame::Ignored);
	};
	let channel = push.get("channel").and_then(Value::as_str).unwrap_or_default();
	let Some(data) = push.get("pub").and_then(|publication| publication.get("data")) else {
		return Ok(Frame::Ignored);
	};

	match channel {
		MEMPOOL_CHANNEL => {
			let bytes = serde_json::to_vec(data)
				.map_err(|e| MonitorError::feed_error(e.to_string()))?;
			Ok(Frame::Event(FeedEvent::Transaction(bytes)))
		}
		BLOCK_HEADERS_CHANNEL => {
			let header: BlockHeader = serde_json::from_value(data.clone())
				.map_err(|e| MonitorError::feed_error(format!("invalid block header: {}", e)))?;
			Ok(Frame::Event(FeedEvent::BlockHeader(header)))
		}
		other => {
			debug!(channel = other, "ignoring publication");
			Ok(Frame::Ignored)
		}
	}
}

/// Live feed over a websocket, with mempool snapshots served by a REST provider
pub struct WsFeed {
	url: String,
	config: WsConfig,
	token: RwLock<Option<String>>,
	sink: Mutex<Option<SplitSink<WsStream, Message>>>,
	source: Mutex<Option<SplitStream<WsStream>>>,
	pending: Mutex<VecDeque<FeedEvent>>,
	/// Items registered upstream, replayed on every connect
	filters: Mutex<FilterRegistry>,
	snapshot: Option<WhatsOnChainProvider>,
	command_id: AtomicU64,
}

impl WsFeed {
	pub fn new(
		url: impl Into<String>,
		config: WsConfig,
		snapshot: Option<WhatsOnChainProvider>,
	) -> Self {
		Self {
			url: url.into(),
			filters: Mutex::new(FilterRegistry::with_capacity(config.max_filters)),
			config,
			token: RwLock::new(None),
			sink: Mutex::new(None),
			source: Mutex::new(None),
			pending: Mutex::new(VecDeque::new()),
			snapshot,
			command_id: AtomicU64::new(1),
		}
	}

	/// Builds the feed described by the monitor configuration
	///
	/// Mempool snapshots are fetched from `api_url` through a WhatsOnChain adapter.
	pub fn from_monitor_config(
		config: &MonitorConfig,
		http_max_retries: u32,
	) -> Result<Self, MonitorError> {
		let snapshot_provider = ProviderConfig {
			name: "mempool-snapshot".to_string(),
			kind: ProviderKind::WhatsOnChain,
			urls: vec![EndpointUrl {
				url: config.api_url.clone(),
				weight: 100,
			}],
			api_key: None,
			enabled: true,
			priority: 0,
			broadcast: Some(false),
			query: Some(false),
			fee_quotes: Some(false),
		};
		let snapshot = WhatsOnChainProvider::new(&snapshot_provider, http_max_retries)
			.map_err(|e| MonitorError::feed_error(e.to_string()))?;

		Ok(Self {
			token: RwLock::new(config.auth_token.clone()),
			..Self::new(
				config.feed_url.clone(),
				WsConfig::from_monitor_config(config),
				Some(snapshot),
			)
		})
	}

	pub fn url(&self) -> &str {
		&self.url
	}

	fn command(&self, body: Value) -> Message {
		let mut command = json!({ "id": self.command_id.fetch_add(1, Ordering::SeqCst) });
		if let (Some(command), Some(body)) = (command.as_object_mut(), body.as_object()) {
			command.extend(body.clone());
		}
		Message::text(command.to_string())
	}

	async fn send(
		&self,
		sink: &mut SplitSink<WsStream, Message>,
		message: Message,
	) -> Result<(), MonitorError> {
		timeout(self.config.message_timeout, sink.send(message))
			.await
			.map_err(|_| MonitorError::connection_error("timed out writing to the feed"))??;
		Ok(())
	}

	fn add_filter_command(&self, regex: &str, item: &str) -> Message {
		self.command(json!({
			"publish": {
				"channel": ADD_FILTER_CHANNEL,
				"data": { "filter": regex, "hash": item }
			}
		}))
	}
}

#[async_trait]
impl LiveFeed for WsFeed {
	async fn connect(&self) -> Result<(), MonitorError> {
		let (stream, _) = timeout(self.config.connection_timeout, connect_async(self.url.as_str()))
			.await
			.map_err(|_| {
				MonitorError::connection_error(format!("timed out connecting to {}", self.url))
			})??;
		let (mut sink, source) = stream.split();

		let token = self.token.read().await.clone();
		let connect = self.command(json!({
			"connect": { "token": token.unwrap_or_default(), "name": CLIENT_NAME }
		}));
		self.send(&mut sink, connect).await?;
		for channel in [MEMPOOL_CHANNEL, BLOCK_HEADERS_CHANNEL] {
			let subscribe = self.command(json!({ "subscribe": { "channel": channel } }));
			self.send(&mut sink, subscribe).await?;
		}

		let filters = self.filters.lock().await.entries();
		for (regex, item) in &filters {
			self.send(&mut sink, self.add_filter_command(regex, item)).await?;
		}

		self.pending.lock().await.clear();
		*self.sink.lock().await = Some(sink);
		*self.source.lock().await = Some(source);
		info!(url = %self.url, filters = filters.len(), "connected to live feed");
		Ok(())
	}

	async fn next_event(&self) -> Result<Option<FeedEvent>, MonitorError> {
		loop {
			if let Some(event) = self.pending.lock().await.pop_front() {
				return Ok(Some(event));
			}

			let message = {
				let mut source = self.source.lock().await;
				let stream = source
					.as_mut()
					.ok_or_else(|| MonitorError::connection_error("feed is not connected"))?;
				match timeout(self.config.idle_timeout, stream.next()).await {
					Err(_) => {
						return Err(MonitorError::connection_error(format!(
							"no frame from the feed for {:?}",
							self.config.idle_timeout
						)))
					}
					Ok(None) => return Ok(None),
					Ok(Some(message)) => message?,
				}
			};

			let text = match message {
				Message::Text(text) => text.as_str().to_string(),
				Message::Binary(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
				Message::Close(frame) => {
					debug!(?frame, "feed closed the connection");
					return Ok(None);
				}
				_ => continue,
			};

			let mut events = Vec::new();
			for line in text.lines().filter(|line| !line.trim().is_empty()) {
				match parse_line(line) {
					Ok(Frame::Ping) => {
						if let Some(sink) = self.sink.lock().await.as_mut() {
							self.send(sink, Message::text("{}")).await?;
						}
					}
					Ok(Frame::Event(event)) => events.push(event),
					Ok(Frame::Ignored) => {}
					Err(error) => debug!("skipping frame: {}", error),
				}
			}
			self.pending.lock().await.extend(events);
		}
	}

	async fn mempool_snapshot(&self) -> Result<Vec<String>, MonitorError> {
		let provider = self
			.snapshot
			.as_ref()
			.ok_or_else(|| MonitorError::feed_error("no mempool snapshot provider configured"))?;

		let ids = provider
			.mempool_transaction_ids()
			.await
			.map_err(|e| MonitorError::feed_error(e.to_string()))?;
		let transactions = provider
			.raw_transactions(&ids)
			.await
			.map_err(|e| MonitorError::feed_error(e.to_string()))?;
		Ok(transactions.into_iter().map(|(_, hex)| hex).collect())
	}

	async fn add_filter(&self, regex: &str, item: &str) -> Result<(), MonitorError> {
		if !self.filters.lock().await.insert(regex, item) {
			return Ok(());
		}

		let mut sink = self.sink.lock().await;
		match sink.as_mut() {
			Some(sink) => self.send(sink, self.add_filter_command(regex, item)).await,
			// Replayed on the next connect
			None => Ok(()),
		}
	}

	async fn clear_filters(&self) {
		self.filters.lock().await.clear();
	}

	async fn set_token(&self, token: String) {
		*self.token.write().await = Some(token);
	}

	async fn disconnect(&self) -> Result<(), MonitorError> {
		let sink = self.sink.lock().await.take();
		self.source.lock().await.take();
		self.pending.lock().await.clear();

		if let Some(mut sink) = sink {
			let _ = timeout(self.config.message_timeout, sink.send(Message::Close(None))).await;
			let _ = timeout(self.config.message_timeout, sink.close()).await;
			info!(url = %self.url, "disconnected from live feed");
		}
		Ok(())
	}
}
