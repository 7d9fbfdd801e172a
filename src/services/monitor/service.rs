//! Monitor service.
//!
//! Owns the live feed session: loads watched destinations, keeps one feed task
//! reading events through the filter processor, reconnects with bounded backoff and
//! mirrors filter mutations to the rest of the fleet over the cluster coordinator.

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use chrono::Utc;
use futures::future::join_all;
use sha2::{Digest, Sha256};
use std::{
	collections::{BTreeMap, HashMap},
	sync::Arc,
	time::Duration,
};
use tokio::{
	sync::{watch, Mutex, RwLock},
	task::JoinHandle,
};
use tracing::{debug, info, instrument, warn};

use crate::{
	models::{
		BlockHeader, ClusterEvent, ClusterMessage, Destination, MonitorConfig,
		CLUSTER_MESSAGE_VERSION,
	},
	repositories::DestinationStore,
	services::{
		cluster::{ClusterClient, ClusterError, MessageHandler, Subscription, MONITOR_CHANNEL},
		filter::{new_processor, MonitorProcessor},
		monitor::{
			FeedEvent, LiveFeed, MonitorError, MonitorHandler, MonitorState, WsFeed,
		},
		notification::{EventType, NotificationDispatcher},
	},
};

const DESTINATION_MODEL: &str = "destination";

/// Optional collaborators of a [`Monitor`]
#[derive(Default, Clone)]
pub struct MonitorServices {
	/// Source of watched destinations on start, and sink for new ones
	pub destinations: Option<Arc<dyn DestinationStore>>,
	pub cluster: Option<ClusterClient>,
	pub notifications: Option<Arc<NotificationDispatcher>>,
}

struct Shared {
	config: MonitorConfig,
	instance_id: String,
	feed: Arc<dyn LiveFeed>,
	processor: RwLock<Box<dyn MonitorProcessor>>,
	services: MonitorServices,
	state: watch::Sender<MonitorState>,
	handler: RwLock<Option<Arc<dyn MonitorHandler>>>,
	/// Instance currently holding the feed connection, as last announced
	owner: Mutex<Option<String>>,
	/// Last filter hash announced by each peer
	peer_hashes: Mutex<HashMap<String, String>>,
}

struct Session {
	shutdown: watch::Sender<bool>,
	task: Option<JoinHandle<Result<(), MonitorError>>>,
	subscription: Option<Subscription>,
}

/// Live feed monitor of one instance
pub struct Monitor {
	shared: Arc<Shared>,
	session: Mutex<Option<Session>>,
}

impl Monitor {
	pub fn new(
		config: MonitorConfig,
		feed: Arc<dyn LiveFeed>,
		processor: Box<dyn MonitorProcessor>,
		services: MonitorServices,
	) -> Self {
		let (state, _) = watch::channel(MonitorState::Stopped);
		Self {
			shared: Arc::new(Shared {
				config,
				instance_id: uuid::Uuid::new_v4().to_string(),
				feed,
				processor: RwLock::new(processor),
				services,
				state,
				handler: RwLock::new(None),
				owner: Mutex::new(None),
				peer_hashes: Mutex::new(HashMap::new()),
			}),
			session: Mutex::new(None),
		}
	}

	/// Builds a monitor on the websocket feed and processor named in `config`
	pub fn from_config(
		config: MonitorConfig,
		http_max_retries: u32,
		services: MonitorServices,
	) -> Result<Self, MonitorError> {
		let feed = WsFeed::from_monitor_config(&config, http_max_retries)?;
		let processor = new_processor(
			config.processor,
			config.max_number_of_destinations,
			config.false_positive_rate,
		);
		Ok(Self::new(config, Arc::new(feed), processor, services))
	}

	/// Id this instance publishes cluster messages under
	pub fn instance_id(&self) -> &str {
		&self.shared.instance_id
	}

	/// Loads destinations, connects the feed and starts processing events
	///
	/// Returns once the feed is connected and the optional mempool pass is done.
	/// Events are then handled on a background task until [`Monitor::stop`].
	#[instrument(skip_all, fields(instance = %self.shared.instance_id))]
	pub async fn start(&self, handler: Arc<dyn MonitorHandler>) -> Result<(), MonitorError> {
		let mut session = self.session.lock().await;
		if session.is_some() {
			return Err(MonitorError::invalid_state("monitor is already started"));
		}

		let shared = &self.shared;
		*shared.handler.write().await = Some(handler);

		let started = async {
			shared.load_destinations().await?;
			let subscription = shared.subscribe_cluster().await;
			shared.connect_with_retry().await?;
			Ok::<_, MonitorError>(subscription)
		}
		.await;

		let subscription = match started {
			Ok(subscription) => subscription,
			Err(error) => {
				*shared.handler.write().await = None;
				shared.set_state(MonitorState::Stopped);
				return Err(error);
			}
		};

		shared.on_connected().await;
		shared.publish(ClusterEvent::ConnectionClaimed).await;

		let (shutdown, shutdown_rx) = watch::channel(false);
		let task = tokio::spawn(run_feed(shared.clone(), shutdown_rx));
		*session = Some(Session {
			shutdown,
			task: Some(task),
			subscription,
		});
		info!("monitor started");
		Ok(())
	}

	/// Closes the feed connection; stopping a stopped monitor is a no-op
	#[instrument(skip_all, fields(instance = %self.shared.instance_id))]
	pub async fn stop(&self) -> Result<(), MonitorError> {
		let Some(mut session) = self.session.lock().await.take() else {
			self.shared.set_state(MonitorState::Stopped);
			return Ok(());
		};

		let _ = session.shutdown.send(true);
		if let Some(task) = session.task.take() {
			match task.await {
				Ok(Ok(())) => {}
				Ok(Err(error)) => debug!("feed task ended with: {}", error),
				Err(error) => warn!("feed task ended abnormally: {}", error),
			}
		}

		let disconnected = self.shared.feed.disconnect().await;

		let was_owner = {
			let mut owner = self.shared.owner.lock().await;
			let was_owner = owner.as_deref() == Some(self.shared.instance_id.as_str());
			if was_owner {
				*owner = None;
			}
			was_owner
		};
		if was_owner {
			self.shared.publish(ClusterEvent::ConnectionReleased).await;
		}

		if let Some(subscription) = session.subscription.take() {
			subscription.unsubscribe();
		}
		*self.shared.handler.write().await = None;
		self.shared.set_state(MonitorState::Stopped);
		info!("monitor stopped");
		disconnected
	}

	/// Waits until the feed task ends
	///
	/// Resolves with the fatal error once reconnection attempts are exhausted, or
	/// with `Ok` after [`Monitor::stop`].
	pub async fn wait(&self) -> Result<(), MonitorError> {
		let task = self
			.session
			.lock()
			.await
			.as_mut()
			.and_then(|session| session.task.take());
		match task {
			Some(task) => task
				.await
				.map_err(|e| MonitorError::fatal(format!("feed task failed: {}", e)))?,
			None => Ok(()),
		}
	}

	/// Runs every mempool transaction through the filter once
	///
	/// Returns the number of matches handed to the handler.
	pub async fn process_mempool(&self) -> Result<usize, MonitorError> {
		self.shared.process_mempool().await
	}

	/// Watches `item` under `regex` here and on every peer
	#[instrument(skip_all, fields(regex = %regex))]
	pub async fn add(&self, regex: &str, item: &str) -> Result<(), MonitorError> {
		let shared = &self.shared;
		let hash = {
			let mut processor = shared.processor.write().await;
			processor.add(regex, item)?;
			processor.get_hash()
		};

		if let Err(error) = shared.feed.add_filter(regex, item).await {
			warn!("could not register filter upstream: {}", error);
		}

		shared
			.publish(ClusterEvent::FilterAdded {
				regex: regex.to_string(),
				item: item.to_string(),
			})
			.await;
		shared.publish(ClusterEvent::FilterHash { hash }).await;

		if shared.config.save_destinations {
			shared.save_destination(regex, item).await?;
		}
		Ok(())
	}

	/// Marks the feed connection as established
	pub fn connected(&self) {
		self.shared.set_state(MonitorState::Connected);
	}

	/// Marks the feed connection as lost
	pub fn disconnected(&self) {
		self.shared.set_state(MonitorState::Disconnected);
	}

	pub fn is_connected(&self) -> bool {
		self.state().is_connected()
	}

	pub fn state(&self) -> MonitorState {
		*self.shared.state.borrow()
	}

	/// Receiver observing every state change
	pub fn subscribe_state(&self) -> watch::Receiver<MonitorState> {
		self.shared.state.subscribe()
	}

	pub fn get_false_positive_rate(&self) -> f64 {
		self.shared.config.false_positive_rate
	}

	pub fn get_max_number_of_destinations(&self) -> usize {
		self.shared.config.max_number_of_destinations
	}

	pub fn get_monitor_days(&self) -> u32 {
		self.shared.config.monitor_days
	}

	pub fn get_process_mempool_on_connect(&self) -> bool {
		self.shared.config.process_mempool_on_connect
	}

	pub fn load_monitored_destinations(&self) -> bool {
		self.shared.config.load_monitored_destinations
	}

	pub fn save_destinations(&self) -> bool {
		self.shared.config.save_destinations
	}

	pub fn processor(&self) -> &RwLock<Box<dyn MonitorProcessor>> {
		&self.shared.processor
	}

	pub async fn filter_hash(&self) -> String {
		self.shared.processor.read().await.get_hash()
	}

	/// Instance that last claimed the feed connection
	pub async fn connection_owner(&self) -> Option<String> {
		self.shared.owner.lock().await.clone()
	}

	/// Peers whose last announced filter hash differs from the local one
	pub async fn drifted_peers(&self) -> Vec<String> {
		let local = self.filter_hash().await;
		let mut peers: Vec<String> = self
			.shared
			.peer_hashes
			.lock()
			.await
			.iter()
			.filter(|(_, hash)| **hash != local)
			.map(|(peer, _)| peer.clone())
			.collect();
		peers.sort();
		peers
	}

	/// Token used on the next feed connect
	pub async fn set_token(&self, token: String) {
		self.shared.feed.set_token(token).await;
	}
}

impl Shared {
	fn set_state(&self, next: MonitorState) {
		let previous = self.state.send_replace(next);
		if previous != next {
			if !previous.can_transition_to(next) {
				warn!(from = %previous, to = %next, "unexpected monitor state change");
			}
			debug!(from = %previous, to = %next, "monitor state changed");
		}
	}

	/// Publishes to peers; coordinator failures only pause cross-instance sync
	async fn publish(&self, event: ClusterEvent) {
		let Some(cluster) = &self.services.cluster else {
			return;
		};
		let message = ClusterMessage::new(self.instance_id.clone(), event);
		if let Err(error) = cluster.publish_message(MONITOR_CHANNEL, &message).await {
			warn!("cluster sync paused, publish failed: {}", error);
		}
	}

	async fn subscribe_cluster(self: &Arc<Self>) -> Option<Subscription> {
		let cluster = self.services.cluster.as_ref()?;
		let handler = Arc::new(ClusterSync {
			shared: self.clone(),
		});
		match cluster.subscribe(MONITOR_CHANNEL, handler).await {
			Ok(subscription) => Some(subscription),
			Err(error) => {
				warn!("cluster sync unavailable, running standalone: {}", error);
				None
			}
		}
	}

	async fn load_destinations(&self) -> Result<usize, MonitorError> {
		if !self.config.load_monitored_destinations {
			return Ok(0);
		}
		let Some(store) = &self.services.destinations else {
			return Ok(0);
		};

		let since = Utc::now() - chrono::Duration::days(i64::from(self.config.monitor_days));
		let destinations = store.get_monitored_destinations(since).await?;
		let count = destinations.len();

		let mut by_pattern: BTreeMap<String, Vec<String>> = BTreeMap::new();
		for destination in destinations {
			by_pattern
				.entry(destination.pattern)
				.or_default()
				.push(destination.locking_script);
		}

		{
			let mut processor = self.processor.write().await;
			for (pattern, items) in &by_pattern {
				processor.reload(pattern, items)?;
			}
		}
		self.feed.clear_filters().await;
		for (pattern, items) in &by_pattern {
			for item in items {
				if let Err(error) = self.feed.add_filter(pattern, item).await {
					warn!("could not register filter upstream: {}", error);
				}
			}
		}

		info!(
			destinations = count,
			patterns = by_pattern.len(),
			"loaded monitored destinations"
		);
		Ok(count)
	}

	async fn save_destination(&self, regex: &str, item: &str) -> Result<(), MonitorError> {
		let Some(store) = &self.services.destinations else {
			return Ok(());
		};

		let now = Utc::now();
		let destination = Destination {
			id: hex::encode(Sha256::digest(item.as_bytes())),
			address: String::new(),
			locking_script: item.to_string(),
			pattern: regex.to_string(),
			monitor: Some(now),
			created_at: now,
		};
		store.save_destination(destination.clone()).await?;

		if let Some(notifications) = &self.services.notifications {
			match serde_json::to_value(&destination) {
				Ok(model) => {
					notifications.dispatch(DESTINATION_MODEL, EventType::Create, model, &destination.id);
				}
				Err(error) => warn!("could not serialize destination: {}", error),
			}
		}
		Ok(())
	}

	async fn connect_with_retry(&self) -> Result<(), MonitorError> {
		self.set_state(MonitorState::Connecting);

		let delay = self.config.reconnect_delay();
		let attempts = self.config.max_reconnect_attempts;
		let backoff = ExponentialBuilder::default()
			.with_min_delay(delay)
			.with_max_delay(delay.saturating_mul(16))
			.with_max_times(attempts)
			.with_jitter();

		let feed = self.feed.clone();
		let connected = (move || {
			let feed = feed.clone();
			async move { feed.connect().await }
		})
		.retry(backoff)
		.notify(|error: &MonitorError, wait: Duration| {
			warn!("feed connect failed, retrying in {:?}: {}", wait, error);
		})
		.await;

		connected.map_err(|error| {
			self.set_state(MonitorState::Disconnected);
			MonitorError::fatal(format!(
				"feed unreachable after {} retries: {}",
				attempts, error
			))
		})
	}

	/// Connected bookkeeping, then the optional mempool pass, then processing
	///
	/// Claiming the connection towards peers is left to the caller.
	async fn on_connected(&self) {
		self.set_state(MonitorState::Connected);
		*self.owner.lock().await = Some(self.instance_id.clone());

		if self.config.process_mempool_on_connect {
			if let Err(error) = self.process_mempool().await {
				warn!("mempool pass failed: {}", error);
			}
		}
		self.set_state(MonitorState::Processing);
	}

	async fn process_mempool(&self) -> Result<usize, MonitorError> {
		let handler = self
			.handler
			.read()
			.await
			.clone()
			.ok_or_else(|| MonitorError::invalid_state("monitor is not started"))?;

		let snapshot = self.feed.mempool_snapshot().await?;
		let matches: Vec<String> = {
			let processor = self.processor.read().await;
			snapshot
				.iter()
				.filter_map(|tx_hex| match processor.filter_transaction(tx_hex) {
					Ok(matched) => matched,
					Err(error) => {
						debug!("skipping mempool transaction: {}", error);
						None
					}
				})
				.collect()
		};

		let results = join_all(matches.iter().map(|tx_hex| handler.record_transaction(tx_hex))).await;
		for error in results.into_iter().filter_map(Result::err) {
			warn!("recording mempool match failed: {}", error);
		}

		info!(scanned = snapshot.len(), matched = matches.len(), "processed mempool");
		Ok(matches.len())
	}

	async fn handle_transaction(&self, data: &[u8]) {
		let matched = self
			.processor
			.read()
			.await
			.filter_transaction_publish_event(data);
		match matched {
			Ok(Some(tx_hex)) => {
				let Some(handler) = self.handler.read().await.clone() else {
					return;
				};
				tokio::spawn(async move {
					if let Err(error) = handler.record_transaction(&tx_hex).await {
						warn!("recording transaction failed: {}", error);
					}
				});
			}
			Ok(None) => {}
			Err(error) => debug!("skipping feed event: {}", error),
		}
	}

	async fn handle_block_header(&self, header: BlockHeader) {
		let Some(handler) = self.handler.read().await.clone() else {
			return;
		};
		tokio::spawn(async move {
			if let Err(error) = handler.record_block_header(&header).await {
				warn!(hash = %header.hash, "recording block header failed: {}", error);
			}
		});
	}

	async fn apply_cluster_message(&self, message: ClusterMessage) {
		if message.origin == self.instance_id {
			return;
		}
		if message.version > CLUSTER_MESSAGE_VERSION {
			warn!(
				version = message.version,
				origin = %message.origin,
				"ignoring cluster message from a newer version"
			);
			return;
		}

		let origin = message.origin;
		match message.event {
			ClusterEvent::FilterAdded { regex, item } => {
				if let Err(error) = self.processor.write().await.add(&regex, &item) {
					warn!(peer = %origin, "could not apply peer filter: {}", error);
					return;
				}
				if let Err(error) = self.feed.add_filter(&regex, &item).await {
					warn!("could not register filter upstream: {}", error);
				}
				debug!(peer = %origin, regex = %regex, "applied peer filter");
			}
			ClusterEvent::FilterHash { hash } => {
				let local = self.processor.read().await.get_hash();
				if local != hash {
					warn!(peer = %origin, local = %local, remote = %hash, "filter state drifted from peer");
				}
				self.peer_hashes.lock().await.insert(origin, hash);
			}
			ClusterEvent::ConnectionClaimed => {
				info!(peer = %origin, "peer claimed the feed connection");
				*self.owner.lock().await = Some(origin);
			}
			ClusterEvent::ConnectionReleased => {
				let mut owner = self.owner.lock().await;
				if owner.as_deref() == Some(origin.as_str()) {
					*owner = None;
				}
			}
		}
	}
}

/// Applies peer messages to the local state
struct ClusterSync {
	shared: Arc<Shared>,
}

#[async_trait]
impl MessageHandler for ClusterSync {
	async fn on_message(&self, _channel: &str, payload: &str) -> Result<(), ClusterError> {
		let message = ClusterMessage::from_payload(payload)?;
		self.shared.apply_cluster_message(message).await;
		Ok(())
	}
}

/// Feed task: reads events until shutdown, reconnecting on connection loss
async fn run_feed(
	shared: Arc<Shared>,
	mut shutdown: watch::Receiver<bool>,
) -> Result<(), MonitorError> {
	loop {
		let event = tokio::select! {
			_ = shutdown.changed() => return Ok(()),
			event = shared.feed.next_event() => event,
		};

		let reason = match event {
			Ok(Some(FeedEvent::Transaction(data))) => {
				shared.handle_transaction(&data).await;
				continue;
			}
			Ok(Some(FeedEvent::BlockHeader(header))) => {
				shared.handle_block_header(header).await;
				continue;
			}
			Ok(None) => "closed by the feed".to_string(),
			Err(error) => error.to_string(),
		};

		warn!("feed connection lost: {}", reason);
		shared.set_state(MonitorState::Disconnected);
		if let Err(error) = shared.feed.disconnect().await {
			debug!("cleanup after connection loss failed: {}", error);
		}

		let reconnected = tokio::select! {
			_ = shutdown.changed() => return Ok(()),
			result = shared.connect_with_retry() => result,
		};
		reconnected?;
		shared.on_connected().await;

		// The coordinator must never hold up event processing
		let announcer = shared.clone();
		tokio::spawn(async move {
			announcer.publish(ClusterEvent::ConnectionClaimed).await;
		});
	}
}
