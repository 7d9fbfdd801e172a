//! Mock implementations of the monitor collaborators.
//!
//! - [`MockMonitorHandler`]: receives matched transactions and block headers
//! - [`MockDestinationStore`]: destination persistence
//! - [`MockNotifier`]: notification delivery
//! - [`FeedServer`]: local websocket server speaking the live feed protocol

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use mockall::mock;
use serde_json::Value;
use tokio::{net::TcpListener, sync::mpsc, task::JoinHandle};
use tokio_tungstenite::{accept_async, tungstenite::Message};

use chainstate_monitor::{
	models::{BlockHeader, Destination},
	repositories::{DestinationStore, RepositoryError},
	services::{
		monitor::{MonitorError, MonitorHandler},
		notification::{EventType, NotificationError, Notifier},
	},
};

mock! {
	pub MonitorHandler {}

	#[async_trait]
	impl MonitorHandler for MonitorHandler {
		async fn record_transaction(&self, tx_hex: &str) -> Result<(), MonitorError>;
		async fn record_block_header(&self, header: &BlockHeader) -> Result<(), MonitorError>;
	}
}

mock! {
	pub DestinationStore {}

	#[async_trait]
	impl DestinationStore for DestinationStore {
		async fn get_monitored_destinations(
			&self,
			since: DateTime<Utc>,
		) -> Result<Vec<Destination>, RepositoryError>;
		async fn save_destination(&self, destination: Destination) -> Result<(), RepositoryError>;
	}
}

mock! {
	pub Notifier {}

	#[async_trait]
	impl Notifier for Notifier {
		async fn notify(
			&self,
			model_name: &str,
			event: EventType,
			model: &Value,
			id: &str,
		) -> Result<(), NotificationError>;
	}
}

/// Number of commands a client sends right after the handshake
pub const HANDSHAKE_COMMANDS: usize = 3;

/// Local live feed accepting connections one after another
///
/// Every command a client sends is forwarded to `commands`. Text pushed into
/// `frames` goes to the currently connected client; `None` drops that client.
pub struct FeedServer {
	pub url: String,
	pub commands: mpsc::UnboundedReceiver<Value>,
	pub frames: mpsc::UnboundedSender<Option<String>>,
	pub connections: mpsc::UnboundedReceiver<usize>,
	task: JoinHandle<()>,
}

impl FeedServer {
	pub async fn start() -> Self {
		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let url = format!("ws://{}", listener.local_addr().unwrap());
		let (commands_tx, commands) = mpsc::unbounded_channel();
		let (frames, mut frames_rx) = mpsc::unbounded_channel::<Option<String>>();
		let (connections_tx, connections) = mpsc::unbounded_channel();

		let task = tokio::spawn(async move {
			let mut accepted = 0;
			while let Ok((stream, _)) = listener.accept().await {
				let Ok(ws) = accept_async(stream).await else {
					continue;
				};
				accepted += 1;
				let _ = connections_tx.send(accepted);
				let (mut sink, mut source) = ws.split();

				loop {
					tokio::select! {
						inbound = source.next() => match inbound {
							Some(Ok(Message::Text(text))) => {
								if let Ok(value) = serde_json::from_str::<Value>(text.as_str()) {
									let _ = commands_tx.send(value);
								}
							}
							Some(Ok(_)) => {}
							_ => break,
						},
						outbound = frames_rx.recv() => match outbound {
							Some(Some(text)) => {
								if sink.send(Message::text(text)).await.is_err() {
									break;
								}
							}
							Some(None) => {
								let _ = sink.close().await;
								break;
							}
							None => return,
						},
					}
				}
			}
		});

		Self {
			url,
			commands,
			frames,
			connections,
			task,
		}
	}

	/// Pushes a mempool publication to the connected client
	pub fn push_transaction(&self, hex: &str) {
		let frame = serde_json::json!({
			"push": { "channel": "mempool", "pub": { "data": { "hex": hex } } }
		});
		let _ = self.frames.send(Some(frame.to_string()));
	}

	/// Pushes a block header publication to the connected client
	pub fn push_block_header(&self, hash: &str, height: u64) {
		let frame = serde_json::json!({
			"push": { "channel": "block_headers", "pub": { "data": { "hash": hash, "height": height } } }
		});
		let _ = self.frames.send(Some(frame.to_string()));
	}

	/// Drops the connected client
	pub fn drop_client(&self) {
		let _ = self.frames.send(None);
	}

	/// Waits for the next command sent by a client
	pub async fn next_command(&mut self) -> Value {
		tokio::time::timeout(std::time::Duration::from_secs(5), self.commands.recv())
			.await
			.expect("no command from the client")
			.expect("feed server stopped")
	}
}

impl Drop for FeedServer {
	fn drop(&mut self) {
		self.task.abort();
	}
}
