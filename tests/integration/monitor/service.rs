use chrono::Utc;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::{sync::Arc, time::Duration};
use tokio::sync::mpsc;

use chainstate_monitor::{
	models::{ClusterEvent, ClusterMessage, Destination, ProcessorKind},
	services::{
		cluster::{ClusterClient, MONITOR_CHANNEL},
		monitor::{Monitor, MonitorError, MonitorServices, MonitorState},
	},
	utils::tests::builders::config::MonitorConfigBuilder,
};

use crate::integration::mocks::{
	FeedServer, MockDestinationStore, MockMonitorHandler, HANDSHAKE_COMMANDS,
};

const P2PKH: &str = "76a914[0-9a-f]{40}88ac";
const WATCHED: &str = "76a9148fb4b6b4bd4bf5d3a47b0b9e6f2c0c7a9b16be4e88ac";
const OTHER: &str = "76a914000102030405060708090a0b0c0d0e0f1011121388ac";

fn transaction_paying(script: &str) -> String {
	format!("0100000001{}ffffffff01e8030000000000001976{}00000000", "22".repeat(36), &script[2..])
}

fn watched_destination() -> Destination {
	Destination {
		id: hex::encode(Sha256::digest(WATCHED.as_bytes())),
		address: "1E7ucTTWRTahCyViPhxSMor2pj4VGQdFMr".to_string(),
		locking_script: WATCHED.to_string(),
		pattern: P2PKH.to_string(),
		monitor: Some(Utc::now()),
		created_at: Utc::now(),
	}
}

fn store_with_watched() -> MockDestinationStore {
	let mut store = MockDestinationStore::new();
	store
		.expect_get_monitored_destinations()
		.returning(|_| Ok(vec![watched_destination()]));
	store
}

/// Handler forwarding every matched transaction into a channel
fn forwarding_handler() -> (MockMonitorHandler, mpsc::UnboundedReceiver<String>) {
	let (tx, rx) = mpsc::unbounded_channel();
	let mut handler = MockMonitorHandler::new();
	handler.expect_record_transaction().returning(move |tx_hex| {
		let _ = tx.send(tx_hex.to_string());
		Ok(())
	});
	(handler, rx)
}

async fn handshake(server: &mut FeedServer) -> Vec<Value> {
	let mut commands = Vec::new();
	for _ in 0..HANDSHAKE_COMMANDS {
		commands.push(server.next_command().await);
	}
	commands
}

async fn wait_for_state(monitor: &Monitor, state: MonitorState) {
	let mut states = monitor.subscribe_state();
	tokio::time::timeout(Duration::from_secs(5), states.wait_for(|s| *s == state))
		.await
		.expect("state not reached")
		.expect("monitor dropped");
}

async fn recv<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> Option<T> {
	tokio::time::timeout(Duration::from_secs(2), rx.recv())
		.await
		.ok()
		.flatten()
}

#[tokio::test]
async fn test_session_forwards_matches_and_headers() {
	let mut server = FeedServer::start().await;
	let config = MonitorConfigBuilder::new().feed_url(&server.url).build();

	let (mut handler, mut matches) = forwarding_handler();
	let (header_tx, mut headers) = mpsc::unbounded_channel();
	handler.expect_record_block_header().returning(move |header| {
		let _ = header_tx.send(header.height);
		Ok(())
	});

	let monitor = Monitor::from_config(
		config,
		0,
		MonitorServices {
			destinations: Some(Arc::new(store_with_watched())),
			..Default::default()
		},
	)
	.unwrap();
	monitor.start(Arc::new(handler)).await.unwrap();
	assert_eq!(monitor.state(), MonitorState::Processing);
	assert!(monitor.is_connected());

	let commands = handshake(&mut server).await;
	assert!(commands[0]["connect"].is_object());
	assert_eq!(commands[1]["subscribe"]["channel"], "mempool");
	assert_eq!(commands[2]["subscribe"]["channel"], "block_headers");

	let replayed = server.next_command().await;
	assert_eq!(replayed["publish"]["channel"], "add_filter");
	assert_eq!(replayed["publish"]["data"], json!({ "filter": P2PKH, "hash": WATCHED }));

	server.push_transaction(&transaction_paying(OTHER));
	server.push_transaction(&transaction_paying(WATCHED));
	server.push_block_header("00000000000000000a1b", 800_001);

	assert_eq!(recv(&mut matches).await, Some(transaction_paying(WATCHED)));
	assert_eq!(recv(&mut headers).await, Some(800_001));

	monitor.stop().await.unwrap();
	assert_eq!(monitor.state(), MonitorState::Stopped);
	assert!(recv(&mut matches).await.is_none());
}

#[tokio::test]
async fn test_reconnects_and_replays_filters_after_drop() {
	let mut server = FeedServer::start().await;
	let config = MonitorConfigBuilder::new()
		.feed_url(&server.url)
		.processor(ProcessorKind::Regex)
		.max_reconnect_attempts(3)
		.build();
	let (handler, mut matches) = forwarding_handler();

	let monitor = Monitor::from_config(
		config,
		0,
		MonitorServices {
			destinations: Some(Arc::new(store_with_watched())),
			..Default::default()
		},
	)
	.unwrap();
	monitor.start(Arc::new(handler)).await.unwrap();
	assert_eq!(recv(&mut server.connections).await, Some(1));
	handshake(&mut server).await;
	server.next_command().await;

	server.drop_client();
	assert_eq!(recv(&mut server.connections).await, Some(2));

	let commands = handshake(&mut server).await;
	assert!(commands[0]["connect"].is_object());
	let replayed = server.next_command().await;
	assert_eq!(replayed["publish"]["data"]["hash"], WATCHED);
	wait_for_state(&monitor, MonitorState::Processing).await;

	server.push_transaction(&transaction_paying(WATCHED));
	assert_eq!(recv(&mut matches).await, Some(transaction_paying(WATCHED)));

	monitor.stop().await.unwrap();
}

#[tokio::test]
async fn test_mempool_pass_on_connect() {
	let mut feed = FeedServer::start().await;
	let mut api = mockito::Server::new_async().await;
	let ids = api
		.mock("GET", "/mempool/raw")
		.with_status(200)
		.with_body(json!(["aa", "bb"]).to_string())
		.create_async()
		.await;
	let raw = api
		.mock("POST", "/txs/hex")
		.with_status(200)
		.with_body(
			json!([
				{ "txid": "aa", "hex": transaction_paying(WATCHED) },
				{ "txid": "bb", "hex": transaction_paying(OTHER) }
			])
			.to_string(),
		)
		.create_async()
		.await;

	let config = MonitorConfigBuilder::new()
		.feed_url(&feed.url)
		.api_url(&api.url())
		.process_mempool_on_connect(true)
		.build();
	let (handler, mut matches) = forwarding_handler();

	let monitor = Monitor::from_config(
		config,
		0,
		MonitorServices {
			destinations: Some(Arc::new(store_with_watched())),
			..Default::default()
		},
	)
	.unwrap();
	monitor.start(Arc::new(handler)).await.unwrap();
	handshake(&mut feed).await;

	assert_eq!(recv(&mut matches).await, Some(transaction_paying(WATCHED)));
	ids.assert_async().await;
	raw.assert_async().await;

	assert_eq!(monitor.process_mempool().await.unwrap(), 1);
	monitor.stop().await.unwrap();
}

#[tokio::test]
async fn test_add_registers_saves_and_announces() {
	let mut server = FeedServer::start().await;
	let config = MonitorConfigBuilder::new()
		.feed_url(&server.url)
		.load_monitored_destinations(false)
		.save_destinations(true)
		.build();

	let mut store = MockDestinationStore::new();
	store.expect_get_monitored_destinations().never();
	store
		.expect_save_destination()
		.withf(|destination| {
			destination.locking_script == WATCHED
				&& destination.pattern == P2PKH
				&& destination.id == hex::encode(Sha256::digest(WATCHED.as_bytes()))
		})
		.times(1)
		.returning(|_| Ok(()));

	let cluster = ClusterClient::memory("add_test_");
	let (tap_tx, mut tap) = mpsc::unbounded_channel::<String>();
	let _tap = cluster.subscribe(MONITOR_CHANNEL, Arc::new(tap_tx)).await.unwrap();

	let monitor = Monitor::from_config(
		config,
		0,
		MonitorServices {
			destinations: Some(Arc::new(store)),
			cluster: Some(cluster),
			notifications: None,
		},
	)
	.unwrap();
	monitor.start(Arc::new(MockMonitorHandler::new())).await.unwrap();
	handshake(&mut server).await;

	let claimed = ClusterMessage::from_payload(&recv(&mut tap).await.unwrap()).unwrap();
	assert_eq!(claimed.event, ClusterEvent::ConnectionClaimed);
	assert_eq!(claimed.origin, monitor.instance_id());

	monitor.add(P2PKH, WATCHED).await.unwrap();

	let command = server.next_command().await;
	assert_eq!(command["publish"]["data"]["hash"], WATCHED);

	let added = ClusterMessage::from_payload(&recv(&mut tap).await.unwrap()).unwrap();
	assert_eq!(
		added.event,
		ClusterEvent::FilterAdded {
			regex: P2PKH.to_string(),
			item: WATCHED.to_string()
		}
	);
	let hash = ClusterMessage::from_payload(&recv(&mut tap).await.unwrap()).unwrap();
	assert_eq!(
		hash.event,
		ClusterEvent::FilterHash {
			hash: monitor.filter_hash().await
		}
	);

	monitor.stop().await.unwrap();
	let released = ClusterMessage::from_payload(&recv(&mut tap).await.unwrap()).unwrap();
	assert_eq!(released.event, ClusterEvent::ConnectionReleased);
}

#[tokio::test]
async fn test_unreachable_feed_fails_start() {
	let config = MonitorConfigBuilder::new()
		.feed_url("ws://127.0.0.1:1")
		.load_monitored_destinations(false)
		.max_reconnect_attempts(1)
		.build();
	let monitor = Monitor::from_config(config, 0, MonitorServices::default()).unwrap();

	let error = monitor
		.start(Arc::new(MockMonitorHandler::new()))
		.await
		.unwrap_err();
	assert!(matches!(error, MonitorError::Fatal(_)));
	assert_eq!(monitor.state(), MonitorState::Stopped);

	// Nothing was started, so there is nothing to wait for or stop
	monitor.wait().await.unwrap();
	monitor.stop().await.unwrap();
}
