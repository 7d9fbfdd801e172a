use std::{sync::Arc, time::Duration};
use tokio::sync::mpsc;

use chainstate_monitor::{
	models::{ClusterConfig, ClusterEvent, ClusterMessage, CoordinatorKind},
	services::cluster::{
		ClusterClient, ClusterError, MemoryPubSub, MessageHandler, PubSub, MONITOR_CHANNEL,
	},
};

async fn next_payload(rx: &mut mpsc::UnboundedReceiver<String>) -> Option<String> {
	tokio::time::timeout(Duration::from_millis(500), rx.recv())
		.await
		.ok()
		.flatten()
}

#[tokio::test]
async fn test_instances_share_messages_through_backend() {
	let backend = MemoryPubSub::new();
	let shared: Arc<dyn PubSub> = Arc::new(backend.clone());
	let first = ClusterClient::with_backend(shared.clone(), CoordinatorKind::Memory, "fleet_");
	let second = ClusterClient::with_backend(shared, CoordinatorKind::Memory, "fleet_");

	let (tx, mut rx) = mpsc::unbounded_channel::<String>();
	let handler: Arc<dyn MessageHandler> = Arc::new(tx);
	let _subscription = second.subscribe(MONITOR_CHANNEL, handler).await.unwrap();
	assert_eq!(backend.subscriber_count("fleet_monitor").await, 1);

	let message = ClusterMessage::new(
		"instance-a",
		ClusterEvent::FilterAdded {
			regex: "76a914".to_string(),
			item: "76a914aa".to_string(),
		},
	);
	first.publish_message(MONITOR_CHANNEL, &message).await.unwrap();

	let payload = next_payload(&mut rx).await.expect("message not delivered");
	assert_eq!(ClusterMessage::from_payload(&payload).unwrap(), message);
}

#[tokio::test]
async fn test_messages_arrive_in_publish_order() {
	let cluster = ClusterClient::memory("order_");
	let (tx, mut rx) = mpsc::unbounded_channel::<String>();
	let _subscription = cluster.subscribe("events", Arc::new(tx)).await.unwrap();

	for i in 0..20 {
		cluster.publish("events", &i.to_string()).await.unwrap();
	}
	for i in 0..20 {
		assert_eq!(next_payload(&mut rx).await, Some(i.to_string()));
	}
}

#[tokio::test]
async fn test_unsubscribe_stops_delivery() {
	let cluster = ClusterClient::memory("unsub_");
	let (tx, mut rx) = mpsc::unbounded_channel::<String>();
	let subscription = cluster.subscribe("events", Arc::new(tx)).await.unwrap();
	assert!(subscription.is_active());
	assert_eq!(subscription.channel(), "unsub_events");

	subscription.unsubscribe();
	tokio::time::sleep(Duration::from_millis(20)).await;
	cluster.publish("events", "late").await.unwrap();

	assert_eq!(next_payload(&mut rx).await, None);
}

#[tokio::test]
async fn test_memory_coordinator_from_config() {
	let config = ClusterConfig::default();
	let cluster = ClusterClient::new(&config).await.unwrap();
	assert_eq!(cluster.coordinator(), CoordinatorKind::Memory);
	assert_eq!(cluster.channel_name("monitor"), format!("{}monitor", config.prefix));
}

#[tokio::test]
async fn test_unreachable_redis_is_connectivity_failure() {
	let config = ClusterConfig {
		coordinator: CoordinatorKind::Redis,
		redis_url: Some("redis://127.0.0.1:1".to_string()),
		connect_timeout_ms: 300,
		..ClusterConfig::default()
	};

	match ClusterClient::new(&config).await {
		Err(error) => assert!(error.is_connectivity(), "unexpected error: {}", error),
		Ok(_) => panic!("connected to a closed port"),
	}
}

#[tokio::test]
async fn test_redis_without_url_is_unsupported() {
	let config = ClusterConfig {
		coordinator: CoordinatorKind::Redis,
		redis_url: None,
		..ClusterConfig::default()
	};

	assert!(matches!(
		ClusterClient::new(&config).await,
		Err(ClusterError::UnsupportedBackend(_))
	));
}
