use std::time::{Duration, Instant};

use chainstate_monitor::{
	models::{ProviderCapabilities, RequiredIn},
	services::blockchain::{ChainRacer, ChainstateError, ProviderError},
	utils::tests::builders::transaction::TransactionInfoBuilder,
};

use crate::integration::mocks::{
	as_providers, BroadcastOutcome, ScriptedProvider, TX_HEX, TX_ID,
};

const QUERY_ONLY: ProviderCapabilities = ProviderCapabilities {
	broadcast: false,
	query: true,
	fee_quotes: false,
	live_feed: false,
};

#[tokio::test]
async fn test_broadcast_returns_first_acceptance() {
	let slow = ScriptedProvider::new("slow").delay_ms(300).shared();
	let fast = ScriptedProvider::new("fast").delay_ms(10).shared();
	let racer = ChainRacer::new(as_providers(&[slow.clone(), fast.clone()]));

	let result = racer
		.broadcast(TX_ID, TX_HEX, Duration::from_secs(2))
		.await
		.unwrap();

	assert_eq!(result.provider, "fast");
	assert!(!result.already_known);
	assert_eq!(slow.calls(), 1);
	assert_eq!(fast.calls(), 1);
}

#[tokio::test]
async fn test_broadcast_already_known_counts_as_accepted() {
	let known = ScriptedProvider::new("known")
		.broadcasts(BroadcastOutcome::AlreadyKnown)
		.shared();
	let racer = ChainRacer::new(as_providers(&[known]));

	let result = racer
		.broadcast(TX_ID, TX_HEX, Duration::from_secs(1))
		.await
		.unwrap();
	assert!(result.already_known);
	assert_eq!(result.tx_id, TX_ID);
}

#[tokio::test]
async fn test_broadcast_failure_skipped_for_later_success() {
	let failing = ScriptedProvider::new("failing")
		.broadcasts(BroadcastOutcome::Failed(ProviderError::Network("refused".into())))
		.shared();
	let accepting = ScriptedProvider::new("accepting").delay_ms(50).shared();
	let racer = ChainRacer::new(as_providers(&[failing, accepting]));

	let result = racer
		.broadcast(TX_ID, TX_HEX, Duration::from_secs(1))
		.await
		.unwrap();
	assert_eq!(result.provider, "accepting");
}

#[tokio::test]
async fn test_broadcast_rejected_everywhere_is_validation_error() {
	let a = ScriptedProvider::new("a")
		.broadcasts(BroadcastOutcome::Failed(ProviderError::InvalidTransaction(
			"bad-txns-inputs-missingorspent".into(),
		)))
		.shared();
	let b = ScriptedProvider::new("b")
		.broadcasts(BroadcastOutcome::Failed(ProviderError::Network("down".into())))
		.shared();
	let racer = ChainRacer::new(as_providers(&[a, b]));

	let error = racer
		.broadcast(TX_ID, TX_HEX, Duration::from_secs(1))
		.await
		.unwrap_err();
	assert!(matches!(error, ChainstateError::Validation(ref msg) if msg.contains("missingorspent")));
}

#[tokio::test]
async fn test_broadcast_all_network_failures_aggregate() {
	let a = ScriptedProvider::new("a")
		.broadcasts(BroadcastOutcome::Failed(ProviderError::Network("down".into())))
		.shared();
	let b = ScriptedProvider::new("b")
		.broadcasts(BroadcastOutcome::Failed(ProviderError::Network("reset".into())))
		.shared();
	let racer = ChainRacer::new(as_providers(&[a, b]));

	match racer.broadcast(TX_ID, TX_HEX, Duration::from_secs(1)).await {
		Err(ChainstateError::Provider(msg)) => {
			assert!(msg.contains("a: "));
			assert!(msg.contains("b: "));
		}
		other => panic!("unexpected result: {:?}", other),
	}
}

#[tokio::test]
async fn test_broadcast_times_out() {
	let stuck = ScriptedProvider::new("stuck").delay_ms(5_000).shared();
	let racer = ChainRacer::new(as_providers(&[stuck]));

	let started = Instant::now();
	let error = racer
		.broadcast(TX_ID, TX_HEX, Duration::from_millis(100))
		.await
		.unwrap_err();
	assert!(matches!(error, ChainstateError::Timeout(_)));
	assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn test_invalid_input_never_reaches_providers() {
	let provider = ScriptedProvider::new("a").shared();
	let racer = ChainRacer::new(as_providers(&[provider.clone()]));

	let error = racer
		.broadcast("not-a-txid", TX_HEX, Duration::from_secs(1))
		.await
		.unwrap_err();
	assert!(matches!(error, ChainstateError::Validation(_)));

	let error = racer
		.broadcast(TX_ID, "zz", Duration::from_secs(1))
		.await
		.unwrap_err();
	assert!(matches!(error, ChainstateError::Validation(_)));

	let error = racer
		.query_transaction_fastest("", RequiredIn::Mempool, Duration::from_secs(1))
		.await
		.unwrap_err();
	assert!(matches!(error, ChainstateError::Validation(_)));

	assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_query_walks_providers_in_priority_order() {
	let second = ScriptedProvider::new("second")
		.priority(2)
		.finds(TransactionInfoBuilder::new().id(TX_ID).mined(100, 3).build())
		.shared();
	let first = ScriptedProvider::new("first")
		.priority(1)
		.fails_query(ProviderError::NotFound)
		.shared();
	let unused = ScriptedProvider::new("unused")
		.priority(3)
		.finds(TransactionInfoBuilder::new().id(TX_ID).build())
		.shared();
	let racer = ChainRacer::new(as_providers(&[second.clone(), unused.clone(), first.clone()]));

	let info = racer
		.query_transaction(TX_ID, RequiredIn::OnChain, Duration::from_secs(1))
		.await
		.unwrap();

	assert_eq!(info.provider, "second");
	assert_eq!(first.calls(), 1);
	assert_eq!(second.calls(), 1);
	assert_eq!(unused.calls(), 0);
}

#[tokio::test]
async fn test_query_unsatisfied_when_only_in_mempool() {
	let a = ScriptedProvider::new("a")
		.finds(TransactionInfoBuilder::new().id(TX_ID).build())
		.shared();
	let b = ScriptedProvider::new("b")
		.fails_query(ProviderError::NotFound)
		.shared();
	let racer = ChainRacer::new(as_providers(&[a, b]));

	let error = racer
		.query_transaction(TX_ID, RequiredIn::OnChain, Duration::from_secs(1))
		.await
		.unwrap_err();
	assert!(matches!(error, ChainstateError::Unsatisfied(_)));

	let info = racer
		.query_transaction(TX_ID, RequiredIn::Mempool, Duration::from_secs(1))
		.await
		.unwrap();
	assert_eq!(info.provider, "a");
}

#[tokio::test]
async fn test_query_not_found_everywhere() {
	let a = ScriptedProvider::new("a").fails_query(ProviderError::NotFound).shared();
	let b = ScriptedProvider::new("b")
		.fails_query(ProviderError::Network("down".into()))
		.shared();
	let racer = ChainRacer::new(as_providers(&[a, b]));

	let error = racer
		.query_transaction(TX_ID, RequiredIn::Mempool, Duration::from_secs(1))
		.await
		.unwrap_err();
	assert!(matches!(error, ChainstateError::NotFound(_)));
}

#[tokio::test]
async fn test_merkle_proof_requirement() {
	let mined = ScriptedProvider::new("mined")
		.priority(1)
		.finds(TransactionInfoBuilder::new().id(TX_ID).mined(10, 1).build())
		.shared();
	let proven = ScriptedProvider::new("proven")
		.priority(2)
		.finds(
			TransactionInfoBuilder::new()
				.id(TX_ID)
				.mined(10, 1)
				.merkle_proof(true)
				.build(),
		)
		.shared();
	let racer = ChainRacer::new(as_providers(&[mined, proven]));

	let info = racer
		.query_transaction(TX_ID, RequiredIn::MerkleProof, Duration::from_secs(1))
		.await
		.unwrap();
	assert_eq!(info.provider, "proven");
	assert!(info.merkle_proof);
}

#[tokio::test]
async fn test_fastest_query_ignores_stalled_providers() {
	let a = ScriptedProvider::new("a")
		.capabilities(QUERY_ONLY)
		.delay_ms(10_000)
		.finds(TransactionInfoBuilder::new().id(TX_ID).mined(5, 1).build())
		.shared();
	let b = ScriptedProvider::new("b")
		.capabilities(QUERY_ONLY)
		.delay_ms(100)
		.finds(TransactionInfoBuilder::new().id(TX_ID).mined(5, 1).build())
		.shared();
	let c = ScriptedProvider::new("c")
		.capabilities(QUERY_ONLY)
		.delay_ms(10_000)
		.finds(TransactionInfoBuilder::new().id(TX_ID).mined(5, 1).build())
		.shared();
	let racer = ChainRacer::new(as_providers(&[a, b, c]));

	let started = Instant::now();
	let info = racer
		.query_transaction_fastest(TX_ID, RequiredIn::OnChain, Duration::from_secs(1))
		.await
		.unwrap();

	assert_eq!(info.provider, "b");
	assert!(started.elapsed() < Duration::from_millis(500));
}

#[tokio::test]
async fn test_fastest_query_skips_unsatisfying_answers() {
	let early = ScriptedProvider::new("early")
		.delay_ms(5)
		.finds(TransactionInfoBuilder::new().id(TX_ID).build())
		.shared();
	let late = ScriptedProvider::new("late")
		.delay_ms(80)
		.finds(TransactionInfoBuilder::new().id(TX_ID).mined(7, 2).build())
		.shared();
	let racer = ChainRacer::new(as_providers(&[early, late]));

	let info = racer
		.query_transaction_fastest(TX_ID, RequiredIn::OnChain, Duration::from_secs(1))
		.await
		.unwrap();
	assert_eq!(info.provider, "late");
}

#[tokio::test]
async fn test_fastest_query_times_out() {
	let a = ScriptedProvider::new("a").delay_ms(10_000).shared();
	let b = ScriptedProvider::new("b").delay_ms(10_000).shared();
	let racer = ChainRacer::new(as_providers(&[a, b]));

	let started = Instant::now();
	let error = racer
		.query_transaction_fastest(TX_ID, RequiredIn::Mempool, Duration::from_secs(1))
		.await
		.unwrap_err();

	assert!(matches!(error, ChainstateError::Timeout(_)));
	let elapsed = started.elapsed();
	assert!(elapsed >= Duration::from_millis(950));
	assert!(elapsed < Duration::from_secs(2));
}

#[tokio::test]
async fn test_no_capable_providers() {
	let broadcaster = ScriptedProvider::new("broadcaster")
		.capabilities(ProviderCapabilities {
			broadcast: true,
			query: false,
			fee_quotes: false,
			live_feed: false,
		})
		.shared();
	let racer = ChainRacer::new(as_providers(&[broadcaster]));

	let error = racer
		.query_transaction_fastest(TX_ID, RequiredIn::Mempool, Duration::from_secs(1))
		.await
		.unwrap_err();
	assert!(matches!(error, ChainstateError::Provider(_)));

	let error = racer
		.query_transaction(TX_ID, RequiredIn::Mempool, Duration::from_secs(1))
		.await
		.unwrap_err();
	assert!(matches!(error, ChainstateError::Provider(_)));
}
