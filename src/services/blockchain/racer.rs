//! Multi-provider racing for broadcast and query operations.
//!
//! One task is spawned per provider and per call. Results flow back over a channel
//! in arrival order; the first acceptable one wins. Tasks still running when the
//! call returns are left to finish on their own and their results are dropped.

use std::{sync::Arc, time::Duration};
use tokio::{sync::mpsc, time::Instant};
use tracing::{debug, instrument};

use crate::{
	models::{BroadcastResult, RequiredIn, TransactionInfo},
	services::blockchain::{ChainProvider, ChainstateError, ProviderError},
};

const TX_ID_LENGTH: usize = 64;

/// Rejects anything that is not a 32 byte hex transaction id
pub fn validate_tx_id(id: &str) -> Result<(), ChainstateError> {
	if id.len() != TX_ID_LENGTH || !id.bytes().all(|b| b.is_ascii_hexdigit()) {
		return Err(ChainstateError::validation(format!(
			"transaction id must be {} hex characters: {:?}",
			TX_ID_LENGTH, id
		)));
	}
	Ok(())
}

/// Rejects empty or non-hex raw transactions
pub fn validate_tx_hex(tx_hex: &str) -> Result<(), ChainstateError> {
	if tx_hex.is_empty() || hex::decode(tx_hex).is_err() {
		return Err(ChainstateError::validation("transaction hex is empty or not hex"));
	}
	Ok(())
}

/// What the racer learned from the providers that answered a query
#[derive(Debug, Default)]
struct QueryOutcome {
	/// Some provider found the transaction, but not in the required state
	unsatisfied: bool,
	not_found: bool,
	failures: Vec<(String, ProviderError)>,
}

impl QueryOutcome {
	fn record(&mut self, name: String, error: ProviderError) {
		if error == ProviderError::NotFound {
			self.not_found = true;
		}
		self.failures.push((name, error));
	}

	/// Every provider answered and none was acceptable
	fn exhausted(self, id: &str) -> ChainstateError {
		if self.unsatisfied {
			ChainstateError::unsatisfied(id)
		} else if self.not_found {
			ChainstateError::not_found(id)
		} else {
			ChainstateError::provider(&self.failures)
		}
	}

	/// The deadline passed before an acceptable answer arrived
	fn timed_out(self, id: &str, timeout: Duration) -> ChainstateError {
		if self.unsatisfied {
			ChainstateError::unsatisfied(id)
		} else {
			ChainstateError::timeout(format!("query of {} exceeded {:?}", id, timeout))
		}
	}
}

#[derive(Clone)]
pub struct ChainRacer {
	providers: Vec<Arc<dyn ChainProvider>>,
}

impl ChainRacer {
	pub fn new(providers: Vec<Arc<dyn ChainProvider>>) -> Self {
		Self { providers }
	}

	pub fn providers(&self) -> &[Arc<dyn ChainProvider>] {
		&self.providers
	}

	fn broadcasters(&self) -> Vec<Arc<dyn ChainProvider>> {
		self.providers
			.iter()
			.filter(|p| p.capabilities().broadcast)
			.cloned()
			.collect()
	}

	/// Query-capable providers, lowest priority value first
	fn queriers(&self) -> Vec<Arc<dyn ChainProvider>> {
		let mut queriers: Vec<_> = self
			.providers
			.iter()
			.filter(|p| p.capabilities().query)
			.cloned()
			.collect();
		queriers.sort_by_key(|p| p.priority());
		queriers
	}

	/// Sends the transaction to every broadcast-capable provider at once
	///
	/// Returns the first acknowledgement. Duplicate submissions count as accepted.
	#[instrument(skip_all, fields(tx_id = %id))]
	pub async fn broadcast(
		&self,
		id: &str,
		tx_hex: &str,
		timeout: Duration,
	) -> Result<BroadcastResult, ChainstateError> {
		validate_tx_id(id)?;
		validate_tx_hex(tx_hex)?;

		let broadcasters = self.broadcasters();
		if broadcasters.is_empty() {
			return Err(ChainstateError::provider(&[]));
		}

		let deadline = Instant::now() + timeout;
		let (tx, mut rx) = mpsc::channel(broadcasters.len());
		for provider in broadcasters {
			let tx = tx.clone();
			let id = id.to_string();
			let tx_hex = tx_hex.to_string();
			tokio::spawn(async move {
				let result = provider.broadcast(&id, &tx_hex).await;
				let _ = tx.send((provider.name().to_string(), result)).await;
			});
		}
		drop(tx);

		let mut failures = Vec::new();
		loop {
			match tokio::time::timeout_at(deadline, rx.recv()).await {
				Ok(Some((name, Ok(result)))) => {
					debug!(provider = %name, already_known = result.already_known, "broadcast accepted");
					return Ok(result);
				}
				Ok(Some((name, Err(error)))) => failures.push((name, error)),
				Ok(None) => break,
				Err(_) => {
					if failures.is_empty() {
						return Err(ChainstateError::timeout(format!(
							"broadcast of {} exceeded {:?}",
							id, timeout
						)));
					}
					break;
				}
			}
		}

		let rejection = failures.iter().find_map(|(name, error)| match error {
			ProviderError::InvalidTransaction(msg) => Some(format!("rejected by {}: {}", name, msg)),
			_ => None,
		});
		match rejection {
			Some(msg) => Err(ChainstateError::validation(msg)),
			None => Err(ChainstateError::provider(&failures)),
		}
	}

	/// Asks providers one at a time in priority order
	///
	/// Returns the first answer satisfying `required_in`. The deadline covers the
	/// whole walk, not each provider.
	#[instrument(skip_all, fields(tx_id = %id))]
	pub async fn query_transaction(
		&self,
		id: &str,
		required_in: RequiredIn,
		timeout: Duration,
	) -> Result<TransactionInfo, ChainstateError> {
		validate_tx_id(id)?;

		let deadline = Instant::now() + timeout;
		let mut outcome = QueryOutcome::default();

		for provider in self.queriers() {
			match tokio::time::timeout_at(deadline, provider.query_transaction(id)).await {
				Ok(Ok(info)) if required_in.is_satisfied_by(&info) => {
					debug!(provider = %provider.name(), "query satisfied");
					return Ok(info);
				}
				Ok(Ok(_)) => outcome.unsatisfied = true,
				Ok(Err(error)) => outcome.record(provider.name().to_string(), error),
				Err(_) => return Err(outcome.timed_out(id, timeout)),
			}
		}

		Err(outcome.exhausted(id))
	}

	/// Asks every query-capable provider at once
	///
	/// The first answer to arrive that satisfies `required_in` wins.
	#[instrument(skip_all, fields(tx_id = %id))]
	pub async fn query_transaction_fastest(
		&self,
		id: &str,
		required_in: RequiredIn,
		timeout: Duration,
	) -> Result<TransactionInfo, ChainstateError> {
		validate_tx_id(id)?;

		let queriers = self.queriers();
		if queriers.is_empty() {
			return Err(ChainstateError::provider(&[]));
		}

		let deadline = Instant::now() + timeout;
		let (tx, mut rx) = mpsc::channel(queriers.len());
		for provider in queriers {
			let tx = tx.clone();
			let id = id.to_string();
			tokio::spawn(async move {
				let result = provider.query_transaction(&id).await;
				let _ = tx.send((provider.name().to_string(), result)).await;
			});
		}
		drop(tx);

		let mut outcome = QueryOutcome::default();
		loop {
			match tokio::time::timeout_at(deadline, rx.recv()).await {
				Ok(Some((name, Ok(info)))) => {
					if required_in.is_satisfied_by(&info) {
						debug!(provider = %name, "query satisfied");
						return Ok(info);
					}
					outcome.unsatisfied = true;
				}
				Ok(Some((name, Err(error)))) => outcome.record(name, error),
				Ok(None) => return Err(outcome.exhausted(id)),
				Err(_) => return Err(outcome.timed_out(id, timeout)),
			}
		}
	}
}
