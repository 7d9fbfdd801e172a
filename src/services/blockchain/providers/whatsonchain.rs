//! WhatsOnChain REST adapter.
//!
//! The configured URL is the network-specific API root, for example
//! `https://api.whatsonchain.com/v1/bsv/main`.

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest_middleware::RequestBuilder;
use serde::Deserialize;
use serde_json::json;

use crate::{
	models::{BroadcastResult, ProviderCapabilities, ProviderConfig, TransactionInfo},
	services::blockchain::{
		providers::{classify_rejection, is_already_known, read_response},
		transports::{endpoint_manager_for, HttpEndpointManager},
		ChainProvider, ProviderError,
	},
};

/// Largest batch accepted by the bulk raw transaction endpoint
const MAX_BULK_TRANSACTIONS: usize = 20;

#[derive(Debug, Deserialize)]
struct WocTransaction {
	txid: String,
	#[serde(default)]
	hex: Option<String>,
	#[serde(default)]
	blockhash: Option<String>,
	#[serde(default)]
	blockheight: Option<u64>,
	#[serde(default)]
	confirmations: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct WocRawTransaction {
	txid: String,
	#[serde(default)]
	hex: String,
	#[serde(default)]
	error: String,
}

#[derive(Clone, Debug)]
pub struct WhatsOnChainProvider {
	name: String,
	priority: u32,
	capabilities: ProviderCapabilities,
	api_key: Option<String>,
	endpoints: HttpEndpointManager,
}

impl WhatsOnChainProvider {
	pub fn new(config: &ProviderConfig, max_retries: u32) -> Result<Self, ProviderError> {
		Ok(Self {
			name: config.name.clone(),
			priority: config.priority,
			capabilities: config.capabilities(),
			api_key: config.api_key.clone(),
			endpoints: endpoint_manager_for(config, max_retries)?,
		})
	}

	fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
		match &self.api_key {
			Some(key) => request.header("woc-api-key", key),
			None => request,
		}
	}

	/// Ids of every transaction currently in the mempool
	pub async fn mempool_transaction_ids(&self) -> Result<Vec<String>, ProviderError> {
		let response = self
			.endpoints
			.send(|client, base| self.authorize(client.get(format!("{}/mempool/raw", base))))
			.await?;
		let (status, body) = read_response(response).await?;
		if !status.is_success() {
			return Err(ProviderError::network(format!(
				"mempool snapshot failed with status {}",
				status.as_u16()
			)));
		}
		Ok(serde_json::from_str(&body)?)
	}

	/// Raw hex of the given transactions as `(txid, hex)` pairs
	///
	/// Transactions the provider reports an error for are skipped.
	pub async fn raw_transactions(
		&self,
		ids: &[String],
	) -> Result<Vec<(String, String)>, ProviderError> {
		let mut transactions = Vec::with_capacity(ids.len());
		for batch in ids.chunks(MAX_BULK_TRANSACTIONS) {
			let body = json!({ "txids": batch });
			let response = self
				.endpoints
				.send(|client, base| {
					self.authorize(client.post(format!("{}/txs/hex", base)).json(&body))
				})
				.await?;
			let (status, text) = read_response(response).await?;
			if !status.is_success() {
				return Err(ProviderError::network(format!(
					"bulk transaction lookup failed with status {}",
					status.as_u16()
				)));
			}

			let raw: Vec<WocRawTransaction> = serde_json::from_str(&text)?;
			for tx in raw {
				if tx.error.is_empty() && !tx.hex.is_empty() {
					transactions.push((tx.txid, tx.hex));
				} else {
					tracing::debug!("Skipping mempool transaction {}: {}", tx.txid, tx.error);
				}
			}
		}
		Ok(transactions)
	}
}

#[async_trait]
impl ChainProvider for WhatsOnChainProvider {
	fn name(&self) -> &str {
		&self.name
	}

	fn capabilities(&self) -> ProviderCapabilities {
		self.capabilities
	}

	fn priority(&self) -> u32 {
		self.priority
	}

	async fn broadcast(&self, id: &str, tx_hex: &str) -> Result<BroadcastResult, ProviderError> {
		let body = json!({ "txhex": tx_hex });
		let response = self
			.endpoints
			.send(|client, base| self.authorize(client.post(format!("{}/tx/raw", base)).json(&body)))
			.await?;
		let (status, text) = read_response(response).await?;

		if status.is_success() {
			let tx_id = serde_json::from_str::<String>(&text)
				.unwrap_or_else(|_| text.trim().trim_matches('"').to_string());
			return Ok(BroadcastResult {
				provider: self.name.clone(),
				tx_id: if tx_id.is_empty() { id.to_string() } else { tx_id },
				already_known: false,
			});
		}

		if is_already_known(&text) {
			return Ok(BroadcastResult {
				provider: self.name.clone(),
				tx_id: id.to_string(),
				already_known: true,
			});
		}

		Err(classify_rejection(status, &text))
	}

	async fn query_transaction(&self, id: &str) -> Result<TransactionInfo, ProviderError> {
		let response = self
			.endpoints
			.send(|client, base| self.authorize(client.get(format!("{}/tx/hash/{}", base, id))))
			.await?;
		let (status, text) = read_response(response).await?;

		if status == StatusCode::NOT_FOUND {
			return Err(ProviderError::NotFound);
		}
		if !status.is_success() {
			return Err(ProviderError::network(format!(
				"lookup failed with status {}: {}",
				status.as_u16(),
				text.trim()
			)));
		}

		let tx: WocTransaction = serde_json::from_str(&text)?;
		if !tx.txid.eq_ignore_ascii_case(id) {
			return Err(ProviderError::malformed_response(format!(
				"asked for {}, got {}",
				id, tx.txid
			)));
		}

		Ok(TransactionInfo {
			id: tx.txid,
			hex: tx.hex.filter(|h| !h.is_empty()),
			confirmations: tx.confirmations.unwrap_or_default(),
			block_hash: tx.blockhash.filter(|h| !h.is_empty()),
			block_height: tx.blockheight.filter(|h| *h > 0),
			provider: self.name.clone(),
			merkle_proof: false,
		})
	}
}
