//! NowNodes JSON-RPC adapter.

use async_trait::async_trait;
use reqwest_middleware::RequestBuilder;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
	models::{BroadcastResult, ProviderCapabilities, ProviderConfig, TransactionInfo},
	services::blockchain::{
		providers::{is_already_known, read_response},
		transports::{endpoint_manager_for, HttpEndpointManager},
		ChainProvider, ProviderError,
	},
};

/// RPC_INVALID_ADDRESS_OR_KEY, returned for unknown transactions
const RPC_NOT_FOUND: i64 = -5;
/// RPC_DESERIALIZATION_ERROR
const RPC_DECODE_FAILED: i64 = -22;
/// RPC_VERIFY_ERROR
const RPC_VERIFY_ERROR: i64 = -25;
/// RPC_VERIFY_REJECTED
const RPC_VERIFY_REJECTED: i64 = -26;
/// RPC_VERIFY_ALREADY_IN_CHAIN
const RPC_ALREADY_IN_CHAIN: i64 = -27;

#[derive(Debug, Deserialize)]
struct RpcError {
	code: i64,
	#[serde(default)]
	message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
	#[serde(default)]
	result: Value,
	#[serde(default)]
	error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcTransaction {
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

#[derive(Clone, Debug)]
pub struct NowNodesProvider {
	name: String,
	priority: u32,
	capabilities: ProviderCapabilities,
	api_key: Option<String>,
	endpoints: HttpEndpointManager,
}

impl NowNodesProvider {
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
			Some(key) => request.header("api-key", key),
			None => request,
		}
	}

	/// Sends a JSON-RPC call; node errors come back as `Ok(Err(..))`
	async fn call(&self, method: &str, params: Value) -> Result<Result<Value, RpcError>, ProviderError> {
		let body = json!({
			"jsonrpc": "2.0",
			"id": 1,
			"method": method,
			"params": params
		});
		let response = self
			.endpoints
			.send(|client, base| self.authorize(client.post(base).json(&body)))
			.await?;
		let (status, text) = read_response(response).await?;

		// Nodes answer RPC errors with 500 and a regular JSON-RPC body
		match serde_json::from_str::<RpcResponse>(&text) {
			Ok(RpcResponse {
				error: Some(error), ..
			}) => Ok(Err(error)),
			Ok(RpcResponse { result, .. }) if status.is_success() => Ok(Ok(result)),
			_ => Err(ProviderError::network(format!(
				"{} failed with status {}",
				method,
				status.as_u16()
			))),
		}
	}
}

#[async_trait]
impl ChainProvider for NowNodesProvider {
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
		match self.call("sendrawtransaction", json!([tx_hex])).await? {
			Ok(result) => Ok(BroadcastResult {
				provider: self.name.clone(),
				tx_id: result.as_str().map(str::to_string).unwrap_or_else(|| id.to_string()),
				already_known: false,
			}),
			Err(error) if error.code == RPC_ALREADY_IN_CHAIN || is_already_known(&error.message) => {
				Ok(BroadcastResult {
					provider: self.name.clone(),
					tx_id: id.to_string(),
					already_known: true,
				})
			}
			Err(error)
				if matches!(
					error.code,
					RPC_DECODE_FAILED | RPC_VERIFY_ERROR | RPC_VERIFY_REJECTED
				) =>
			{
				Err(ProviderError::invalid_transaction(error.message))
			}
			Err(error) => Err(ProviderError::network(format!(
				"rpc error {}: {}",
				error.code, error.message
			))),
		}
	}

	async fn query_transaction(&self, id: &str) -> Result<TransactionInfo, ProviderError> {
		let result = match self.call("getrawtransaction", json!([id, 1])).await? {
			Ok(result) => result,
			Err(error) if error.code == RPC_NOT_FOUND => return Err(ProviderError::NotFound),
			Err(error) => {
				return Err(ProviderError::network(format!(
					"rpc error {}: {}",
					error.code, error.message
				)))
			}
		};

		if result.is_null() {
			return Err(ProviderError::NotFound);
		}
		let tx: RpcTransaction = serde_json::from_value(result)?;

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
