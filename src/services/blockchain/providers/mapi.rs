//! Merchant API (mAPI) adapter.
//!
//! Every mAPI answer is a JSON envelope whose `payload` field carries the actual
//! document as a string, next to the miner's signature over it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest_middleware::RequestBuilder;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::json;

use crate::{
	models::{
		BroadcastResult, FeeQuote, FeeUnit, ProviderCapabilities, ProviderConfig, TransactionInfo,
	},
	services::blockchain::{
		providers::{classify_rejection, is_already_known, read_response},
		transports::{endpoint_manager_for, HttpEndpointManager},
		ChainProvider, ProviderError,
	},
};

const RESULT_SUCCESS: &str = "success";
const NOT_FOUND_DESCRIPTION: &str = "no such mempool or blockchain transaction";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonEnvelope {
	payload: String,
	#[serde(default)]
	public_key: Option<String>,
}

impl JsonEnvelope {
	fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ProviderError> {
		let envelope: JsonEnvelope = serde_json::from_str(body)?;
		if let Some(key) = &envelope.public_key {
			tracing::trace!("mAPI payload signed by {}", key);
		}
		Ok(serde_json::from_str(&envelope.payload)?)
	}
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeeQuotePayload {
	#[serde(default)]
	expiry_time: Option<DateTime<Utc>>,
	#[serde(default)]
	fees: Vec<MapiFee>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MapiFee {
	fee_type: String,
	mining_fee: FeeUnit,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusPayload {
	#[serde(default)]
	txid: Option<String>,
	#[serde(default)]
	return_result: String,
	#[serde(default)]
	result_description: String,
	#[serde(default)]
	block_hash: Option<String>,
	#[serde(default)]
	block_height: Option<u64>,
	#[serde(default)]
	confirmations: Option<u64>,
	#[serde(default)]
	merkle_proof: Option<serde_json::Value>,
}

impl StatusPayload {
	fn is_success(&self) -> bool {
		self.return_result.eq_ignore_ascii_case(RESULT_SUCCESS)
	}
}

#[derive(Clone, Debug)]
pub struct MapiProvider {
	name: String,
	priority: u32,
	capabilities: ProviderCapabilities,
	api_key: Option<String>,
	endpoints: HttpEndpointManager,
}

impl MapiProvider {
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
			Some(token) => request.header("Authorization", format!("Bearer {}", token)),
			None => request,
		}
	}
}

#[async_trait]
impl ChainProvider for MapiProvider {
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
		let body = json!({ "rawtx": tx_hex });
		let response = self
			.endpoints
			.send(|client, base| self.authorize(client.post(format!("{}/mapi/tx", base)).json(&body)))
			.await?;
		let (status, text) = read_response(response).await?;
		if !status.is_success() {
			return Err(classify_rejection(status, &text));
		}

		let payload: StatusPayload = JsonEnvelope::decode(&text)?;
		if payload.is_success() {
			return Ok(BroadcastResult {
				provider: self.name.clone(),
				tx_id: payload
					.txid
					.filter(|t| !t.is_empty())
					.unwrap_or_else(|| id.to_string()),
				already_known: false,
			});
		}
		if is_already_known(&payload.result_description) {
			return Ok(BroadcastResult {
				provider: self.name.clone(),
				tx_id: id.to_string(),
				already_known: true,
			});
		}
		Err(ProviderError::invalid_transaction(payload.result_description))
	}

	async fn query_transaction(&self, id: &str) -> Result<TransactionInfo, ProviderError> {
		let response = self
			.endpoints
			.send(|client, base| {
				self.authorize(client.get(format!("{}/mapi/tx/{}?merkleProof=true", base, id)))
			})
			.await?;
		let (status, text) = read_response(response).await?;
		if status == reqwest::StatusCode::NOT_FOUND {
			return Err(ProviderError::NotFound);
		}
		if !status.is_success() {
			return Err(ProviderError::network(format!(
				"status query failed with status {}",
				status.as_u16()
			)));
		}

		let payload: StatusPayload = JsonEnvelope::decode(&text)?;
		if !payload.is_success() {
			if payload
				.result_description
				.to_ascii_lowercase()
				.contains(NOT_FOUND_DESCRIPTION)
			{
				return Err(ProviderError::NotFound);
			}
			return Err(ProviderError::network(payload.result_description));
		}

		Ok(TransactionInfo {
			id: payload.txid.unwrap_or_else(|| id.to_string()),
			hex: None,
			confirmations: payload.confirmations.unwrap_or_default(),
			block_hash: payload.block_hash.filter(|h| !h.is_empty()),
			block_height: payload.block_height.filter(|h| *h > 0),
			provider: self.name.clone(),
			merkle_proof: payload.merkle_proof.is_some_and(|proof| !proof.is_null()),
		})
	}

	async fn fee_quote(&self) -> Result<FeeQuote, ProviderError> {
		let response = self
			.endpoints
			.send(|client, base| self.authorize(client.get(format!("{}/mapi/feeQuote", base))))
			.await?;
		let (status, text) = read_response(response).await?;
		if !status.is_success() {
			return Err(ProviderError::network(format!(
				"fee quote failed with status {}",
				status.as_u16()
			)));
		}

		let payload: FeeQuotePayload = JsonEnvelope::decode(&text)?;
		let fee = |fee_type: &str| {
			payload
				.fees
				.iter()
				.find(|f| f.fee_type == fee_type)
				.map(|f| f.mining_fee)
		};

		let standard = fee("standard")
			.ok_or_else(|| ProviderError::malformed_response("fee quote without standard fee"))?;
		Ok(FeeQuote {
			standard,
			data: fee("data").unwrap_or(standard),
			expires_at: payload.expiry_time,
			fetched_at: Utc::now(),
		})
	}
}
