use serde::{Deserialize, Serialize};

/// Canonical shape of a transaction lookup, regardless of which provider answered
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct TransactionInfo {
	pub id: String,
	pub hex: Option<String>,
	pub confirmations: u64,
	pub block_hash: Option<String>,
	pub block_height: Option<u64>,
	pub provider: String,
	pub merkle_proof: bool,
}

impl TransactionInfo {
	/// Whether the provider reported the transaction inside a mined block
	pub fn is_mined(&self) -> bool {
		self.confirmations > 0 || self.block_hash.as_deref().is_some_and(|h| !h.is_empty())
	}
}

/// Acceptance criteria a query result must satisfy before it is returned to the caller
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequiredIn {
	/// Known to the network, confirmed or not
	Mempool,
	/// Included in a mined block
	OnChain,
	/// Included in a mined block and the provider returned a merkle proof
	MerkleProof,
}

impl RequiredIn {
	pub fn is_satisfied_by(&self, info: &TransactionInfo) -> bool {
		match self {
			Self::Mempool => true,
			Self::OnChain => info.is_mined(),
			Self::MerkleProof => info.is_mined() && info.merkle_proof,
		}
	}
}

/// Acknowledgement of a broadcast from a single provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastResult {
	pub provider: String,
	pub tx_id: String,
	/// The provider already knew about the transaction
	pub already_known: bool,
}
