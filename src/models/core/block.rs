use serde::{Deserialize, Serialize};

/// Block header as delivered by the live feed
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockHeader {
	pub hash: String,
	pub height: u64,
	#[serde(default)]
	pub version: u32,
	#[serde(default, alias = "previousblockhash")]
	pub previous_block_hash: String,
	#[serde(default, alias = "merkleroot")]
	pub merkle_root: String,
	#[serde(default, alias = "time")]
	pub timestamp: u64,
	#[serde(default)]
	pub bits: String,
	#[serde(default)]
	pub nonce: u64,
}
