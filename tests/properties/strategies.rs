use proptest::prelude::*;

use chainstate_monitor::models::TransactionInfo;

pub const P2PKH: &str = "76a914[0-9a-f]{40}88ac";

const MIN_COLLECTION_SIZE: usize = 1;
const MAX_COLLECTION_SIZE: usize = 20;

pub fn hex_strategy(min_bytes: usize, max_bytes: usize) -> impl Strategy<Value = String> {
	prop::collection::vec(any::<u8>(), min_bytes..=max_bytes).prop_map(hex::encode)
}

pub fn tx_id_strategy() -> impl Strategy<Value = String> {
	"[0-9a-f]{64}".prop_map(|s| s.to_string())
}

/// Pay-to-public-key-hash locking script in hex
pub fn p2pkh_strategy() -> impl Strategy<Value = String> {
	"[0-9a-f]{40}".prop_map(|hash| format!("76a914{}88ac", hash))
}

pub fn p2pkh_set_strategy() -> impl Strategy<Value = Vec<String>> {
	prop::collection::hash_set(p2pkh_strategy(), MIN_COLLECTION_SIZE..MAX_COLLECTION_SIZE)
		.prop_map(|set| set.into_iter().collect())
}

/// Hex filler that can never contain the start of a P2PKH script
pub fn filler_strategy() -> impl Strategy<Value = String> {
	"([0-5][0-5]){0,40}".prop_map(|s| s.to_string())
}

pub fn transaction_info_strategy() -> impl Strategy<Value = TransactionInfo> {
	(
		tx_id_strategy(),
		any::<bool>(),
		0u64..1_000,
		1u64..900_000,
		any::<bool>(),
	)
		.prop_map(|(id, mined, confirmations, height, merkle_proof)| TransactionInfo {
			id,
			hex: None,
			confirmations: if mined { confirmations.max(1) } else { 0 },
			block_hash: mined.then(|| format!("{:064x}", height)),
			block_height: mined.then_some(height),
			provider: "prop".to_string(),
			merkle_proof: mined && merkle_proof,
		})
}
