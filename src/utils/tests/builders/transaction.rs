//! Test helper utilities for transaction lookups
//!
//! - `TransactionInfoBuilder`: Builder for creating test TransactionInfo instances

use crate::models::TransactionInfo;

/// Builder for creating test TransactionInfo instances
pub struct TransactionInfoBuilder {
	info: TransactionInfo,
}

impl Default for TransactionInfoBuilder {
	fn default() -> Self {
		Self {
			info: TransactionInfo {
				id: "a".repeat(64),
				hex: None,
				confirmations: 0,
				block_hash: None,
				block_height: None,
				provider: "test".to_string(),
				merkle_proof: false,
			},
		}
	}
}

impl TransactionInfoBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn id(mut self, id: &str) -> Self {
		self.info.id = id.to_string();
		self
	}

	pub fn hex(mut self, hex: &str) -> Self {
		self.info.hex = Some(hex.to_string());
		self
	}

	pub fn provider(mut self, provider: &str) -> Self {
		self.info.provider = provider.to_string();
		self
	}

	/// Mined in a block at `height` with `confirmations` confirmations
	pub fn mined(mut self, height: u64, confirmations: u64) -> Self {
		self.info.block_height = Some(height);
		self.info.block_hash = Some(format!("{:064x}", height));
		self.info.confirmations = confirmations;
		self
	}

	pub fn merkle_proof(mut self, merkle_proof: bool) -> Self {
		self.info.merkle_proof = merkle_proof;
		self
	}

	pub fn build(self) -> TransactionInfo {
		self.info
	}
}
