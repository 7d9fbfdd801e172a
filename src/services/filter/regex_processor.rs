//! Literal substring processor.
//!
//! Holds a flat list of literal strings and reports a match when any of them occurs
//! in the candidate. Exact for small watch lists, with no false negatives.

use sha2::{Digest, Sha256};

use crate::{
	models::ProcessorKind,
	services::filter::{FilterError, MonitorProcessor},
};

#[derive(Debug, Clone, Default)]
pub struct RegexProcessor {
	filter: Vec<String>,
}

impl RegexProcessor {
	pub fn new() -> Self {
		Self::default()
	}

	/// Watched literals in insertion order
	pub fn items(&self) -> &[String] {
		&self.filter
	}
}

impl MonitorProcessor for RegexProcessor {
	/// Stores `item` verbatim, or `regex` itself when no item is given
	fn add(&mut self, regex: &str, item: &str) -> Result<(), FilterError> {
		let literal = if item.is_empty() { regex } else { item };
		// An empty literal would match every transaction
		if literal.is_empty() {
			return Err(FilterError::invalid_pattern("empty literal"));
		}
		if !self.filter.iter().any(|existing| existing == literal) {
			self.filter.push(literal.to_string());
		}
		Ok(())
	}

	fn test(&self, _regex: &str, item: &str) -> bool {
		self.filter.iter().any(|literal| item.contains(literal.as_str()))
	}

	fn get_hash(&self) -> String {
		let mut sorted: Vec<&String> = self.filter.iter().collect();
		sorted.sort();

		let mut hasher = Sha256::new();
		for literal in sorted {
			hasher.update((literal.len() as u64).to_be_bytes());
			hasher.update(literal.as_bytes());
		}
		hex::encode(hasher.finalize())
	}

	fn filter_transaction(&self, tx_hex: &str) -> Result<Option<String>, FilterError> {
		if self.test("", tx_hex) {
			Ok(Some(tx_hex.to_string()))
		} else {
			Ok(None)
		}
	}

	fn patterns(&self) -> Vec<String> {
		let mut patterns = self.filter.clone();
		patterns.sort();
		patterns
	}

	fn kind(&self) -> ProcessorKind {
		ProcessorKind::Regex
	}
}
