//! Bloom filter processor.
//!
//! Keeps one [`StableBloomFilter`] per watched pattern. A candidate transaction is
//! scanned with every pattern's regular expression and each captured substring is
//! tested against that pattern's filter.

use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::{
	models::ProcessorKind,
	services::filter::{FilterError, MonitorProcessor, StableBloomFilter},
};

/// A compiled pattern and the items watched under it
#[derive(Debug, Clone)]
pub struct BloomProcessorFilter {
	pub filter: StableBloomFilter,
	regex: Regex,
}

impl BloomProcessorFilter {
	pub fn regex(&self) -> &Regex {
		&self.regex
	}
}

#[derive(Debug, Clone)]
pub struct BloomProcessor {
	false_positive_rate: f64,
	/// Keyed by pattern; the ordered map makes state digests order independent
	filters: BTreeMap<String, BloomProcessorFilter>,
	max_cells: usize,
}

impl BloomProcessor {
	pub fn new(max_cells: usize, false_positive_rate: f64) -> Self {
		Self {
			false_positive_rate,
			filters: BTreeMap::new(),
			max_cells,
		}
	}

	pub fn filters(&self) -> &BTreeMap<String, BloomProcessorFilter> {
		&self.filters
	}

	pub fn max_cells(&self) -> usize {
		self.max_cells
	}

	pub fn false_positive_rate(&self) -> f64 {
		self.false_positive_rate
	}
}

impl MonitorProcessor for BloomProcessor {
	fn add(&mut self, regex: &str, item: &str) -> Result<(), FilterError> {
		if !self.filters.contains_key(regex) {
			let compiled = Regex::new(regex)?;
			self.filters.insert(
				regex.to_string(),
				BloomProcessorFilter {
					filter: StableBloomFilter::new_default(self.max_cells, self.false_positive_rate),
					regex: compiled,
				},
			);
		}

		if let Some(entry) = self.filters.get_mut(regex) {
			entry.filter.add(item.as_bytes());
		}
		Ok(())
	}

	fn test(&self, regex: &str, item: &str) -> bool {
		self.filters
			.get(regex)
			.is_some_and(|entry| entry.filter.test(item.as_bytes()))
	}

	fn get_hash(&self) -> String {
		let mut hasher = Sha256::new();
		for (pattern, entry) in &self.filters {
			hasher.update((pattern.len() as u64).to_be_bytes());
			hasher.update(pattern.as_bytes());
			hasher.update(entry.filter.digest());
		}
		hex::encode(hasher.finalize())
	}

	fn filter_transaction(&self, tx_hex: &str) -> Result<Option<String>, FilterError> {
		for entry in self.filters.values() {
			let hit = entry
				.regex
				.find_iter(tx_hex)
				.any(|found| entry.filter.test(found.as_str().as_bytes()));
			if hit {
				return Ok(Some(tx_hex.to_string()));
			}
		}
		Ok(None)
	}

	fn patterns(&self) -> Vec<String> {
		self.filters.keys().cloned().collect()
	}

	fn kind(&self) -> ProcessorKind {
		ProcessorKind::Bloom
	}
}
