//! Common contract of the filter processors.

use serde::Deserialize;

use crate::{
	models::ProcessorKind,
	services::filter::{BloomProcessor, FilterError, RegexProcessor},
};

/// Membership tester over the set of watched patterns
///
/// Implementations are single-writer: callers serialise mutations (`add`, `reload`)
/// against reads. Keeping replicas in step is the cluster coordinator's job.
pub trait MonitorProcessor: Send + Sync {
	/// Adds `item` to the set watched under `regex`
	fn add(&mut self, regex: &str, item: &str) -> Result<(), FilterError>;

	/// Returns true if `item` is (probably) watched under `regex`
	fn test(&self, regex: &str, item: &str) -> bool;

	/// Bulk re-seeds the set watched under `regex`
	fn reload(&mut self, regex: &str, items: &[String]) -> Result<(), FilterError> {
		for item in items {
			self.add(regex, item)?;
		}
		Ok(())
	}

	/// Hex digest of the current state, independent of pattern insertion order
	fn get_hash(&self) -> String;

	/// Returns the transaction hex if any watched item occurs in it
	fn filter_transaction(&self, tx_hex: &str) -> Result<Option<String>, FilterError>;

	/// Same as [`MonitorProcessor::filter_transaction`] for a raw feed publication
	fn filter_transaction_publish_event(
		&self,
		event_data: &[u8],
	) -> Result<Option<String>, FilterError> {
		let event = PublishedTransaction::from_slice(event_data)?;
		self.filter_transaction(&event.hex)
	}

	/// Patterns currently registered, sorted
	fn patterns(&self) -> Vec<String>;

	fn kind(&self) -> ProcessorKind;
}

/// Transaction publication as delivered by the live feed
#[derive(Debug, Clone, Deserialize)]
pub struct PublishedTransaction {
	#[serde(default, alias = "txid", alias = "hash")]
	pub id: Option<String>,
	pub hex: String,
}

impl PublishedTransaction {
	pub fn from_slice(data: &[u8]) -> Result<Self, FilterError> {
		let event: PublishedTransaction = serde_json::from_slice(data)?;
		if event.hex.is_empty() {
			return Err(FilterError::malformed_event("transaction event without hex"));
		}
		Ok(event)
	}
}

/// Builds the processor selected by configuration
pub fn new_processor(
	kind: ProcessorKind,
	max_cells: usize,
	false_positive_rate: f64,
) -> Box<dyn MonitorProcessor> {
	match kind {
		ProcessorKind::Bloom => Box::new(BloomProcessor::new(max_cells, false_positive_rate)),
		ProcessorKind::Regex => Box::new(RegexProcessor::new()),
	}
}
