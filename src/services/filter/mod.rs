//! Transaction filtering functionality.
//!
//! Decides whether a mempool transaction touches a watched destination:
//! - Stable bloom filter with bounded memory
//! - Bloom processor keyed by pattern
//! - Literal substring processor for small watch lists

mod bloom;
mod error;
mod processor;
mod regex_processor;
mod stable_bloom;

pub use bloom::{BloomProcessor, BloomProcessorFilter};
pub use error::FilterError;
pub use processor::{new_processor, MonitorProcessor, PublishedTransaction};
pub use regex_processor::RegexProcessor;
pub use stable_bloom::{optimal_k, optimal_stable_p, StableBloomFilter};
