//! Core domain models for the chain-state engine.
//!
//! This module contains the fundamental data structures that represent:
//! - Providers: external chain-data sources and their capabilities
//! - Transactions: normalized lookup results and acceptance criteria
//! - Destinations: watched locking-script patterns
//! - Cluster messages: the envelope replicas exchange

mod block;
mod cluster;
mod destination;
mod provider;
mod transaction;

pub use block::BlockHeader;
pub use cluster::{ClusterEvent, ClusterMessage, CLUSTER_MESSAGE_VERSION};
pub use destination::{Destination, WatchedPattern};
pub use provider::{
	EndpointUrl, FeeQuote, FeeUnit, Network, ProviderCapabilities, ProviderKind,
};
pub use transaction::{BroadcastResult, RequiredIn, TransactionInfo};
