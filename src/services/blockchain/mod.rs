//! Chain connectivity: providers, racing and miner services.
//!
//! Provides the pieces callers use to reach the network:
//!
//! - Capability-based provider trait and vendor adapters
//! - HTTP transport with weighted endpoint failover
//! - Racer for broadcast and transaction queries
//! - Miner snapshots and fee quote refresh
//! - Client facade bundling the above

mod client;
mod error;
mod miners;
mod provider;
mod providers;
mod racer;
mod transports;

pub use client::ChainstateClient;
pub use error::{ChainstateError, ProviderError};
pub use miners::{MinerSet, MinerSnapshot};
pub use provider::{ChainProvider, DEFAULT_PROVIDER_PRIORITY};
pub use providers::{build_providers, MapiProvider, NowNodesProvider, WhatsOnChainProvider};
pub use racer::{validate_tx_hex, validate_tx_id, ChainRacer};
pub use transports::{endpoint_manager_for, HttpEndpointManager, ROTATE_ON_ERROR_CODES};
