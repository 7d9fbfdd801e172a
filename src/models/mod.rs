//! Domain models and data structures for the chain-state engine.
//!
//! This module contains all the core data structures used throughout the application:
//!
//! - `config`: Configuration loading and validation
//! - `core`: Core domain models (providers, transactions, destinations, cluster messages)

mod config;
mod core;

// Re-export core types
pub use core::{
	BlockHeader, BroadcastResult, ClusterEvent, ClusterMessage, Destination, EndpointUrl,
	FeeQuote, FeeUnit, Network, ProviderCapabilities, ProviderKind, RequiredIn,
	TransactionInfo, WatchedPattern, CLUSTER_MESSAGE_VERSION,
};

// Re-export config types
pub use config::{
	ChainstateConfig, ClusterConfig, ConfigError, ConfigLoader, CoordinatorKind, MonitorConfig,
	NotificationConfig, ProcessorKind, ProviderConfig,
};
