//! Core services of the chain-state engine.
//!
//! - blockchain: Providers, racing, miner services and the client facade
//! - cluster: Publish/subscribe coordination between instances
//! - filter: Filter processors used by the monitor
//! - monitor: Live feed session and matching
//! - notification: Fire-and-forget model notifications

pub mod blockchain;
pub mod cluster;
pub mod filter;
pub mod monitor;
pub mod notification;
