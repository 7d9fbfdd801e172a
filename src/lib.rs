//! Chain-state monitor.
//!
//! Chain connectivity and mempool monitoring for a transaction engine:
//!
//! - Broadcasts and queries transactions across several unreliable providers
//! - Watches the live mempool feed for transactions matching watched patterns
//! - Keeps filter state and feed ownership in step across a fleet of instances
//!
//! # Modules
//! - `bootstrap`: Service wiring from configuration
//! - `models`: Configuration and domain models
//! - `repositories`: Datastore collaborators
//! - `services`: Racer, monitor, filters, cluster and notifications
//! - `utils`: HTTP, logging and test helpers

pub mod bootstrap;
pub mod models;
pub mod repositories;
pub mod services;
pub mod utils;
