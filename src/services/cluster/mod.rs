//! Cluster coordination.
//!
//! Uniform publish/subscribe over an in-process or a Redis backend, used by the
//! monitor fleet to mirror filter mutations and connection ownership.

mod client;
mod error;
mod memory;
mod pubsub;
mod redis_pubsub;

pub use client::ClusterClient;
pub use error::ClusterError;
pub use memory::MemoryPubSub;
pub use pubsub::{MessageHandler, PubSub, Subscription};
pub use redis_pubsub::RedisPubSub;

/// Channel carrying monitor events between instances
pub const MONITOR_CHANNEL: &str = "monitor";
