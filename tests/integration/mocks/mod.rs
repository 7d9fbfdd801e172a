//! Mock implementations for integration tests.
//!
//! - `providers`: scripted chain providers with configurable latency
//! - `services`: mockall mocks of the monitor collaborators

mod services;

#[allow(unused_imports)]
pub use providers::*;
#[allow(unused_imports)]
pub use services::*;
