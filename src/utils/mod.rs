//! Utility modules for common functionality.
//!
//! This module provides various utility functions and types that are used across
//! the application. Currently includes:
//!
//! - http: Retrying HTTP client construction
//! - logging: Logging utilities
//! - tests: Builders for test fixtures

mod http;

pub mod logging;
pub mod tests;

pub use http::{create_retryable_http_client, HttpRetryConfig, TransientErrorRetryStrategy};
