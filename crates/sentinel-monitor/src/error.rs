//! Error type for the rate limiter.
//!
//! # Security Notes
//!
//! Error messages are designed to provide useful debugging information
//! without leaking sensitive execution state to potential attackers.

use thiserror::Error;

/// Result type alias for monitor operations.
pub type Result<T> = std::result::Result<T, MonitorError>;

/// Errors surfaced by the rate limiter.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Client exceeded its request quota for the current window.
    #[error("rate limit exceeded for client {client}: retry after {retry_after_secs}s")]
    RateLimitExceeded {
        /// Client identity the limit was keyed on.
        client: String,
        /// Seconds until the caller may retry.
        retry_after_secs: u64,
    },
}
