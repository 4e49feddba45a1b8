//! # Rate Limiting
//!
//! Throttles inbound requests per client identity using dual sliding
//! windows (60 second and 3600 second horizons).
//!
//! ## Threat Model
//!
//! Without request throttling, a single caller can:
//! - **Exhaust upstream provider quota**: Flooding the LLM provider with
//!   requests on behalf of other tenants.
//! - **Starve other clients**: Monopolizing gateway capacity.
//! - **Mount brute-force attacks**: Rapidly probing auth endpoints.
//!
//! ## Design
//!
//! Each client identity gets its own bounded pair of sliding windows.
//! Stale timestamps are evicted lazily on the next request for that
//! client, and a periodic sweep drops entries for clients that have gone
//! idle, bounding total memory regardless of how many distinct clients
//! have ever connected.
//!
//! ## Example
//!
//! ```rust
//! use sentinel_monitor::{Profile, RateLimiter, RateLimiterConfig};
//! use std::time::Instant;
//!
//! let limiter = RateLimiter::new(RateLimiterConfig::default());
//! match limiter.check("client-123", Profile::General, Instant::now()) {
//!     Ok(status) => println!("remaining this minute: {}", status.remaining_minute),
//!     Err(e) => eprintln!("rate limited: {e}"),
//! }
//! ```
//!
//! ## Security Notes
//!
//! - The sweep interval MUST be at least 60 seconds; evicting an entry
//!   mid-window would reset a client's quota early.
//! - Limits are enforced before any detector or provider call runs.

mod error;
mod rate_limiter;

pub use error::{MonitorError, Result};
pub use rate_limiter::{Limits, Profile, RateLimitStatus, RateLimiter, RateLimiterConfig, MIN_SWEEP_INTERVAL};
