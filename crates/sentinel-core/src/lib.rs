//! # Sentinel Core
//!
//! Unified security gateway facade for LLM API traffic.
//! Orchestrates authentication, rate limiting, threat detection, policy
//! enforcement, and usage accounting behind one [`Gateway`] entry point.
//!
//! ## Threat Coverage
//!
//! | Layer | Component crate | Threats covered |
//! |-------|-----------------|------------------|
//! | Identity | `sentinel-auth` | Credential/key/session forgery |
//! | Content | `sentinel-firewall` | Prompt injection, jailbreaks, data exfiltration, PII |
//! | Traffic | `sentinel-monitor` | Quota exhaustion, brute force |
//! | Policy | `sentinel-council` | Compliance rule violations |
//! | Persistence | `sentinel-registry` | Audit trail, usage accounting |
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                         GATEWAY FACADE                        │
//! ├───────────────────────────────────────────────────────────────┤
//! │                                                                │
//! │                      ┌─────────────┐                          │
//! │                      │   Gateway   │  ← Unified Facade        │
//! │                      └──────┬──────┘                          │
//! │                             │                                 │
//! │    ┌────────┬───────────────┼───────────────┬────────┐        │
//! │    ▼        ▼               ▼               ▼        ▼        │
//! │ ┌──────┐ ┌────────┐   ┌───────────┐   ┌──────────┐ ┌───────┐  │
//! │ │ auth │ │monitor │   │ firewall  │   │ council  │ │registry│  │
//! │ └──────┘ └────────┘   └───────────┘   └──────────┘ └───────┘  │
//! │                                                                │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sentinel_core::{Gateway, GatewayConfig};
//! use sentinel_core::decision::ContextKind;
//!
//! let config = GatewayConfig::default();
//! let gateway = Gateway::new(config)?;
//!
//! let principal = gateway.authenticate(&bearer_token, now_unix)?;
//! let assessment = gateway.inspect(&user_message, ContextKind::Input, &principal, now_unix)?;
//! if !assessment.safe {
//!     return Err("blocked".into());
//! }
//! ```
//!
//! ## Security Notes
//!
//! - Checks execute in order: authenticate → rate limit → inspect →
//!   enforce policy → account for usage.
//! - Any phase can short-circuit the request with an error; none of
//!   them silently continue on failure.
//! - Threat assessments above [`decision::ThreatAssessment::INCIDENT_THRESHOLD`]
//!   are persisted as incidents regardless of the eventual policy
//!   decision, so a blocked request still leaves an audit trail.

pub mod config;
pub mod decision;
pub mod error;
pub mod gateway;
pub mod headers;

pub use config::{DetectorSelection, GatewayConfig};
pub use decision::{ContextKind, Decision, Detectors, Threat, ThreatAssessment};
pub use error::GatewayError;
pub use gateway::{Gateway, Principal, UsageEvent};
pub use headers::SecurityHeaders;

/// Core result type for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests;
