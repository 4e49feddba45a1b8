//! # sentinel-auth
//!
//! Credential hashing, session tokens, and provider-credential encryption
//! for the gateway.
//!
//! Four independent concerns live here, each in its own module:
//!
//! - [`password`] - bcrypt hashing for interactive user account passwords.
//! - [`api_key`] - generation, bcrypt hashing, and preview rendering for
//!   long-lived programmatic API keys.
//! - [`session`] - minting and verification of short-lived JWT session
//!   tokens, with a pinned signing algorithm and an injectable clock.
//! - [`crypto`] - PBKDF2 key derivation and AES-256-GCM encryption for
//!   upstream provider credentials at rest.
//!
//! None of these modules know about each other's callers; the gateway
//! facade is responsible for collapsing every failure mode into a single
//! externally uniform authentication failure.

pub mod api_key;
pub mod crypto;
pub mod error;
pub mod password;
pub mod session;

pub use error::{AuthError, Result};
