//! Error types for credential hashing, session tokens, and provider-credential
//! encryption.
//!
//! # Security Notes
//!
//! Variants here are intentionally coarse. The gateway facade collapses every
//! variant into a single externally-visible `AuthenticationFailure` so that a
//! caller cannot distinguish "wrong password" from "no such key" from "token
//! expired" - that distinction is only preserved in the `tracing` span
//! attached server-side.

use thiserror::Error;

/// Result type alias for auth operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Errors that can occur during credential verification or key management.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Password or API key did not match the stored hash.
    #[error("credential does not match")]
    InvalidCredential,

    /// A session token was structurally malformed or failed signature checks.
    #[error("invalid session token: {0}")]
    InvalidToken(String),

    /// A session token's `exp` claim is in the past (relative to the
    /// injected clock).
    #[error("session token expired")]
    TokenExpired,

    /// A token declared an algorithm other than the pinned one (most
    /// commonly an attempt to use `alg: none`).
    #[error("unsupported token algorithm")]
    UnsupportedAlgorithm,

    /// bcrypt hashing or comparison failed for a reason other than mismatch.
    #[error("hashing failure: {0}")]
    Hashing(#[from] bcrypt::BcryptError),

    /// AEAD encryption or decryption failed (corrupt ciphertext, wrong key,
    /// truncated nonce).
    #[error("encryption failure: {0}")]
    Encryption(String),

    /// Input could not be base64-decoded where base64 was required.
    #[error("malformed encoding: {0}")]
    Encoding(#[from] base64::DecodeError),

    /// Configuration was missing or structurally invalid (e.g. an empty
    /// signing secret).
    #[error("invalid auth configuration: {0}")]
    Config(String),
}
