//! # API Key Issuance & Verification
//!
//! Long-lived programmatic credentials. A key is generated once, shown to
//! the caller exactly once, and stored only as a bcrypt hash plus a
//! non-sensitive preview.
//!
//! # Format
//!
//! `rmp_live_<43 URL-safe base64 characters>`, the 43 characters encoding 32
//! random bytes. The `rmp_` prefix lets the gateway's bearer-token gate
//! route a request without first paying for a bcrypt comparison.
//!
//! # Security Notes
//!
//! The plaintext secret is never persisted. Losing it means the key must be
//! revoked and reissued; there is no recovery path, by design of the format.

use base64::Engine;
use rand::RngCore;

use crate::error::{AuthError, Result};

/// Prefix every generated API key plaintext carries.
pub const KEY_PREFIX: &str = "rmp_live_";

/// Number of random bytes encoded into the key body.
const SECRET_BYTES: usize = 32;

/// A freshly generated API key: the plaintext (shown once) plus the
/// artifacts that get persisted.
#[derive(Debug, Clone)]
pub struct GeneratedApiKey {
    /// Full plaintext, e.g. `rmp_live_Xy...`. Must be returned to the caller
    /// and never logged or stored.
    pub plaintext: String,
    /// bcrypt hash of `plaintext`, the only form persisted to disk.
    pub hash: String,
    /// Non-sensitive display form: first 12 characters, `****`, last 4.
    pub preview: String,
}

/// Generates a new API key.
///
/// # Example
///
/// ```rust
/// use sentinel_auth::api_key::generate_api_key;
///
/// let key = generate_api_key().unwrap();
/// assert!(key.plaintext.starts_with("rmp_live_"));
/// assert!(key.preview.contains("****"));
/// ```
pub fn generate_api_key() -> Result<GeneratedApiKey> {
    let mut secret = [0u8; SECRET_BYTES];
    rand::thread_rng().fill_bytes(&mut secret);
    let body = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(secret);
    let plaintext = format!("{KEY_PREFIX}{body}");
    let hash = bcrypt::hash(&plaintext, bcrypt::DEFAULT_COST).map_err(AuthError::Hashing)?;
    let preview = preview_of(&plaintext);

    Ok(GeneratedApiKey {
        plaintext,
        hash,
        preview,
    })
}

/// Builds the non-sensitive preview shown in key-management UIs: the first
/// 12 characters (covers the `rmp_live_` prefix plus 3 body characters),
/// `****`, then the last 4 characters of the body.
fn preview_of(plaintext: &str) -> String {
    let chars: Vec<char> = plaintext.chars().collect();
    let head: String = chars.iter().take(12).collect();
    let tail: String = chars.iter().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
    format!("{head}****{tail}")
}

/// Returns `true` if `candidate` looks structurally like an API key
/// (as opposed to a session token), without doing any expensive hashing.
///
/// Used by the gateway's bearer-token gate to route a request before
/// paying for a bcrypt comparison.
pub fn looks_like_api_key(candidate: &str) -> bool {
    candidate.starts_with(KEY_PREFIX)
}

/// Verifies a plaintext API key against a stored bcrypt hash.
///
/// # Example
///
/// ```rust
/// use sentinel_auth::api_key::{generate_api_key, verify_api_key};
///
/// let key = generate_api_key().unwrap();
/// assert!(verify_api_key(&key.plaintext, &key.hash).unwrap());
/// assert!(!verify_api_key("rmp_live_wrong", &key.hash).unwrap());
/// ```
pub fn verify_api_key(plaintext: &str, hash: &str) -> Result<bool> {
    bcrypt::verify(plaintext, hash).map_err(AuthError::Hashing)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_key_format() {
        let key = generate_api_key().unwrap();
        assert!(key.plaintext.starts_with(KEY_PREFIX));
        // rmp_live_ (9 chars) + 43 base64 chars
        assert_eq!(key.plaintext.len(), KEY_PREFIX.len() + 43);
    }

    #[test]
    fn test_preview_hides_body() {
        let key = generate_api_key().unwrap();
        assert!(!key.preview.contains(&key.plaintext[12..key.plaintext.len() - 4]));
        assert!(key.preview.starts_with("rmp_live_"));
    }

    #[test]
    fn test_verify_roundtrip() {
        let key = generate_api_key().unwrap();
        assert!(verify_api_key(&key.plaintext, &key.hash).unwrap());
    }

    #[test]
    fn test_verify_rejects_flipped_character() {
        let key = generate_api_key().unwrap();
        let mut tampered = key.plaintext.clone();
        let last = tampered.pop().unwrap();
        tampered.push(if last == 'a' { 'b' } else { 'a' });
        assert!(!verify_api_key(&tampered, &key.hash).unwrap());
    }

    #[test]
    fn test_looks_like_api_key() {
        assert!(looks_like_api_key("rmp_live_abc"));
        assert!(!looks_like_api_key("eyJhbGciOiJIUzI1NiJ9.x.y"));
    }

    #[test]
    fn test_two_keys_are_unique() {
        let a = generate_api_key().unwrap();
        let b = generate_api_key().unwrap();
        assert_ne!(a.plaintext, b.plaintext);
    }
}
