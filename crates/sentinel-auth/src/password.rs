//! # Password Hashing
//!
//! Hashes and verifies the passwords behind interactive user accounts.
//! Uses bcrypt at its default cost factor, the same primitive used for API
//! key secrets in [`crate::api_key`] but kept on a separate code path since
//! passwords and API keys have different lifetimes and formats.
//!
//! # Security Notes
//!
//! bcrypt salts automatically; never roll a custom salt scheme on top of it.

use crate::error::{AuthError, Result};

/// Hashes a plaintext password for storage.
///
/// # Example
///
/// ```rust
/// use sentinel_auth::password::{hash_password, verify_password};
///
/// let hash = hash_password("correct horse battery staple").unwrap();
/// assert!(verify_password("correct horse battery staple", &hash).unwrap());
/// assert!(!verify_password("wrong password", &hash).unwrap());
/// ```
pub fn hash_password(plaintext: &str) -> Result<String> {
    bcrypt::hash(plaintext, bcrypt::DEFAULT_COST).map_err(AuthError::Hashing)
}

/// Verifies a plaintext password against a stored bcrypt hash.
///
/// Returns `Ok(false)` for a well-formed hash that simply doesn't match;
/// only a corrupt hash or internal bcrypt error propagates as `Err`.
pub fn verify_password(plaintext: &str, hash: &str) -> Result<bool> {
    bcrypt::verify(plaintext, hash).map_err(AuthError::Hashing)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_roundtrip() {
        let hash = hash_password("hunter2").unwrap();
        assert!(verify_password("hunter2", &hash).unwrap());
    }

    #[test]
    fn test_wrong_password_rejected() {
        let hash = hash_password("hunter2").unwrap();
        assert!(!verify_password("hunter3", &hash).unwrap());
    }

    #[test]
    fn test_hash_is_salted() {
        let a = hash_password("same-input").unwrap();
        let b = hash_password("same-input").unwrap();
        assert_ne!(a, b, "bcrypt must salt each hash independently");
    }
}
