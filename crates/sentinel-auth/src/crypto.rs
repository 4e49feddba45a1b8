//! # Provider Credential Encryption
//!
//! Encrypts upstream LLM provider API keys (OpenAI, Anthropic, etc.) at
//! rest using AES-256-GCM, with the encryption key derived from an
//! operator-supplied master secret via PBKDF2-HMAC-SHA256.
//!
//! # Format
//!
//! The stored ciphertext is `base64(nonce(12) || aead_ciphertext)`. The
//! nonce is generated fresh per encryption and does not need to be secret;
//! it is carried alongside the ciphertext rather than stored separately.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;

use crate::error::{AuthError, Result};

/// Iteration count for the key-derivation function. Matches the gateway's
/// reference implementation; raising it is safe and backward compatible
/// only if old ciphertexts are re-encrypted, since the derived key changes.
const PBKDF2_ROUNDS: u32 = 100_000;

/// Fixed application-level salt. Deliberately not per-secret: the master
/// secret itself is the actual entropy source, and a fixed salt lets the
/// derived key be recomputed without persisting anything beyond the
/// ciphertext.
const KEY_SALT: &[u8] = b"rampart-key-salt";

/// Number of bytes in an AES-256 key.
const KEY_LEN: usize = 32;

/// Number of bytes in a GCM nonce.
const NONCE_LEN: usize = 12;

/// Derives a 32-byte AES-256 key from an operator-supplied master secret.
///
/// Deterministic: the same `master_secret` always yields the same key,
/// which is required since the key is never itself persisted.
pub fn derive_key(master_secret: &str) -> [u8; KEY_LEN] {
    let mut out = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(master_secret.as_bytes(), KEY_SALT, PBKDF2_ROUNDS, &mut out);
    out
}

/// Encrypts `plaintext` under the key derived from `master_secret`,
/// returning a base64 string of `nonce || ciphertext`.
///
/// # Example
///
/// ```rust
/// use sentinel_auth::crypto::{encrypt_credential, decrypt_credential};
///
/// let secret = "operator-master-secret";
/// let sealed = encrypt_credential(secret, "sk-live-upstream-key").unwrap();
/// assert_eq!(decrypt_credential(secret, &sealed).unwrap(), "sk-live-upstream-key");
/// ```
pub fn encrypt_credential(master_secret: &str, plaintext: &str) -> Result<String> {
    let key_bytes = derive_key(master_secret);
    let key = Key::<Aes256Gcm>::from_slice(&key_bytes);
    let cipher = Aes256Gcm::new(key);

    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext.as_bytes())
        .map_err(|e| AuthError::Encryption(e.to_string()))?;

    let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    sealed.extend_from_slice(&nonce_bytes);
    sealed.extend_from_slice(&ciphertext);

    Ok(base64::engine::general_purpose::STANDARD.encode(sealed))
}

/// Decrypts a value produced by [`encrypt_credential`].
pub fn decrypt_credential(master_secret: &str, sealed: &str) -> Result<String> {
    let raw = base64::engine::general_purpose::STANDARD.decode(sealed)?;
    if raw.len() < NONCE_LEN {
        return Err(AuthError::Encryption("ciphertext shorter than nonce".into()));
    }
    let (nonce_bytes, ciphertext) = raw.split_at(NONCE_LEN);

    let key_bytes = derive_key(master_secret);
    let key = Key::<Aes256Gcm>::from_slice(&key_bytes);
    let cipher = Aes256Gcm::new(key);
    let nonce = Nonce::from_slice(nonce_bytes);

    let plaintext = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|e| AuthError::Encryption(e.to_string()))?;

    String::from_utf8(plaintext).map_err(|e| AuthError::Encryption(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let secret = "master-secret-for-tests";
        let sealed = encrypt_credential(secret, "sk-anthropic-abc123").unwrap();
        assert_eq!(decrypt_credential(secret, &sealed).unwrap(), "sk-anthropic-abc123");
    }

    #[test]
    fn test_wrong_master_secret_fails() {
        let sealed = encrypt_credential("right-secret", "sk-openai-xyz").unwrap();
        assert!(decrypt_credential("wrong-secret", &sealed).is_err());
    }

    #[test]
    fn test_derive_key_is_deterministic() {
        assert_eq!(derive_key("same-input"), derive_key("same-input"));
    }

    #[test]
    fn test_derive_key_differs_by_input() {
        assert_ne!(derive_key("secret-a"), derive_key("secret-b"));
    }

    #[test]
    fn test_two_encryptions_produce_different_ciphertext() {
        let secret = "master-secret-for-tests";
        let a = encrypt_credential(secret, "same-plaintext").unwrap();
        let b = encrypt_credential(secret, "same-plaintext").unwrap();
        assert_ne!(a, b, "fresh nonce must vary each encryption");
    }

    #[test]
    fn test_truncated_ciphertext_rejected() {
        let secret = "master-secret-for-tests";
        let tiny = base64::engine::general_purpose::STANDARD.encode([1, 2, 3]);
        assert!(decrypt_credential(secret, &tiny).is_err());
    }
}
