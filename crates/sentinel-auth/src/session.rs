//! # Session Tokens
//!
//! Short-lived JWTs issued after an interactive login. The signing
//! algorithm is pinned to HS256; tokens declaring any other algorithm
//! (including `none`) are rejected before the signature is even checked.
//!
//! The clock is injected via [`Clock`] rather than read from the system
//! directly, so expiry logic can be tested without sleeping.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{AuthError, Result};

/// Maximum lifetime a minted session token may carry, in minutes.
pub const MAX_SESSION_MINUTES: i64 = 30;

/// Source of the current time, injected so tests can control expiry
/// without sleeping or mocking the system clock globally.
pub trait Clock: Send + Sync {
    /// Current time as a Unix timestamp, in seconds.
    fn now_unix(&self) -> i64;
}

/// Clock backed by the system's real wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Claims embedded in a session token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Subject: the user's identifier.
    pub sub: String,
    /// The user's email, carried for convenience so callers don't need a
    /// separate lookup on every request.
    pub email: String,
    /// Issued-at, Unix seconds.
    pub iat: i64,
    /// Expiry, Unix seconds.
    pub exp: i64,
}

/// Configuration for minting and verifying session tokens.
pub struct SessionTokenConfig {
    /// HMAC signing secret. Must be non-empty.
    secret: String,
    /// Clock used for `iat`/`exp` computation and expiry checks.
    clock: Arc<dyn Clock>,
}

impl SessionTokenConfig {
    /// Builds a config backed by the system clock.
    pub fn new(secret: impl Into<String>) -> Result<Self> {
        Self::with_clock(secret, Arc::new(SystemClock))
    }

    /// Builds a config backed by a custom clock, for deterministic testing.
    pub fn with_clock(secret: impl Into<String>, clock: Arc<dyn Clock>) -> Result<Self> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(AuthError::Config("session signing secret must not be empty".into()));
        }
        Ok(Self { secret, clock })
    }

    /// Mints a session token for `subject`/`email`, valid for `minutes`
    /// (clamped to [`MAX_SESSION_MINUTES`]).
    pub fn mint(&self, subject: &str, email: &str, minutes: i64) -> Result<String> {
        let minutes = minutes.clamp(1, MAX_SESSION_MINUTES);
        let now = self.clock.now_unix();
        let claims = Claims {
            sub: subject.to_string(),
            email: email.to_string(),
            iat: now,
            exp: now + minutes * 60,
        };

        let header = Header::new(Algorithm::HS256);
        let key = EncodingKey::from_secret(self.secret.as_bytes());
        jsonwebtoken::encode(&header, &claims, &key)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }

    /// Verifies a session token, rejecting expired tokens and any token
    /// whose header declares a non-HS256 algorithm.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let header = jsonwebtoken::decode_header(token)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        if header.alg != Algorithm::HS256 {
            return Err(AuthError::UnsupportedAlgorithm);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false; // expiry checked manually against the injected clock
        validation.set_required_spec_claims(&["sub", "exp"]);

        let key = DecodingKey::from_secret(self.secret.as_bytes());
        let data = jsonwebtoken::decode::<Claims>(token, &key, &validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        if data.claims.exp <= self.clock.now_unix() {
            return Err(AuthError::TokenExpired);
        }

        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    struct FixedClock(AtomicI64);

    impl Clock for FixedClock {
        fn now_unix(&self) -> i64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    fn config_at(unix_time: i64) -> (SessionTokenConfig, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock(AtomicI64::new(unix_time)));
        let config = SessionTokenConfig::with_clock("test-signing-secret", clock.clone()).unwrap();
        (config, clock)
    }

    #[test]
    fn test_mint_and_verify_roundtrip() {
        let (config, _clock) = config_at(1_700_000_000);
        let token = config.mint("user-1", "user@example.com", 15).unwrap();
        let claims = config.verify(&token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.email, "user@example.com");
    }

    #[test]
    fn test_expired_token_rejected() {
        let (config, clock) = config_at(1_700_000_000);
        let token = config.mint("user-1", "user@example.com", 1).unwrap();
        clock.0.store(1_700_000_000 + 61, Ordering::SeqCst);
        assert!(matches!(config.verify(&token), Err(AuthError::TokenExpired)));
    }

    #[test]
    fn test_lifetime_clamped_to_maximum() {
        let (config, clock) = config_at(1_700_000_000);
        let token = config.mint("user-1", "user@example.com", 999).unwrap();
        clock.0.store(1_700_000_000 + MAX_SESSION_MINUTES * 60 + 1, Ordering::SeqCst);
        assert!(config.verify(&token).is_err());
    }

    #[test]
    fn test_none_algorithm_rejected() {
        let (config, _clock) = config_at(1_700_000_000);
        let claims = Claims {
            sub: "user-1".into(),
            email: "user@example.com".into(),
            iat: 1_700_000_000,
            exp: 1_700_000_000 + 600,
        };
        let header = Header::new(Algorithm::HS256);
        let key = EncodingKey::from_secret(b"test-signing-secret");
        let valid = jsonwebtoken::encode(&header, &claims, &key).unwrap();

        // Splice in an `alg: none` header over the same payload/signature
        // layout to simulate a downgrade attempt.
        let mut parts: Vec<&str> = valid.split('.').collect();
        let none_header = base64::Engine::encode(
            &base64::engine::general_purpose::URL_SAFE_NO_PAD,
            br#"{"alg":"none","typ":"JWT"}"#,
        );
        parts[0] = Box::leak(none_header.into_boxed_str());
        let forged = format!("{}.{}.{}", parts[0], parts[1], parts[2]);

        assert!(matches!(config.verify(&forged), Err(AuthError::UnsupportedAlgorithm)));
    }

    #[test]
    fn test_empty_secret_rejected_at_construction() {
        assert!(SessionTokenConfig::new("").is_err());
    }

    #[test]
    fn test_tampered_signature_rejected() {
        let (config, _clock) = config_at(1_700_000_000);
        let mut token = config.mint("user-1", "user@example.com", 10).unwrap();
        token.push('x');
        assert!(config.verify(&token).is_err());
    }
}
