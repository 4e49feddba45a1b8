//! Gateway configuration.
//!
//! All tunables live in one immutable snapshot, read once at startup from
//! the process environment and carried for the lifetime of the gateway.
//! Nothing here is re-read mid-process; a config change requires a
//! restart.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{GatewayError, Result};
use sentinel_firewall::injection::DetectionMode;

/// Environment variable names read by [`GatewayConfig::from_env`].
mod env_keys {
    pub const DATABASE_PATH: &str = "GATEWAY_DATABASE_PATH";
    pub const JWT_SECRET_KEY: &str = "GATEWAY_JWT_SECRET_KEY";
    pub const KEY_ENCRYPTION_SECRET: &str = "GATEWAY_KEY_ENCRYPTION_SECRET";
    pub const PROMPT_INJECTION_DETECTOR: &str = "GATEWAY_PROMPT_INJECTION_DETECTOR";
    pub const PROMPT_INJECTION_FAST_MODE: &str = "GATEWAY_PROMPT_INJECTION_FAST_MODE";
    pub const PROMPT_INJECTION_THRESHOLD: &str = "GATEWAY_PROMPT_INJECTION_THRESHOLD";
    pub const TOXICITY_THRESHOLD: &str = "GATEWAY_TOXICITY_THRESHOLD";
    pub const RATE_LIMIT_PER_MINUTE: &str = "GATEWAY_RATE_LIMIT_PER_MINUTE";
    pub const RATE_LIMIT_PER_HOUR: &str = "GATEWAY_RATE_LIMIT_PER_HOUR";
    pub const CORS_ORIGINS: &str = "GATEWAY_CORS_ORIGINS";
    pub const ACCESS_TOKEN_EXPIRE_MINUTES: &str = "GATEWAY_ACCESS_TOKEN_EXPIRE_MINUTES";
}

/// Selects which layer(s) of the prompt-injection detector run on every
/// request. Stored as a string in config so it round-trips through
/// environment variables and serialized config alike; [`Self::mode`]
/// converts it to the detector's own enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectorSelection {
    Regex,
    Deep,
    Hybrid,
}

impl DetectorSelection {
    fn parse(value: &str) -> Result<Self> {
        match value.to_lowercase().as_str() {
            "regex" => Ok(Self::Regex),
            "deep" => Ok(Self::Deep),
            "hybrid" => Ok(Self::Hybrid),
            other => Err(GatewayError::ValidationFailure(format!(
                "unknown prompt injection detector mode: {other}"
            ))),
        }
    }

    /// Converts to the firewall crate's own mode enum.
    #[must_use]
    pub fn mode(self) -> DetectionMode {
        match self {
            Self::Regex => DetectionMode::Regex,
            Self::Deep => DetectionMode::Deep,
            Self::Hybrid => DetectionMode::Hybrid,
        }
    }
}

impl Default for DetectorSelection {
    fn default() -> Self {
        Self::Hybrid
    }
}

/// Immutable configuration for the gateway facade.
///
/// Constructed once via [`GatewayConfig::from_env`] (or [`Default`] for
/// tests) and shared read-only across every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Path to the sled registry database.
    pub database_path: PathBuf,
    /// HMAC signing secret for session tokens. Must be non-empty.
    pub jwt_secret_key: String,
    /// Master secret used to derive the provider-credential encryption key.
    pub key_encryption_secret: String,
    /// Which layer(s) the prompt-injection detector runs.
    pub prompt_injection_detector: DetectorSelection,
    /// Skip the deep layer unconditionally, even in hybrid mode.
    pub prompt_injection_fast_mode: bool,
    /// Confidence threshold above which a prompt-injection result is
    /// treated as unsafe by the decision combiner.
    pub prompt_injection_threshold: f64,
    /// Confidence threshold above which the toxicity analyzer flags text.
    pub toxicity_threshold: f64,
    /// Default per-minute request cap for the general rate-limiter profile.
    pub rate_limit_per_minute: u32,
    /// Default per-hour request cap for the general rate-limiter profile.
    pub rate_limit_per_hour: u32,
    /// Allowed CORS origins; empty means same-origin only.
    pub cors_origins: Vec<String>,
    /// Session token lifetime in minutes, clamped to
    /// [`sentinel_auth::session::MAX_SESSION_MINUTES`] by the issuer.
    pub access_token_expire_minutes: i64,
}

impl GatewayConfig {
    /// Builds a config from environment variables, falling back to the
    /// documented defaults for everything but the two secrets, which must
    /// be present and non-empty.
    pub fn from_env() -> Result<Self> {
        let jwt_secret_key = read_required(env_keys::JWT_SECRET_KEY)?;
        let key_encryption_secret = read_required(env_keys::KEY_ENCRYPTION_SECRET)?;

        let prompt_injection_detector = match std::env::var(env_keys::PROMPT_INJECTION_DETECTOR) {
            Ok(v) => DetectorSelection::parse(&v)?,
            Err(_) => DetectorSelection::default(),
        };

        let config = Self {
            database_path: std::env::var(env_keys::DATABASE_PATH)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./gateway.db")),
            jwt_secret_key,
            key_encryption_secret,
            prompt_injection_detector,
            prompt_injection_fast_mode: read_bool(env_keys::PROMPT_INJECTION_FAST_MODE, false)?,
            prompt_injection_threshold: read_f64(env_keys::PROMPT_INJECTION_THRESHOLD, 0.5)?,
            toxicity_threshold: read_f64(env_keys::TOXICITY_THRESHOLD, 0.5)?,
            rate_limit_per_minute: read_u32(env_keys::RATE_LIMIT_PER_MINUTE, 1000)?,
            rate_limit_per_hour: read_u32(env_keys::RATE_LIMIT_PER_HOUR, 10_000)?,
            cors_origins: std::env::var(env_keys::CORS_ORIGINS)
                .map(|v| v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
                .unwrap_or_default(),
            access_token_expire_minutes: read_i64(env_keys::ACCESS_TOKEN_EXPIRE_MINUTES, 30)?,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.jwt_secret_key.is_empty() {
            return Err(GatewayError::ValidationFailure("jwt_secret_key must not be empty".into()));
        }
        if self.key_encryption_secret.is_empty() {
            return Err(GatewayError::ValidationFailure(
                "key_encryption_secret must not be empty".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.prompt_injection_threshold) {
            return Err(GatewayError::ValidationFailure(
                "prompt_injection_threshold must be in [0, 1]".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.toxicity_threshold) {
            return Err(GatewayError::ValidationFailure("toxicity_threshold must be in [0, 1]".into()));
        }
        Ok(())
    }
}

impl Default for GatewayConfig {
    /// Defaults used for tests and local development. `from_env` should
    /// be preferred for anything that talks to real upstream providers,
    /// since the secrets here are not suitable for production use.
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("./gateway.db"),
            jwt_secret_key: "dev-only-signing-secret-change-me".to_string(),
            key_encryption_secret: "dev-only-master-secret-change-me".to_string(),
            prompt_injection_detector: DetectorSelection::default(),
            prompt_injection_fast_mode: false,
            prompt_injection_threshold: 0.5,
            toxicity_threshold: 0.5,
            rate_limit_per_minute: 1000,
            rate_limit_per_hour: 10_000,
            cors_origins: Vec::new(),
            access_token_expire_minutes: 30,
        }
    }
}

fn read_required(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| GatewayError::ValidationFailure(format!("{key} must be set")))
}

fn read_bool(key: &str, default: bool) -> Result<bool> {
    match std::env::var(key) {
        Ok(v) => v
            .parse()
            .map_err(|_| GatewayError::ValidationFailure(format!("{key} must be true or false"))),
        Err(_) => Ok(default),
    }
}

fn read_f64(key: &str, default: f64) -> Result<f64> {
    match std::env::var(key) {
        Ok(v) => v.parse().map_err(|_| GatewayError::ValidationFailure(format!("{key} must be a number"))),
        Err(_) => Ok(default),
    }
}

fn read_u32(key: &str, default: u32) -> Result<u32> {
    match std::env::var(key) {
        Ok(v) => v
            .parse()
            .map_err(|_| GatewayError::ValidationFailure(format!("{key} must be a non-negative integer"))),
        Err(_) => Ok(default),
    }
}

fn read_i64(key: &str, default: i64) -> Result<i64> {
    match std::env::var(key) {
        Ok(v) => v.parse().map_err(|_| GatewayError::ValidationFailure(format!("{key} must be an integer"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GatewayConfig::default();
        assert_eq!(config.rate_limit_per_minute, 1000);
        assert_eq!(config.access_token_expire_minutes, 30);
        assert_eq!(config.prompt_injection_detector, DetectorSelection::Hybrid);
    }

    #[test]
    fn test_config_serialization() {
        let config = GatewayConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: GatewayConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.rate_limit_per_hour, config.rate_limit_per_hour);
    }

    #[test]
    fn test_detector_selection_parse() {
        assert_eq!(DetectorSelection::parse("DEEP").unwrap(), DetectorSelection::Deep);
        assert!(DetectorSelection::parse("quantum").is_err());
    }

    #[test]
    fn test_validate_rejects_empty_secret() {
        let mut config = GatewayConfig::default();
        config.jwt_secret_key = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_threshold() {
        let mut config = GatewayConfig::default();
        config.toxicity_threshold = 1.5;
        assert!(config.validate().is_err());
    }
}
