//! # Gateway Facade
//!
//! The single entry point tying every component crate together:
//! authentication, rate limiting, threat detection, policy enforcement,
//! and usage accounting, run in that order for every request.
//!
//! ## Request lifecycle
//!
//! 1. **Authenticate** - [`Gateway::authenticate`] routes a bearer token
//!    to either the API-key or session-token verifier based on its
//!    prefix, so well-formed session tokens never pay for a bcrypt
//!    comparison and vice versa.
//! 2. **Rate limit** - [`Gateway::check_rate_limit`] consults the shared
//!    [`sentinel_monitor::RateLimiter`] before any detector or storage
//!    call runs.
//! 3. **Inspect** - [`Gateway::inspect`] runs the detector pipeline via
//!    [`crate::decision::Detectors`] and, above the incident threshold,
//!    persists an [`sentinel_registry::Incident`].
//! 4. **Enforce policy** - [`Gateway::enforce_policy`] runs the
//!    caller's policies through [`sentinel_council::PolicyEngine`].
//! 5. **Meter usage** - [`Gateway::record_usage`] is fire-and-forget: it
//!    is handed to a background task over an unbounded channel so a
//!    slow or failed write never blocks the response that triggered it.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;

use sentinel_auth::api_key::{generate_api_key, looks_like_api_key, verify_api_key};
use sentinel_auth::crypto::{decrypt_credential, encrypt_credential};
use sentinel_auth::password::{hash_password, verify_password};
use sentinel_auth::session::SessionTokenConfig;
use sentinel_council::PolicyEngine;
pub use sentinel_council::PolicyEvaluation;
use sentinel_firewall::pii::PiiDetector;
use sentinel_firewall::toxicity::ToxicityAnalyzer;
use sentinel_monitor::{Profile, RateLimitStatus, RateLimiter, RateLimiterConfig};
use sentinel_registry::{ApiKey, CredentialStatus, Incident, ProviderCredential, Registry, UsageCounterKey, User};

use crate::config::GatewayConfig;
use crate::decision::{ContextKind, Detectors, ThreatAssessment};
use crate::error::{GatewayError, Result};

/// The caller identity a successful [`Gateway::authenticate`] resolves
/// to, carried through the rest of the request's lifecycle.
#[derive(Debug, Clone)]
pub struct Principal {
    pub id: String,
    pub rate_limit_per_minute: u32,
    pub rate_limit_per_hour: u32,
}

/// A usage record queued for background accounting. Built at the call
/// site, consumed by the background task spawned in [`Gateway::new`].
#[derive(Debug, Clone)]
pub struct UsageEvent {
    pub api_key_id: String,
    pub endpoint: String,
    pub date: String,
    pub hour: u8,
    pub tokens: u64,
    pub cost_millicents: u64,
}

/// Unified security facade for LLM API traffic: authentication, rate
/// limiting, threat detection, policy enforcement, and usage
/// accounting.
///
/// One `Gateway` is built at process startup and shared (behind an
/// [`Arc`]) across every inbound request; nothing here is per-request
/// state except what is passed into each method call.
pub struct Gateway {
    config: GatewayConfig,
    registry: Arc<Registry>,
    rate_limiter: RateLimiter,
    session_tokens: SessionTokenConfig,
    detectors: Detectors,
    pii: PiiDetector,
    toxicity: ToxicityAnalyzer,
    policy_engine: PolicyEngine,
    usage_tx: mpsc::UnboundedSender<UsageEvent>,
}

impl Gateway {
    /// Builds a gateway backed by a sled database at `path`, spawning
    /// the background usage-accounting consumer task on the ambient
    /// Tokio runtime.
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let registry = Arc::new(Registry::new(&config.database_path)?);
        Self::with_registry(config, registry)
    }

    /// Builds a gateway over an already-open registry, primarily for
    /// tests that want [`Registry::temporary`].
    pub fn with_registry(config: GatewayConfig, registry: Arc<Registry>) -> Result<Self> {
        let session_tokens = SessionTokenConfig::new(config.jwt_secret_key.clone())?;
        let rate_limiter = RateLimiter::new(RateLimiterConfig {
            general: sentinel_monitor::Limits {
                per_minute: config.rate_limit_per_minute,
                per_hour: config.rate_limit_per_hour,
            },
            ..RateLimiterConfig::default()
        });

        let (usage_tx, mut usage_rx) = mpsc::unbounded_channel::<UsageEvent>();
        let accounting_registry = registry.clone();
        tokio::spawn(async move {
            while let Some(event) = usage_rx.recv().await {
                let key = UsageCounterKey {
                    api_key_id: event.api_key_id.clone(),
                    endpoint: event.endpoint.clone(),
                    date: event.date.clone(),
                    hour: event.hour,
                };
                if let Err(err) = accounting_registry.track_usage(&key, event.tokens, event.cost_millicents) {
                    tracing::error!(error = %err, api_key_id = %event.api_key_id, "usage accounting write failed");
                }
            }
        });

        Ok(Self {
            toxicity: ToxicityAnalyzer::new(config.toxicity_threshold),
            detectors: Detectors::new(),
            pii: PiiDetector::new(&[]),
            policy_engine: PolicyEngine::new(),
            config,
            registry,
            rate_limiter,
            session_tokens,
            usage_tx,
        })
    }

    /// Creates a gateway with an in-memory registry, for tests.
    pub fn temporary(config: GatewayConfig) -> Result<Self> {
        Self::with_registry(config, Arc::new(Registry::temporary()?))
    }

    #[must_use]
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    // ---- authentication -------------------------------------------------

    /// Resolves a bearer token to a [`Principal`], routing on the
    /// `rmp_live_` prefix before paying for a bcrypt comparison so a
    /// malformed or clearly-session token never reaches the key lookup,
    /// and vice versa.
    pub fn authenticate(&self, bearer_token: &str, now_unix: i64) -> Result<Principal> {
        if looks_like_api_key(bearer_token) {
            self.authenticate_api_key(bearer_token, now_unix)
        } else {
            self.authenticate_session(bearer_token)
        }
    }

    fn authenticate_api_key(&self, plaintext: &str, now_unix: i64) -> Result<Principal> {
        // Keys only carry a prefix, not their own id, so every active key
        // sharing the literal prefix is checked until one verifies.
        let candidates = self.registry.active_api_keys_with_prefix(sentinel_auth::api_key::KEY_PREFIX)?;

        for candidate in candidates {
            if let Some(expires_at) = candidate.expires_at {
                if expires_at <= now_unix {
                    continue;
                }
            }
            if verify_api_key(plaintext, &candidate.hash)? {
                self.registry.touch_api_key(&candidate.id, now_unix)?;
                return Ok(Principal {
                    id: candidate.owner_id,
                    rate_limit_per_minute: candidate.rate_limit_per_minute,
                    rate_limit_per_hour: candidate.rate_limit_per_hour,
                });
            }
        }

        Err(GatewayError::AuthenticationFailure)
    }

    fn authenticate_session(&self, token: &str) -> Result<Principal> {
        let claims = self.session_tokens.verify(token)?;
        Ok(Principal {
            id: claims.sub,
            rate_limit_per_minute: self.config.rate_limit_per_minute,
            rate_limit_per_hour: self.config.rate_limit_per_hour,
        })
    }

    /// Mints a session token for an already-authenticated principal
    /// (e.g. after password verification at the login endpoint).
    pub fn mint_session(&self, subject: &str, email: &str) -> Result<String> {
        Ok(self.session_tokens.mint(subject, email, self.config.access_token_expire_minutes)?)
    }

    /// Creates a new interactive user account, bcrypt-hashing `password`
    /// before it ever reaches storage. Fails if `email` is already
    /// registered.
    pub fn register_user(&self, email: &str, password: &str, now_unix: i64) -> Result<User> {
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.to_string(),
            password_hash: hash_password(password)?,
            active: true,
            created_at: now_unix,
        };
        self.registry.create_user(&user)?;
        Ok(user)
    }

    /// Verifies `email`/`password` against the stored account and, on
    /// success, mints a session token. Every rejection path - unknown
    /// email, deactivated account, wrong password - returns the same
    /// [`GatewayError::AuthenticationFailure`] so a caller cannot
    /// distinguish them.
    pub fn login(&self, email: &str, password: &str) -> Result<String> {
        let user = self
            .registry
            .get_user_by_email(email)?
            .ok_or(GatewayError::AuthenticationFailure)?;

        if !user.active || !verify_password(password, &user.password_hash)? {
            return Err(GatewayError::AuthenticationFailure);
        }

        self.mint_session(&user.id, &user.email)
    }

    // ---- rate limiting ----------------------------------------------------

    /// Checks `principal`'s request against its rate limit window. For
    /// [`Profile::General`] traffic this is scaled to the principal's own
    /// per-key limits (an API key's configured caps, or the gateway-wide
    /// defaults for a session-token principal) rather than the profile's
    /// built-in defaults; [`Profile::Oauth`] always uses the stricter
    /// profile-wide caps, since those apply to the token-exchange flow
    /// itself rather than to any one already-authenticated key.
    pub fn check_rate_limit(&self, principal: &Principal, profile: Profile, now: Instant) -> Result<RateLimitStatus> {
        let override_limits = match profile {
            Profile::General => Some(sentinel_monitor::Limits {
                per_minute: principal.rate_limit_per_minute,
                per_hour: principal.rate_limit_per_hour,
            }),
            Profile::Oauth => None,
        };
        Ok(self.rate_limiter.check_with_limits(&principal.id, profile, now, override_limits)?)
    }

    // ---- threat detection -------------------------------------------------

    /// Runs the detector pipeline appropriate to `context` against
    /// `text`, persisting a single incident - carrying the first threat's
    /// type and severity - when the result crosses
    /// [`ThreatAssessment::INCIDENT_THRESHOLD`].
    pub fn inspect(&self, text: &str, context: ContextKind, principal: &Principal, now_unix: i64) -> Result<ThreatAssessment> {
        let assessment = self.detectors.assess(text, context, self.config.prompt_injection_detector.mode(), now_unix);

        if assessment.warrants_incident() {
            if let Some(first) = assessment.threats.first() {
                let id = uuid::Uuid::new_v4().to_string();
                if let Err(err) = self.registry.create_incident(
                    id,
                    format!("{:?}", first.threat_type),
                    first.severity,
                    text,
                    principal.id.clone(),
                    now_unix,
                ) {
                    tracing::error!(error = %err, "failed to persist incident");
                }
            }
        }

        Ok(assessment)
    }

    /// Detects and redacts PII in `text`. Not run automatically as part
    /// of [`Self::inspect`]; callers opt in explicitly.
    pub fn redact_pii(&self, text: &str) -> Result<String> {
        let entities = self.pii.detect(text)?;
        Ok(self.pii.redact(text, &entities))
    }

    /// Scores `text` for toxicity against the configured threshold.
    #[must_use]
    pub fn check_toxicity(&self, text: &str) -> bool {
        self.toxicity.analyze(text).is_toxic
    }

    // ---- policy enforcement ------------------------------------------------

    /// Evaluates every enabled policy owned by `principal` against
    /// `content`.
    pub fn enforce_policy(&self, content: &str, principal: &Principal) -> Result<PolicyEvaluation> {
        let policies = self.registry.list_policies(&principal.id)?;
        Ok(self.policy_engine.evaluate(content, &policies))
    }

    // ---- API key management ------------------------------------------------

    /// Mints a new API key for `owner_id`, persisting only its bcrypt hash
    /// and preview. The plaintext is returned here and nowhere else; the
    /// caller must hand it back to the user exactly once.
    pub fn issue_api_key(
        &self,
        owner_id: &str,
        name: &str,
        permissions: Vec<String>,
        rate_limit_per_minute: u32,
        rate_limit_per_hour: u32,
        expires_at: Option<i64>,
        now_unix: i64,
    ) -> Result<(ApiKey, String)> {
        let generated = generate_api_key()?;
        let row = ApiKey {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            name: name.to_string(),
            prefix: sentinel_auth::api_key::KEY_PREFIX.to_string(),
            hash: generated.hash,
            preview: generated.preview,
            permissions,
            rate_limit_per_minute,
            rate_limit_per_hour,
            active: true,
            expires_at,
            last_used_at: None,
            created_at: now_unix,
        };
        self.registry.create_api_key(&row)?;
        Ok((row, generated.plaintext))
    }

    /// Lists every API key owned by `owner_id`. Rows never carry plaintext,
    /// only the bcrypt hash and display preview.
    pub fn list_api_keys(&self, owner_id: &str) -> Result<Vec<ApiKey>> {
        Ok(self.registry.list_api_keys(owner_id)?)
    }

    /// Soft-deletes an API key, scoped to its owner.
    pub fn revoke_api_key(&self, id: &str, owner_id: &str) -> Result<()> {
        Ok(self.registry.revoke_api_key(id, owner_id)?)
    }

    // ---- provider credentials -----------------------------------------------

    /// Encrypts `plaintext` under the gateway's key-encryption secret and
    /// upserts the single active credential for `(owner_id, provider)`.
    /// The plaintext itself is never persisted or logged.
    pub fn store_provider_credential(
        &self,
        owner_id: &str,
        provider: &str,
        plaintext: &str,
        now_unix: i64,
    ) -> Result<ProviderCredential> {
        let ciphertext = encrypt_credential(&self.config.key_encryption_secret, plaintext)?;
        let last_four = last_four_of(plaintext);

        let existing_id = self
            .registry
            .get_provider_credential(owner_id, provider)?
            .map(|c| c.id);

        let row = ProviderCredential {
            id: existing_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            owner_id: owner_id.to_string(),
            provider: provider.to_string(),
            ciphertext,
            last_four,
            status: CredentialStatus::Active,
            updated_at: now_unix,
        };
        self.registry.upsert_provider_credential(&row)?;
        Ok(row)
    }

    /// Lists every provider credential owned by `owner_id`, masked to
    /// `last_four` for external display; callers must not surface
    /// `ciphertext` to anything outside the LLM proxy path.
    pub fn list_provider_credentials(&self, owner_id: &str) -> Result<Vec<ProviderCredential>> {
        Ok(self.registry.list_provider_credentials(owner_id)?)
    }

    /// Revokes a provider credential without deleting its row.
    pub fn revoke_provider_credential(&self, owner_id: &str, provider: &str) -> Result<()> {
        Ok(self.registry.revoke_provider_credential(owner_id, provider)?)
    }

    /// Deletes a provider credential outright.
    pub fn delete_provider_credential(&self, owner_id: &str, provider: &str) -> Result<bool> {
        Ok(self.registry.delete_provider_credential(owner_id, provider)?)
    }

    /// Decrypts the active credential for `(owner_id, provider)`, for use
    /// only on the path that forwards a request to the upstream LLM
    /// provider. The returned plaintext must never be logged or returned
    /// to an API caller.
    pub fn decrypt_provider_credential(&self, owner_id: &str, provider: &str) -> Result<Option<String>> {
        let Some(cred) = self.registry.get_provider_credential(owner_id, provider)? else {
            return Ok(None);
        };
        if cred.status != CredentialStatus::Active {
            return Ok(None);
        }
        let plaintext = decrypt_credential(&self.config.key_encryption_secret, &cred.ciphertext)?;
        Ok(Some(plaintext))
    }

    // ---- usage accounting ---------------------------------------------------

    /// Queues a usage event for background accounting. Never blocks the
    /// caller on the registry write; a full channel or a failed
    /// background write is logged but does not fail the request that
    /// triggered it.
    pub fn record_usage(&self, event: UsageEvent) {
        if self.usage_tx.send(event).is_err() {
            tracing::error!("usage accounting channel closed; event dropped");
        }
    }

    /// Reads back the total usage recorded for an API key. Exposed
    /// mainly for tests and admin tooling, since the write path is
    /// asynchronous.
    pub fn total_usage_for_key(&self, api_key_id: &str) -> Result<sentinel_registry::UsageCounter> {
        Ok(self.registry.total_usage_for_key(api_key_id)?)
    }

    /// Lists incidents recorded for a principal.
    pub fn list_incidents(&self, principal: &Principal) -> Result<Vec<Incident>> {
        Ok(self.registry.list_incidents(&principal.id)?)
    }
}


/// Opens a gateway registry path, creating parent directories as needed.
/// Thin wrapper kept for callers (the CLI) that want to validate a path
/// exists before committing to `Gateway::new`.
pub fn ensure_database_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| GatewayError::InternalError(format!("failed to create database directory: {e}")))?;
        }
    }
    Ok(())
}

/// Last four characters of a provider-credential plaintext, kept
/// unencrypted for display purposes alongside the ciphertext.
fn last_four_of(plaintext: &str) -> String {
    let chars: Vec<char> = plaintext.chars().collect();
    chars.iter().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect()
}
