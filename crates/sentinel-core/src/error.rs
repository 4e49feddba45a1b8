//! Error types for the gateway facade.
//!
//! Every component crate's error type converts into one of the variants
//! here. The mapping is deliberately lossy in places: an [`AuthError`]
//! always collapses to [`GatewayError::AuthenticationFailure`] regardless
//! of which specific credential check failed, matching that crate's own
//! "don't let a caller distinguish wrong password from no such key"
//! contract. Detail that would help an operator but not an attacker goes
//! into a `tracing` event at the call site, not into the error variant.
//!
//! [`AuthError`]: sentinel_auth::AuthError

use thiserror::Error;

use sentinel_auth::AuthError;
use sentinel_council::PolicyError;
use sentinel_firewall::FirewallError;
use sentinel_monitor::MonitorError;
use sentinel_registry::RegistryError;

/// Result type alias for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Errors surfaced by the gateway facade.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Request input failed structural or range validation before any
    /// detector or storage call ran.
    #[error("validation failed: {0}")]
    ValidationFailure(String),

    /// Credential verification failed: bad password, unknown or expired
    /// API key, malformed or expired session token.
    #[error("authentication failed")]
    AuthenticationFailure,

    /// The caller authenticated successfully but lacks permission for the
    /// requested operation.
    #[error("not authorized for this operation")]
    AuthorizationFailure,

    /// The requested resource does not exist, or exists but is owned by
    /// another principal (the two are deliberately indistinguishable to
    /// the caller).
    #[error("not found: {0}")]
    NotFound(String),

    /// The caller's rate limit window is exhausted.
    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    QuotaExceeded { retry_after_secs: u64 },

    /// Request body exceeded the configured size ceiling.
    #[error("payload too large")]
    PayloadTooLarge,

    /// A call to an upstream LLM provider failed.
    #[error("upstream provider failure: {0}")]
    UpstreamFailure(String),

    /// An error with no useful external explanation: a storage failure,
    /// a corrupt pattern catalogue, or other condition a caller cannot
    /// act on.
    #[error("internal error: {0}")]
    InternalError(String),
}

impl From<AuthError> for GatewayError {
    fn from(err: AuthError) -> Self {
        tracing::warn!(error = %err, "authentication failed");
        GatewayError::AuthenticationFailure
    }
}

impl From<RegistryError> for GatewayError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(what) => GatewayError::NotFound(what),
            RegistryError::UnknownPermission(perm) => {
                GatewayError::ValidationFailure(format!("unknown permission: {perm}"))
            }
            RegistryError::LimitExceeded(msg) => GatewayError::ValidationFailure(msg),
            RegistryError::InvalidTransition => {
                GatewayError::ValidationFailure("invalid status transition".into())
            }
            RegistryError::Database(_) | RegistryError::Serialization(_) => {
                GatewayError::InternalError(err.to_string())
            }
        }
    }
}

impl From<FirewallError> for GatewayError {
    fn from(err: FirewallError) -> Self {
        match err {
            FirewallError::InvalidInput(msg) => GatewayError::ValidationFailure(msg),
            FirewallError::PatternCompilation(_) | FirewallError::DeepLayerUnavailable(_) => {
                GatewayError::InternalError(err.to_string())
            }
        }
    }
}

impl From<MonitorError> for GatewayError {
    fn from(err: MonitorError) -> Self {
        let MonitorError::RateLimitExceeded { retry_after_secs, .. } = err;
        GatewayError::QuotaExceeded { retry_after_secs }
    }
}

impl From<PolicyError> for GatewayError {
    fn from(err: PolicyError) -> Self {
        match err {
            PolicyError::UnknownTemplate(name) => {
                GatewayError::ValidationFailure(format!("unknown compliance template: {name}"))
            }
            PolicyError::PolicyNotFound(id) => GatewayError::NotFound(format!("policy {id}")),
            PolicyError::Internal(msg) => GatewayError::InternalError(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_collapses_to_authentication_failure() {
        let err: GatewayError = AuthError::InvalidCredential.into();
        assert!(matches!(err, GatewayError::AuthenticationFailure));

        let err: GatewayError = AuthError::TokenExpired.into();
        assert!(matches!(err, GatewayError::AuthenticationFailure));
    }

    #[test]
    fn test_registry_not_found_maps_through() {
        let err: GatewayError = RegistryError::NotFound("api key k1".into()).into();
        assert!(matches!(err, GatewayError::NotFound(ref s) if s == "api key k1"));
    }

    #[test]
    fn test_rate_limit_carries_retry_after() {
        let err: GatewayError = MonitorError::RateLimitExceeded {
            client: "client-a".into(),
            retry_after_secs: 42,
        }
        .into();
        assert!(matches!(err, GatewayError::QuotaExceeded { retry_after_secs: 42 }));
    }

    #[test]
    fn test_policy_not_found_maps_to_not_found() {
        let err: GatewayError = PolicyError::PolicyNotFound("p1".into()).into();
        assert!(matches!(err, GatewayError::NotFound(_)));
    }
}
