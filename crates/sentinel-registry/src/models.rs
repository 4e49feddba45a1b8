//! # Core Data Models for the Gateway Registry
//!
//! This module defines the persisted entities behind the gateway: user
//! accounts, API keys, provider credentials, usage counters, policies, and
//! incidents. Every row is owned, directly or transitively, by a user id;
//! list/get/update/delete operations are expected to filter on it.
//!
//! ## References
//!
//! - NIST FIPS 180-4 for hash size (SHA-256 = 32 bytes)

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// SHA-256 hash output size in bytes.
pub const HASH_SIZE: usize = 32;

/// A 32-byte SHA-256 hash value.
pub type Hash = [u8; HASH_SIZE];

/// Closed permission vocabulary an API key may be scoped to.
///
/// Unknown permission strings are rejected at key-creation time rather
/// than stored verbatim, so the registry never has to guess at the
/// meaning of a permission it doesn't recognize.
pub const PERMISSION_VOCABULARY: &[&str] = &[
    "security:analyze",
    "security:batch",
    "filter:pii",
    "filter:toxicity",
    "llm:chat",
    "llm:stream",
    "analytics:read",
    "test:run",
];

/// Returns `true` if `permission` is in the closed vocabulary.
pub fn is_known_permission(permission: &str) -> bool {
    PERMISSION_VOCABULARY.contains(&permission)
}

/// An interactive user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Opaque, immutable identifier.
    pub id: String,
    /// Unique email, compared case-insensitively.
    pub email: String,
    /// bcrypt hash of the account password.
    pub password_hash: String,
    /// Whether the account may authenticate. Accounts are never hard
    /// deleted, only deactivated.
    pub active: bool,
    /// Unix seconds.
    pub created_at: i64,
}

impl User {
    /// Normalizes an email for uniqueness comparisons: lowercase, trimmed.
    pub fn normalize_email(email: &str) -> String {
        email.trim().to_lowercase()
    }
}

/// A long-lived programmatic API key.
///
/// The plaintext secret is never persisted; only `hash` and `preview`
/// survive past the moment of creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKey {
    /// Opaque identifier.
    pub id: String,
    /// Owning user's id.
    pub owner_id: String,
    /// Caller-assigned display name.
    pub name: String,
    /// Fixed literal prefix, always `rmp_live_`.
    pub prefix: String,
    /// bcrypt hash of the full plaintext key (cost >= 12).
    pub hash: String,
    /// Non-sensitive preview: first 12 chars, `****`, last 4.
    pub preview: String,
    /// Permissions drawn from [`PERMISSION_VOCABULARY`].
    pub permissions: Vec<String>,
    /// Requests allowed per minute under this key.
    pub rate_limit_per_minute: u32,
    /// Requests allowed per hour under this key.
    pub rate_limit_per_hour: u32,
    /// Whether the key may still authenticate.
    pub active: bool,
    /// Optional absolute expiry, Unix seconds.
    pub expires_at: Option<i64>,
    /// Unix seconds of the most recent successful use, if any.
    pub last_used_at: Option<i64>,
    /// Unix seconds of creation.
    pub created_at: i64,
}

impl ApiKey {
    /// Maximum number of simultaneously active keys per user.
    pub const MAX_ACTIVE_PER_USER: usize = 10;
}

/// Status of an upstream provider credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialStatus {
    Active,
    Revoked,
}

/// An encrypted upstream LLM provider API key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderCredential {
    /// Opaque identifier.
    pub id: String,
    /// Owning user's id.
    pub owner_id: String,
    /// Provider tag, e.g. `"openai"`, `"anthropic"`.
    pub provider: String,
    /// `base64(nonce(12) || aead_ciphertext)`.
    pub ciphertext: String,
    /// Last 4 plaintext characters, kept unencrypted for display.
    pub last_four: String,
    /// Current status.
    pub status: CredentialStatus,
    /// Unix seconds of creation or last overwrite.
    pub updated_at: i64,
}

/// Composite key identifying one usage-counter bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UsageCounterKey {
    /// Owning API key's id.
    pub api_key_id: String,
    /// The endpoint name hit, e.g. `"analyze"`.
    pub endpoint: String,
    /// UTC calendar date, `YYYY-MM-DD`.
    pub date: String,
    /// UTC hour of day, 0-23.
    pub hour: u8,
}

impl UsageCounterKey {
    /// Serializes this key to the byte string used as a sled key.
    pub fn to_bytes(&self) -> Vec<u8> {
        format!(
            "{}\0{}\0{}\0{:02}",
            self.api_key_id, self.endpoint, self.date, self.hour
        )
        .into_bytes()
    }
}

/// A single usage-counter bucket: request count, tokens, and cost
/// accrued by one API key against one endpoint within one UTC hour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UsageCounter {
    pub request_count: u64,
    pub tokens: u64,
    pub cost_millicents: u64,
}

impl UsageCounter {
    /// Zero-valued counter, the starting point for a fresh bucket.
    pub const ZERO: UsageCounter = UsageCounter {
        request_count: 0,
        tokens: 0,
        cost_millicents: 0,
    };

    /// Returns this counter with `delta` accumulated into it. Saturating,
    /// since a counter can only grow.
    pub fn accumulate(self, tokens: u64, cost_millicents: u64) -> Self {
        UsageCounter {
            request_count: self.request_count.saturating_add(1),
            tokens: self.tokens.saturating_add(tokens),
            cost_millicents: self.cost_millicents.saturating_add(cost_millicents),
        }
    }
}

/// Closed condition vocabulary a policy rule may match against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyCondition {
    ContainsPii,
    ContainsPhi,
    Profanity,
    DataRetentionExceeded,
    UnauthorizedAccess,
    AuditLogRequired,
    EncryptionRequired,
}

impl PolicyCondition {
    /// The literal substring this condition searches for in content.
    ///
    /// Matching is deliberately a plain substring search, not a smarter
    /// classifier; see the policy engine's module documentation.
    pub fn needle(self) -> &'static str {
        match self {
            PolicyCondition::ContainsPii => "ssn",
            PolicyCondition::ContainsPhi => "diagnosis",
            PolicyCondition::Profanity => "profanity",
            PolicyCondition::DataRetentionExceeded => "retention",
            PolicyCondition::UnauthorizedAccess => "unauthorized",
            PolicyCondition::AuditLogRequired => "audit",
            PolicyCondition::EncryptionRequired => "unencrypted",
        }
    }
}

/// Action a matched policy rule takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyAction {
    Allow,
    Block,
    Redact,
    Flag,
    Alert,
}

/// One rule within a policy. Has no identity of its own; it only exists
/// embedded in a [`Policy`]'s rule list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRule {
    pub condition: PolicyCondition,
    pub action: PolicyAction,
    /// Higher priority rules are evaluated first.
    pub priority: i32,
}

/// The kind of policy, used purely as a display/grouping label; behavior
/// is entirely determined by the embedded rule list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub rules: Vec<PolicyRule>,
    pub tags: Vec<String>,
    pub enabled: bool,
    /// Incremented on every mutation; history is not retained.
    pub version: u32,
}

impl Policy {
    /// Returns the rule list sorted by descending priority, the order
    /// evaluation must proceed in.
    pub fn rules_by_priority(&self) -> Vec<&PolicyRule> {
        let mut rules: Vec<&PolicyRule> = self.rules.iter().collect();
        rules.sort_by(|a, b| b.priority.cmp(&a.priority));
        rules
    }
}

/// Threat severity, shared by detector output and incidents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Maps a confidence score onto the severity ladder, mirroring the
    /// recommendation ladder used by the detectors.
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= 0.9 {
            Severity::Critical
        } else if confidence >= 0.75 {
            Severity::High
        } else if confidence >= 0.5 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

/// Current disposition of an [`Incident`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    Open,
    Investigating,
    Resolved,
    FalsePositive,
}

impl IncidentStatus {
    /// Whether transitioning from `self` to `next` is permitted. All
    /// forward transitions are allowed except re-opening a closed
    /// incident, which must go through `investigating` first.
    pub fn can_transition_to(self, next: IncidentStatus) -> bool {
        use IncidentStatus::*;
        match (self, next) {
            (a, b) if a == b => true,
            (Open, Investigating) | (Open, Resolved) | (Open, FalsePositive) => true,
            (Investigating, Resolved) | (Investigating, FalsePositive) => true,
            (Investigating, Open) => true,
            _ => false,
        }
    }
}

/// A persisted record of a high-risk inspection result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Incident {
    pub id: String,
    pub threat_type: String,
    pub severity: Severity,
    /// Truncated to at most 200 characters.
    pub content_preview: String,
    pub owner_id: String,
    pub detected_at: i64,
    pub status: IncidentStatus,
}

impl Incident {
    /// Maximum length, in bytes, of a stored content preview.
    pub const MAX_PREVIEW_LEN: usize = 200;

    /// Truncates `content` to [`Self::MAX_PREVIEW_LEN`] bytes on a char
    /// boundary, so multi-byte UTF-8 sequences are never split.
    pub fn truncate_preview(content: &str) -> String {
        if content.len() <= Self::MAX_PREVIEW_LEN {
            return content.to_string();
        }
        let mut end = Self::MAX_PREVIEW_LEN;
        while !content.is_char_boundary(end) {
            end -= 1;
        }
        content[..end].to_string()
    }
}

/// Errors that can occur during registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("database error: {0}")]
    Database(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    #[error("unknown permission: {0}")]
    UnknownPermission(String),

    #[error("invalid state transition")]
    InvalidTransition,
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_vocabulary_membership() {
        assert!(is_known_permission("llm:chat"));
        assert!(!is_known_permission("llm:unlimited"));
    }

    #[test]
    fn test_policy_rules_sorted_by_priority_descending() {
        let policy = Policy {
            id: "p1".into(),
            owner_id: "u1".into(),
            name: "test".into(),
            rules: vec![
                PolicyRule { condition: PolicyCondition::Profanity, action: PolicyAction::Flag, priority: 1 },
                PolicyRule { condition: PolicyCondition::ContainsPii, action: PolicyAction::Redact, priority: 10 },
            ],
            tags: vec![],
            enabled: true,
            version: 1,
        };
        let sorted = policy.rules_by_priority();
        assert_eq!(sorted[0].priority, 10);
        assert_eq!(sorted[1].priority, 1);
    }

    #[test]
    fn test_severity_ladder() {
        assert_eq!(Severity::from_confidence(0.95), Severity::Critical);
        assert_eq!(Severity::from_confidence(0.8), Severity::High);
        assert_eq!(Severity::from_confidence(0.6), Severity::Medium);
        assert_eq!(Severity::from_confidence(0.1), Severity::Low);
    }

    #[test]
    fn test_incident_status_transitions() {
        assert!(IncidentStatus::Open.can_transition_to(IncidentStatus::Investigating));
        assert!(IncidentStatus::Investigating.can_transition_to(IncidentStatus::Resolved));
        assert!(!IncidentStatus::Resolved.can_transition_to(IncidentStatus::Open));
    }

    #[test]
    fn test_truncate_preview_respects_char_boundaries() {
        let long = "a".repeat(250);
        let preview = Incident::truncate_preview(&long);
        assert_eq!(preview.len(), Incident::MAX_PREVIEW_LEN);
    }

    #[test]
    fn test_usage_counter_accumulate() {
        let c = UsageCounter::ZERO.accumulate(100, 50);
        let c = c.accumulate(200, 75);
        assert_eq!(c.request_count, 2);
        assert_eq!(c.tokens, 300);
        assert_eq!(c.cost_millicents, 125);
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(User::normalize_email("  Foo@Example.COM "), "foo@example.com");
    }
}
