//! # sentinel-registry
//!
//! Persistent storage for the gateway: user accounts, API keys, provider
//! credentials, usage counters, policies, and incidents, all backed by an
//! embedded Sled database.
//!
//! ## Purpose
//!
//! 1. **RFC 8785 Canonicalization** - Deterministic JSON serialization,
//!    retained here for computing stable content hashes.
//!
//! 2. **Persistent Registry** - Sled-backed storage for every entity in
//!    the gateway's data model, surviving restarts.
//!
//! 3. **Ownership-scoped access** - every multi-tenant read/write method
//!    takes the caller's principal id and filters on it.
//!
//! ## Storage Structure
//!
//! | Tree | Key | Value |
//! |------|-----|-------|
//! | `users` | user id | `User` |
//! | `users_by_email` | normalized email | user id |
//! | `api_keys` | key id | `ApiKey` |
//! | `api_key_usage` | `(key_id, endpoint, date, hour)` | `UsageCounter` |
//! | `provider_keys` | `(owner_id, provider)` | `ProviderCredential` |
//! | `policies` | policy id | `Policy` |
//! | `incidents` | incident id | `Incident` |
//!
//! ## References
//!
//! - **RFC 8785** - "JSON Canonicalization Scheme (JCS)"
//!   <https://www.rfc-editor.org/rfc/rfc8785>
//! - **NIST FIPS 180-4** - "Secure Hash Standard (SHS)" - SHA-256 specification.
//!   <https://csrc.nist.gov/publications/detail/fips/180/4/final>
//! - **Sled Documentation** - Embedded database for persistent storage.
//!   <https://sled.rs/>
//!
//! ## Usage
//!
//! ```rust,no_run
//! use sentinel_registry::Registry;
//!
//! let registry = Registry::new("./registry.db").unwrap();
//! let keys = registry.list_api_keys("user-1").unwrap();
//! println!("{} active keys", keys.iter().filter(|k| k.active).count());
//! ```
//!
//! ## Security Considerations
//!
//! - **Storage Security**: The Sled database should be stored on encrypted
//!   storage with appropriate access controls. The registry itself does not
//!   encrypt data at rest beyond what is already ciphertext (provider
//!   credentials, API key hashes, password hashes).

pub mod canonicalize;
pub mod models;
pub mod registry;
pub mod storage;

pub use models::{
    ApiKey, CredentialStatus, Hash, Incident, IncidentStatus, Policy, PolicyAction,
    PolicyCondition, PolicyRule, ProviderCredential, RegistryError, Result, Severity,
    UsageCounter, UsageCounterKey, User, HASH_SIZE, PERMISSION_VOCABULARY, is_known_permission,
};
pub use registry::Registry;
