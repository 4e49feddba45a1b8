//! # Persistent Storage Layer
//!
//! A Sled-backed persistence layer for the gateway's entities. Each entity
//! gets its own tree (namespace); composite keys are built from the
//! natural identity of the row (e.g. `(owner_id, provider)` for provider
//! credentials) so lookups stay single-operation.
//!
//! ## Storage Structure
//!
//! | Tree | Key | Value | Purpose |
//! |------|-----|-------|---------|
//! | `users` | user id | serialized [`User`] | Account storage |
//! | `users_by_email` | normalized email | user id | Unique-email lookup |
//! | `api_keys` | key id | serialized [`ApiKey`] | Key storage |
//! | `api_key_usage` | `(key_id, endpoint, date, hour)` | serialized [`UsageCounter`] | Usage accounting |
//! | `provider_keys` | `(owner_id, provider)` | serialized [`ProviderCredential`] | Provider credential storage |
//! | `policies` | policy id | serialized [`Policy`] | Policy storage |
//! | `incidents` | incident id | serialized [`Incident`] | Incident storage |
//!
//! ## Security Notes
//!
//! - The database file should be stored on encrypted storage.
//! - File permissions should restrict access to the gateway process.
//! - Provider credential ciphertext, API key hashes, and password hashes
//!   are the only secrets this layer ever touches; plaintext never
//!   reaches it.

use crate::models::{
    ApiKey, Incident, Policy, ProviderCredential, RegistryError, Result, UsageCounter,
    UsageCounterKey, User,
};
use std::path::Path;

const USERS_TREE: &str = "users";
const USERS_BY_EMAIL_TREE: &str = "users_by_email";
const API_KEYS_TREE: &str = "api_keys";
const API_KEY_USAGE_TREE: &str = "api_key_usage";
const PROVIDER_KEYS_TREE: &str = "provider_keys";
const POLICIES_TREE: &str = "policies";
const INCIDENTS_TREE: &str = "incidents";

/// Wrapper around a Sled database for gateway storage.
///
/// # Thread Safety
///
/// The underlying Sled database is thread-safe. Multiple threads can
/// read and write concurrently; each logical write below is a single
/// `Tree` operation.
#[derive(Clone)]
pub struct Storage {
    db: sled::Db,
    users: sled::Tree,
    users_by_email: sled::Tree,
    api_keys: sled::Tree,
    api_key_usage: sled::Tree,
    provider_keys: sled::Tree,
    policies: sled::Tree,
    incidents: sled::Tree,
}

impl Storage {
    /// Opens or creates a storage database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Creates a temporary in-memory storage for testing.
    pub fn temporary() -> Result<Self> {
        let config = sled::Config::new().temporary(true);
        let db = config.open()?;
        Self::from_db(db)
    }

    fn from_db(db: sled::Db) -> Result<Self> {
        let users = db.open_tree(USERS_TREE)?;
        let users_by_email = db.open_tree(USERS_BY_EMAIL_TREE)?;
        let api_keys = db.open_tree(API_KEYS_TREE)?;
        let api_key_usage = db.open_tree(API_KEY_USAGE_TREE)?;
        let provider_keys = db.open_tree(PROVIDER_KEYS_TREE)?;
        let policies = db.open_tree(POLICIES_TREE)?;
        let incidents = db.open_tree(INCIDENTS_TREE)?;

        Ok(Storage {
            db,
            users,
            users_by_email,
            api_keys,
            api_key_usage,
            provider_keys,
            policies,
            incidents,
        })
    }

    // ---- users -----------------------------------------------------

    /// Inserts a new user, enforcing email uniqueness.
    pub fn create_user(&self, user: &User) -> Result<()> {
        let email_key = User::normalize_email(&user.email);
        if self.users_by_email.contains_key(email_key.as_bytes())? {
            return Err(RegistryError::LimitExceeded(format!(
                "email already registered: {email_key}"
            )));
        }
        let bytes = serde_json::to_vec(user)?;
        self.users.insert(user.id.as_bytes(), bytes)?;
        self.users_by_email
            .insert(email_key.as_bytes(), user.id.as_bytes())?;
        Ok(())
    }

    /// Overwrites an existing user row (e.g. deactivation).
    pub fn put_user(&self, user: &User) -> Result<()> {
        let bytes = serde_json::to_vec(user)?;
        self.users.insert(user.id.as_bytes(), bytes)?;
        Ok(())
    }

    /// Loads a user by id.
    pub fn get_user(&self, id: &str) -> Result<Option<User>> {
        match self.users.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Loads a user by email (case-insensitive).
    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let email_key = User::normalize_email(email);
        match self.users_by_email.get(email_key.as_bytes())? {
            Some(id_bytes) => {
                let id = String::from_utf8_lossy(&id_bytes).into_owned();
                self.get_user(&id)
            }
            None => Ok(None),
        }
    }

    // ---- api keys ----------------------------------------------------

    /// Number of currently active keys owned by `owner_id`.
    pub fn count_active_api_keys(&self, owner_id: &str) -> Result<usize> {
        let mut count = 0;
        for item in self.api_keys.iter() {
            let (_, bytes) = item?;
            let key: ApiKey = serde_json::from_slice(&bytes)?;
            if key.owner_id == owner_id && key.active {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Inserts a newly minted API key, enforcing the per-user active cap.
    pub fn create_api_key(&self, key: &ApiKey) -> Result<()> {
        if key.active && self.count_active_api_keys(&key.owner_id)? >= ApiKey::MAX_ACTIVE_PER_USER {
            return Err(RegistryError::LimitExceeded(format!(
                "user {} already has {} active API keys",
                key.owner_id,
                ApiKey::MAX_ACTIVE_PER_USER
            )));
        }
        let bytes = serde_json::to_vec(key)?;
        self.api_keys.insert(key.id.as_bytes(), bytes)?;
        Ok(())
    }

    /// Overwrites an API key row (e.g. to update `last_used_at` or revoke).
    pub fn put_api_key(&self, key: &ApiKey) -> Result<()> {
        let bytes = serde_json::to_vec(key)?;
        self.api_keys.insert(key.id.as_bytes(), bytes)?;
        Ok(())
    }

    /// Loads an API key row by id.
    pub fn get_api_key(&self, id: &str) -> Result<Option<ApiKey>> {
        match self.api_keys.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Lists every active key sharing `prefix`, for bcrypt verification
    /// against each candidate in turn.
    pub fn active_api_keys_with_prefix(&self, prefix: &str) -> Result<Vec<ApiKey>> {
        let mut matches = Vec::new();
        for item in self.api_keys.iter() {
            let (_, bytes) = item?;
            let key: ApiKey = serde_json::from_slice(&bytes)?;
            if key.active && key.prefix == prefix {
                matches.push(key);
            }
        }
        Ok(matches)
    }

    /// Lists every key owned by `owner_id`, active or not.
    pub fn list_api_keys_for_owner(&self, owner_id: &str) -> Result<Vec<ApiKey>> {
        let mut matches = Vec::new();
        for item in self.api_keys.iter() {
            let (_, bytes) = item?;
            let key: ApiKey = serde_json::from_slice(&bytes)?;
            if key.owner_id == owner_id {
                matches.push(key);
            }
        }
        Ok(matches)
    }

    // ---- provider credentials -----------------------------------------

    fn provider_key_bytes(owner_id: &str, provider: &str) -> Vec<u8> {
        format!("{owner_id}\0{provider}").into_bytes()
    }

    /// Creates or overwrites the single active credential for
    /// `(owner_id, provider)`.
    pub fn upsert_provider_credential(&self, cred: &ProviderCredential) -> Result<()> {
        let key = Self::provider_key_bytes(&cred.owner_id, &cred.provider);
        let bytes = serde_json::to_vec(cred)?;
        self.provider_keys.insert(key, bytes)?;
        Ok(())
    }

    /// Loads the credential for `(owner_id, provider)`, if any.
    pub fn get_provider_credential(&self, owner_id: &str, provider: &str) -> Result<Option<ProviderCredential>> {
        let key = Self::provider_key_bytes(owner_id, provider);
        match self.provider_keys.get(key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Deletes the credential for `(owner_id, provider)`.
    pub fn delete_provider_credential(&self, owner_id: &str, provider: &str) -> Result<bool> {
        let key = Self::provider_key_bytes(owner_id, provider);
        Ok(self.provider_keys.remove(key)?.is_some())
    }

    /// Lists every provider credential owned by `owner_id`.
    pub fn list_provider_credentials(&self, owner_id: &str) -> Result<Vec<ProviderCredential>> {
        let mut matches = Vec::new();
        for item in self.provider_keys.iter() {
            let (_, bytes) = item?;
            let cred: ProviderCredential = serde_json::from_slice(&bytes)?;
            if cred.owner_id == owner_id {
                matches.push(cred);
            }
        }
        Ok(matches)
    }

    // ---- usage accounting ----------------------------------------------

    /// Atomically adds `tokens`/`cost_millicents` to the bucket named by
    /// `key`, creating it at [`UsageCounter::ZERO`] on first hit.
    ///
    /// Implemented as a sled compare-and-swap loop via
    /// [`sled::Tree::fetch_and_update`], the embedded-database analogue of
    /// `INSERT ... ON CONFLICT DO UPDATE SET ... = existing + :delta`.
    pub fn accumulate_usage(
        &self,
        key: &UsageCounterKey,
        tokens: u64,
        cost_millicents: u64,
    ) -> Result<UsageCounter> {
        let tree_key = key.to_bytes();
        let mut result = UsageCounter::ZERO;

        self.api_key_usage
            .fetch_and_update(&tree_key, |existing| {
                let current = match existing {
                    Some(bytes) => serde_json::from_slice::<UsageCounter>(bytes).unwrap_or(UsageCounter::ZERO),
                    None => UsageCounter::ZERO,
                };
                let updated = current.accumulate(tokens, cost_millicents);
                result = updated;
                Some(serde_json::to_vec(&updated).expect("UsageCounter serialization cannot fail"))
            })?;

        Ok(result)
    }

    /// Reads a single usage bucket without mutating it.
    pub fn get_usage(&self, key: &UsageCounterKey) -> Result<UsageCounter> {
        match self.api_key_usage.get(key.to_bytes())? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => Ok(UsageCounter::ZERO),
        }
    }

    /// Sums every bucket belonging to `api_key_id`, across all endpoints
    /// and hours. A read-only roll-up over the stored counters.
    pub fn total_usage_for_key(&self, api_key_id: &str) -> Result<UsageCounter> {
        let mut total = UsageCounter::ZERO;
        let prefix = format!("{api_key_id}\0");
        for item in self.api_key_usage.scan_prefix(prefix.as_bytes()) {
            let (_, bytes) = item?;
            let counter: UsageCounter = serde_json::from_slice(&bytes)?;
            total.request_count = total.request_count.saturating_add(counter.request_count);
            total.tokens = total.tokens.saturating_add(counter.tokens);
            total.cost_millicents = total.cost_millicents.saturating_add(counter.cost_millicents);
        }
        Ok(total)
    }

    // ---- policies -----------------------------------------------------

    /// Creates or overwrites a policy row.
    pub fn put_policy(&self, policy: &Policy) -> Result<()> {
        let bytes = serde_json::to_vec(policy)?;
        self.policies.insert(policy.id.as_bytes(), bytes)?;
        Ok(())
    }

    /// Loads a policy by id.
    pub fn get_policy(&self, id: &str) -> Result<Option<Policy>> {
        match self.policies.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Lists every policy owned by `owner_id`.
    pub fn list_policies_for_owner(&self, owner_id: &str) -> Result<Vec<Policy>> {
        let mut matches = Vec::new();
        for item in self.policies.iter() {
            let (_, bytes) = item?;
            let policy: Policy = serde_json::from_slice(&bytes)?;
            if policy.owner_id == owner_id {
                matches.push(policy);
            }
        }
        Ok(matches)
    }

    /// Deletes a policy by id, scoped to `owner_id`.
    pub fn delete_policy(&self, id: &str, owner_id: &str) -> Result<bool> {
        match self.get_policy(id)? {
            Some(policy) if policy.owner_id == owner_id => {
                self.policies.remove(id.as_bytes())?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    // ---- incidents ------------------------------------------------------

    /// Creates an incident row.
    pub fn put_incident(&self, incident: &Incident) -> Result<()> {
        let bytes = serde_json::to_vec(incident)?;
        self.incidents.insert(incident.id.as_bytes(), bytes)?;
        Ok(())
    }

    /// Loads an incident by id.
    pub fn get_incident(&self, id: &str) -> Result<Option<Incident>> {
        match self.incidents.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Lists every incident owned by `owner_id`.
    pub fn list_incidents_for_owner(&self, owner_id: &str) -> Result<Vec<Incident>> {
        let mut matches = Vec::new();
        for item in self.incidents.iter() {
            let (_, bytes) = item?;
            let incident: Incident = serde_json::from_slice(&bytes)?;
            if incident.owner_id == owner_id {
                matches.push(incident);
            }
        }
        Ok(matches)
    }

    /// Flushes all pending writes to disk.
    pub fn flush(&self) -> Result<usize> {
        Ok(self.db.flush()?)
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("users", &self.users.len())
            .field("api_keys", &self.api_keys.len())
            .field("policies", &self.policies.len())
            .field("incidents", &self.incidents.len())
            .finish()
    }
}
