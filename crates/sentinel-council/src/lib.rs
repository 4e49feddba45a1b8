//! # Policy Engine
//!
//! Evaluates a principal's policies against request or response content
//! and produces REDACT/BLOCK/FLAG/ALERT decisions, plus a fixed registry
//! of compliance-template seed policies (GDPR, HIPAA, SOC2, PCI-DSS,
//! CCPA).
//!
//! Policy storage, ownership scoping, and versioning live in
//! `sentinel_registry`; this crate only implements match-and-aggregate
//! evaluation semantics over the `Policy`/`PolicyRule` types it defines.
//!
//! ## Evaluation
//!
//! For each enabled policy, rules run in descending priority order.
//! Condition matching is a literal substring search against content
//! (`PolicyCondition::needle`) - a known limitation of the source system
//! preserved here rather than silently replaced with a smarter
//! classifier. A `BLOCK` match from any policy makes the overall
//! decision disallowed regardless of what else matched.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sentinel_council::{PolicyEngine, ComplianceTemplate};
//!
//! let engine = PolicyEngine::new();
//! let policy = ComplianceTemplate::Gdpr.materialize("pol-1", "owner-1");
//! let result = engine.evaluate("customer ssn on file", &[policy]);
//! assert!(result.allowed); // redacted, not blocked
//! ```

pub mod error;
pub mod policy;
pub mod templates;

pub use error::PolicyError;
pub use policy::{PolicyEngine, PolicyEvaluation, PolicyViolation};
pub use templates::ComplianceTemplate;

/// Result type for policy engine operations.
pub type Result<T> = std::result::Result<T, PolicyError>;
