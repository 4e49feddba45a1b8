//! Shared types for the detector crate: threat taxonomy, severities,
//! recommendations, and the crate's error type.
//!
//! # References
//!
//! - OWASP LLM Top 10: <https://owasp.org/www-project-top-10-for-large-language-model-applications/>
//! - MITRE ATLAS: <https://atlas.mitre.org/>

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use sentinel_registry::Severity;

/// Errors surfaced by the firewall crate.
///
/// Detectors recover locally wherever possible - a failed deep layer
/// degrades to the regex floor rather than erroring. This enum exists
/// for the remaining genuinely unrecoverable cases.
#[derive(Debug, Error)]
pub enum FirewallError {
    /// A pattern in the built-in catalogue failed to compile. This
    /// indicates a programming error, not bad input.
    #[error("pattern catalogue failed to compile: {0}")]
    PatternCompilation(String),

    /// The pluggable deep layer, NER labeler, or toxicity scorer could
    /// not be constructed.
    #[error("deep layer unavailable: {0}")]
    DeepLayerUnavailable(String),

    /// Input rejected before analysis.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, FirewallError>;

/// Types of threats the firewall can detect.
///
/// | Variant | Attack class | Detection method |
/// |---|---|---|
/// | `PromptInjection` | Instruction override | Regex catalogue + deep layer |
/// | `Jailbreak` | Safety-bypass subset of injection | Closed vocabulary |
/// | `DataExfiltration` | Sensitive data + transport verb | Regex + URL analysis |
///
/// # References
///
/// - OWASP LLM01: Prompt Injection
/// - OWASP LLM06: Sensitive Information Disclosure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatType {
    /// Attempt to override or subvert the model's instructions.
    ///
    /// Reference: Perez & Ribeiro, "Ignore This Title and HackAPrompt" (2023)
    PromptInjection,
    /// Closed-vocabulary subset of prompt injection aimed at disabling
    /// safety behaviour (DAN-style, developer mode, etc).
    ///
    /// Reference: Shen et al., "Do Anything Now" (2023)
    Jailbreak,
    /// Output causes the model to emit sensitive data alongside an
    /// embedded transport instruction.
    DataExfiltration,
}

impl ThreatType {
    /// Returns the OWASP LLM Top 10 category this threat maps to.
    #[must_use]
    pub fn owasp_category(&self) -> &'static str {
        match self {
            Self::PromptInjection | Self::Jailbreak => "LLM01: Prompt Injection",
            Self::DataExfiltration => "LLM06: Sensitive Information Disclosure",
        }
    }
}

/// The action a caller should take in response to a detector's verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Allow,
    Monitor,
    Flag,
    Redact,
    Block,
}

/// A single pattern hit, shared shape for injection, jailbreak, and
/// exfiltration matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectedPattern {
    /// Catalogue name of the pattern (stable, used in audit logs).
    pub name: &'static str,
    pub threat: ThreatType,
    pub confidence: f64,
    pub description: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ladder() {
        assert_eq!(Severity::from_confidence(0.95), Severity::Critical);
        assert_eq!(Severity::from_confidence(0.8), Severity::High);
        assert_eq!(Severity::from_confidence(0.6), Severity::Medium);
        assert_eq!(Severity::from_confidence(0.1), Severity::Low);
    }

    #[test]
    fn owasp_mapping() {
        assert_eq!(
            ThreatType::DataExfiltration.owasp_category(),
            "LLM06: Sensitive Information Disclosure"
        );
        assert_eq!(
            ThreatType::PromptInjection.owasp_category(),
            "LLM01: Prompt Injection"
        );
    }
}
