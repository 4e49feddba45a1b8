//! # PII Detector & Redactor
//!
//! Closed entity-type taxonomy scanned with a regex floor, optionally
//! augmented by a pluggable NER strategy for entity classes regex can't
//! reliably catch (names, addresses). User-supplied name lists are
//! matched as a fixed string set, independent of either layer.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::FirewallError;

/// Closed set of entity types the detector recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Email,
    Phone,
    Ssn,
    CreditCard,
    IpAddress,
    Name,
    Address,
    DateOfBirth,
    PassportNumber,
    DriverLicense,
    BankAccount,
    MedicalRecord,
}

/// A single detected PII entity.
#[derive(Debug, Clone)]
pub struct PiiEntity {
    pub entity_type: EntityType,
    pub label: String,
    pub start: usize,
    pub end: usize,
    pub confidence: f64,
}

/// Strategy for labeling free-text entities the regex floor cannot
/// reliably catch (names, addresses). Implementors return raw labels
/// which [`PiiDetector`] maps into the closed [`EntityType`] set;
/// anything it doesn't recognize is mapped to `EntityType::Name`.
pub trait NerLabeler: Send + Sync {
    fn label(&self, text: &str) -> Vec<(String, usize, usize, f64)>;
}

fn map_raw_label(label: &str) -> EntityType {
    match label.to_lowercase().as_str() {
        "person" | "name" => EntityType::Name,
        "address" | "location" | "gpe" => EntityType::Address,
        "date_of_birth" | "dob" => EntityType::DateOfBirth,
        _ => EntityType::Name,
    }
}

struct RegexRule {
    entity_type: EntityType,
    regex: Regex,
}

/// Detects and redacts PII entities in text.
pub struct PiiDetector {
    rules: Vec<RegexRule>,
    name_patterns: HashMap<String, Regex>,
    ner: OnceLock<Option<Box<dyn NerLabeler>>>,
}

impl PiiDetector {
    /// Builds a detector with the regex floor only, and a set of
    /// user-supplied names to match as `EntityType::Name` entities.
    #[must_use]
    pub fn new(names: &[String]) -> Self {
        let name_patterns = names
            .iter()
            .filter_map(|name| {
                let escaped = regex::escape(name);
                Regex::new(&format!(r"(?i)\b{escaped}\b")).ok().map(|r| (name.clone(), r))
            })
            .collect();

        Self {
            rules: Self::build_rules(),
            name_patterns,
            ner: OnceLock::new(),
        }
    }

    /// Installs a NER strategy. Idempotent: only the first call takes
    /// effect, matching the detector's lazy-singleton construction
    /// pattern elsewhere in this crate.
    pub fn with_ner(self, labeler: Box<dyn NerLabeler>) -> Self {
        let _ = self.ner.set(Some(labeler));
        self
    }

    fn build_rules() -> Vec<RegexRule> {
        vec![
            RegexRule {
                entity_type: EntityType::Email,
                regex: Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap(),
            },
            RegexRule {
                entity_type: EntityType::Phone,
                // `\b` alone can't anchor right before `(`: a space followed by `(`
                // is non-word/non-word, so no boundary exists there. `(?=\()`
                // covers that start position so the parenthesized area code is
                // consumed as part of the match instead of being left behind.
                regex: Regex::new(r"(?:\b|(?=\())(\+?1[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}\b").unwrap(),
            },
            RegexRule {
                entity_type: EntityType::Ssn,
                regex: Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").unwrap(),
            },
            RegexRule {
                entity_type: EntityType::CreditCard,
                regex: Regex::new(r"\b\d{4}[-\s]?\d{4}[-\s]?\d{4}[-\s]?\d{4}\b").unwrap(),
            },
            RegexRule {
                entity_type: EntityType::IpAddress,
                regex: Regex::new(r"\b\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}\b").unwrap(),
            },
        ]
    }

    /// Scans `text` for PII entities.
    pub fn detect(&self, text: &str) -> Result<Vec<PiiEntity>, FirewallError> {
        let mut entities = Vec::new();

        for rule in &self.rules {
            for m in rule.regex.find_iter(text) {
                entities.push(PiiEntity {
                    entity_type: rule.entity_type,
                    label: format!("{:?}", rule.entity_type).to_lowercase(),
                    start: m.start(),
                    end: m.end(),
                    confidence: 0.85,
                });
            }
        }

        for (name, regex) in &self.name_patterns {
            for m in regex.find_iter(text) {
                entities.push(PiiEntity {
                    entity_type: EntityType::Name,
                    label: name.clone(),
                    start: m.start(),
                    end: m.end(),
                    confidence: 0.95,
                });
            }
        }

        if let Some(Some(labeler)) = self.ner.get() {
            for (raw_label, start, end, confidence) in labeler.label(text) {
                entities.push(PiiEntity {
                    entity_type: map_raw_label(&raw_label),
                    label: raw_label,
                    start,
                    end,
                    confidence,
                });
            }
        }

        Ok(entities)
    }

    /// Redacts every detected entity, replacing it with
    /// `[<LABEL_OR_TYPE>_REDACTED]` in reverse-position order.
    #[must_use]
    pub fn redact(&self, text: &str, entities: &[PiiEntity]) -> String {
        let mut sorted: Vec<&PiiEntity> = entities.iter().collect();
        sorted.sort_by(|a, b| b.start.cmp(&a.start));

        let mut out = text.to_string();
        for entity in sorted {
            let tag = if entity.label.is_empty() {
                format!("{:?}", entity.entity_type).to_uppercase()
            } else {
                entity.label.to_uppercase()
            };
            let replacement = format!("[{tag}_REDACTED]");
            out.replace_range(entity.start..entity.end, &replacement);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_email_and_phone() {
        let detector = PiiDetector::new(&[]);
        let entities = detector.detect("Contact me at jane@example.com or 555-123-4567").unwrap();
        assert!(entities.iter().any(|e| e.entity_type == EntityType::Email));
        assert!(entities.iter().any(|e| e.entity_type == EntityType::Phone));
    }

    #[test]
    fn parenthesized_phone_matches_and_redacts_whole() {
        let detector = PiiDetector::new(&[]);
        let text = "Call me at (555) 123-4567 or john@example.com";
        let entities = detector.detect(text).unwrap();
        let redacted = detector.redact(text, &entities);
        assert_eq!(redacted, "Call me at [PHONE_REDACTED] or [EMAIL_REDACTED]");
    }

    #[test]
    fn custom_name_list_matches() {
        let detector = PiiDetector::new(&["Alice Smith".to_string()]);
        let entities = detector.detect("Please forward this to Alice Smith directly").unwrap();
        assert!(entities.iter().any(|e| e.entity_type == EntityType::Name && e.label == "Alice Smith"));
    }

    #[test]
    fn redact_replaces_and_preserves_surrounding_text() {
        let detector = PiiDetector::new(&[]);
        let text = "email jane@example.com now";
        let entities = detector.detect(text).unwrap();
        let redacted = detector.redact(text, &entities);
        assert!(redacted.starts_with("email "));
        assert!(redacted.ends_with(" now"));
        assert!(!redacted.contains("jane@example.com"));
    }

    #[test]
    fn no_pii_returns_empty() {
        let detector = PiiDetector::new(&[]);
        let entities = detector.detect("Nothing sensitive in this sentence.").unwrap();
        assert!(entities.is_empty());
    }

    struct StubNer;
    impl NerLabeler for StubNer {
        fn label(&self, _text: &str) -> Vec<(String, usize, usize, f64)> {
            vec![("PERSON".to_string(), 0, 4, 0.8)]
        }
    }

    #[test]
    fn ner_labels_map_into_closed_set() {
        let detector = PiiDetector::new(&[]).with_ner(Box::new(StubNer));
        let entities = detector.detect("John works here").unwrap();
        assert!(entities.iter().any(|e| e.entity_type == EntityType::Name));
    }
}
