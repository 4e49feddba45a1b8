//! # Compliance Policy Templates
//!
//! A fixed registry of seed policies for common regulatory regimes.
//! Materializing a template produces an ordinary [`Policy`] the caller
//! still owns and can store, edit, or delete through the registry like
//! any other policy - templates are a starting point, not a managed
//! resource of their own.

use sentinel_registry::{Policy, PolicyAction, PolicyCondition, PolicyRule};

use crate::error::PolicyError;

/// Named compliance regimes with a pre-built rule set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComplianceTemplate {
    Gdpr,
    Hipaa,
    Soc2,
    PciDss,
    Ccpa,
}

impl ComplianceTemplate {
    /// Parses a template by its conventional uppercase name
    /// (`GDPR`, `HIPAA`, `SOC2`, `PCI-DSS`, `CCPA`).
    pub fn parse(name: &str) -> Result<Self, PolicyError> {
        match name.to_uppercase().as_str() {
            "GDPR" => Ok(Self::Gdpr),
            "HIPAA" => Ok(Self::Hipaa),
            "SOC2" => Ok(Self::Soc2),
            "PCI-DSS" | "PCI_DSS" | "PCIDSS" => Ok(Self::PciDss),
            "CCPA" => Ok(Self::Ccpa),
            other => {
                tracing::warn!(template = other, "unknown compliance template requested");
                Err(PolicyError::UnknownTemplate(other.to_string()))
            }
        }
    }

    fn rules(self) -> Vec<PolicyRule> {
        match self {
            Self::Gdpr => vec![
                PolicyRule { condition: PolicyCondition::ContainsPii, action: PolicyAction::Redact, priority: 10 },
                PolicyRule { condition: PolicyCondition::DataRetentionExceeded, action: PolicyAction::Block, priority: 9 },
            ],
            Self::Hipaa => vec![
                PolicyRule { condition: PolicyCondition::ContainsPhi, action: PolicyAction::Redact, priority: 10 },
                PolicyRule { condition: PolicyCondition::UnauthorizedAccess, action: PolicyAction::Block, priority: 10 },
            ],
            Self::Soc2 => vec![
                PolicyRule { condition: PolicyCondition::AuditLogRequired, action: PolicyAction::Flag, priority: 5 },
                PolicyRule { condition: PolicyCondition::UnauthorizedAccess, action: PolicyAction::Alert, priority: 8 },
            ],
            Self::PciDss => vec![
                PolicyRule { condition: PolicyCondition::ContainsPii, action: PolicyAction::Redact, priority: 10 },
                PolicyRule { condition: PolicyCondition::EncryptionRequired, action: PolicyAction::Block, priority: 9 },
            ],
            Self::Ccpa => vec![
                PolicyRule { condition: PolicyCondition::ContainsPii, action: PolicyAction::Redact, priority: 10 },
                PolicyRule { condition: PolicyCondition::DataRetentionExceeded, action: PolicyAction::Flag, priority: 6 },
            ],
        }
    }

    fn tags(self) -> Vec<String> {
        match self {
            Self::Gdpr => vec!["gdpr", "compliance", "eu"],
            Self::Hipaa => vec!["hipaa", "compliance", "healthcare"],
            Self::Soc2 => vec!["soc2", "compliance", "security"],
            Self::PciDss => vec!["pci_dss", "compliance", "payments"],
            Self::Ccpa => vec!["ccpa", "compliance", "privacy"],
        }
        .into_iter()
        .map(str::to_string)
        .collect()
    }

    fn display_name(self) -> &'static str {
        match self {
            Self::Gdpr => "GDPR",
            Self::Hipaa => "HIPAA",
            Self::Soc2 => "SOC2",
            Self::PciDss => "PCI-DSS",
            Self::Ccpa => "CCPA",
        }
    }

    /// Materializes a new, unsaved policy for `owner_id`. Version starts
    /// at 0; the registry sets it to 1 on first `put_policy`.
    #[must_use]
    pub fn materialize(self, id: impl Into<String>, owner_id: impl Into<String>) -> Policy {
        Policy {
            id: id.into(),
            owner_id: owner_id.into(),
            name: format!("{} baseline", self.display_name()),
            rules: self.rules(),
            tags: self.tags(),
            enabled: true,
            version: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gdpr_template_has_expected_rules() {
        let policy = ComplianceTemplate::Gdpr.materialize("pol-1", "owner-1");
        assert_eq!(policy.rules.len(), 2);
        assert!(policy.tags.contains(&"gdpr".to_string()));
        assert_eq!(policy.rules_by_priority()[0].condition, PolicyCondition::ContainsPii);
    }

    #[test]
    fn hipaa_template_blocks_unauthorized_access() {
        let policy = ComplianceTemplate::Hipaa.materialize("pol-2", "owner-1");
        assert!(policy
            .rules
            .iter()
            .any(|r| r.condition == PolicyCondition::UnauthorizedAccess && r.action == PolicyAction::Block));
    }

    #[test]
    fn parse_accepts_hyphenated_and_underscored_pci() {
        assert_eq!(ComplianceTemplate::parse("PCI-DSS").unwrap(), ComplianceTemplate::PciDss);
        assert_eq!(ComplianceTemplate::parse("pci_dss").unwrap(), ComplianceTemplate::PciDss);
    }

    #[test]
    fn parse_rejects_unknown_template() {
        assert!(ComplianceTemplate::parse("FEDRAMP").is_err());
    }

    #[test]
    fn all_templates_produce_nonempty_tagged_policies() {
        for template in [
            ComplianceTemplate::Gdpr,
            ComplianceTemplate::Hipaa,
            ComplianceTemplate::Soc2,
            ComplianceTemplate::PciDss,
            ComplianceTemplate::Ccpa,
        ] {
            let policy = template.materialize("id", "owner");
            assert!(!policy.rules.is_empty());
            assert!(!policy.tags.is_empty());
        }
    }
}
