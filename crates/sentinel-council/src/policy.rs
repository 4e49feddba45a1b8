//! # Policy Engine
//!
//! Evaluates a principal's policies against a piece of content and
//! produces a single aggregated decision, mirroring the council's old
//! "collect per-evaluator results, then aggregate into one verdict"
//! shape with rule matches standing in for evaluator votes.
//!
//! ## Evaluation order
//!
//! Only enabled policies are considered. Within a policy, rules are
//! evaluated in descending `priority` order. Every matching rule
//! contributes a violation; `BLOCK` wins over `REDACT`/`FLAG`/`ALERT` for
//! the `allowed` verdict regardless of rule order, since any one policy
//! can veto regardless of what order its rules happened to run in.
//!
//! ## Condition matching
//!
//! Matching is a literal substring search against the content via each
//! condition's fixed needle (see `sentinel_registry::PolicyCondition::needle`).
//! This is a deliberate limitation carried over unchanged from the
//! source system rather than silently upgraded to a smarter classifier.

use serde::{Deserialize, Serialize};

use sentinel_registry::{Policy, PolicyAction, PolicyCondition};

/// One rule match recorded during evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyViolation {
    pub policy_id: String,
    pub condition: PolicyCondition,
    pub action: PolicyAction,
    pub priority: i32,
}

/// Result of [`PolicyEngine::evaluate`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyEvaluation {
    pub allowed: bool,
    pub violations: Vec<PolicyViolation>,
    pub actions_taken: Vec<PolicyAction>,
    pub modified_content: Option<String>,
}

/// Sentinel text substituted for `REDACT` actions. The engine does not
/// attempt partial redaction; a policy match redacts the whole content.
const REDACTION_SENTINEL: &str = "[REDACTED BY POLICY]";

/// Stateless evaluator over a caller-supplied set of policies. Storage
/// and ownership scoping live in the registry; this engine only
/// implements the match-and-aggregate semantics.
#[derive(Debug, Default)]
pub struct PolicyEngine;

impl PolicyEngine {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Evaluates `content` against every enabled policy in `policies`.
    pub fn evaluate(&self, content: &str, policies: &[Policy]) -> PolicyEvaluation {
        let lower = content.to_lowercase();
        let mut violations = Vec::new();
        let mut actions_taken = Vec::new();
        let mut blocked = false;
        let mut modified_content = None;

        for policy in policies.iter().filter(|p| p.enabled) {
            for rule in policy.rules_by_priority() {
                if !lower.contains(rule.condition.needle()) {
                    continue;
                }

                violations.push(PolicyViolation {
                    policy_id: policy.id.clone(),
                    condition: rule.condition,
                    action: rule.action,
                    priority: rule.priority,
                });
                actions_taken.push(rule.action);

                match rule.action {
                    PolicyAction::Block => {
                        tracing::warn!(policy_id = %policy.id, condition = ?rule.condition, "policy blocked content");
                        blocked = true;
                        modified_content = Some(String::new());
                    }
                    PolicyAction::Redact => {
                        if modified_content.is_none() {
                            modified_content = Some(REDACTION_SENTINEL.to_string());
                        }
                    }
                    PolicyAction::Flag | PolicyAction::Alert | PolicyAction::Allow => {}
                }
            }
        }

        PolicyEvaluation {
            allowed: !blocked,
            violations,
            actions_taken,
            modified_content,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_registry::PolicyRule;

    fn policy(id: &str, rules: Vec<PolicyRule>) -> Policy {
        Policy {
            id: id.to_string(),
            owner_id: "owner-1".to_string(),
            name: id.to_string(),
            rules,
            tags: vec![],
            enabled: true,
            version: 1,
        }
    }

    #[test]
    fn clean_content_is_allowed() {
        let engine = PolicyEngine::new();
        let policies = vec![policy(
            "p1",
            vec![PolicyRule { condition: PolicyCondition::ContainsPii, action: PolicyAction::Redact, priority: 10 }],
        )];
        let result = engine.evaluate("nothing sensitive here", &policies);
        assert!(result.allowed);
        assert!(result.violations.is_empty());
    }

    #[test]
    fn matching_redact_rule_replaces_content() {
        let engine = PolicyEngine::new();
        let policies = vec![policy(
            "p1",
            vec![PolicyRule { condition: PolicyCondition::ContainsPii, action: PolicyAction::Redact, priority: 10 }],
        )];
        let result = engine.evaluate("the patient ssn is on file", &policies);
        assert!(result.allowed);
        assert_eq!(result.modified_content.as_deref(), Some(REDACTION_SENTINEL));
    }

    #[test]
    fn matching_block_rule_denies_and_clears_content() {
        let engine = PolicyEngine::new();
        let policies = vec![policy(
            "p1",
            vec![PolicyRule { condition: PolicyCondition::UnauthorizedAccess, action: PolicyAction::Block, priority: 10 }],
        )];
        let result = engine.evaluate("this is an unauthorized request", &policies);
        assert!(!result.allowed);
        assert_eq!(result.modified_content.as_deref(), Some(""));
    }

    #[test]
    fn disabled_policy_is_skipped() {
        let engine = PolicyEngine::new();
        let mut p = policy(
            "p1",
            vec![PolicyRule { condition: PolicyCondition::ContainsPii, action: PolicyAction::Block, priority: 10 }],
        );
        p.enabled = false;
        let result = engine.evaluate("ssn here", &[p]);
        assert!(result.allowed);
        assert!(result.violations.is_empty());
    }

    #[test]
    fn block_from_one_policy_overrides_redact_from_another() {
        let engine = PolicyEngine::new();
        let policies = vec![
            policy("p1", vec![PolicyRule { condition: PolicyCondition::ContainsPii, action: PolicyAction::Redact, priority: 10 }]),
            policy("p2", vec![PolicyRule { condition: PolicyCondition::UnauthorizedAccess, action: PolicyAction::Block, priority: 5 }]),
        ];
        let result = engine.evaluate("ssn and unauthorized access", &policies);
        assert!(!result.allowed);
        assert_eq!(result.violations.len(), 2);
    }

    #[test]
    fn flag_and_alert_do_not_modify_content() {
        let engine = PolicyEngine::new();
        let policies = vec![policy(
            "p1",
            vec![PolicyRule { condition: PolicyCondition::AuditLogRequired, action: PolicyAction::Flag, priority: 5 }],
        )];
        let result = engine.evaluate("audit this please", &policies);
        assert!(result.allowed);
        assert!(result.modified_content.is_none());
        assert_eq!(result.actions_taken, vec![PolicyAction::Flag]);
    }
}
