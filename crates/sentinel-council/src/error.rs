//! Error types for the Policy Engine.

use thiserror::Error;

/// Errors that can occur during policy evaluation.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// A named compliance template does not exist.
    #[error("unknown compliance template: {0}")]
    UnknownTemplate(String),

    /// A policy referenced by id could not be found among those passed
    /// to the evaluator.
    #[error("policy not found: {0}")]
    PolicyNotFound(String),

    /// Internal evaluator error.
    #[error("internal policy engine error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_template_display() {
        let err = PolicyError::UnknownTemplate("FEDRAMP".to_string());
        assert!(err.to_string().contains("FEDRAMP"));
    }

    #[test]
    fn test_policy_not_found_display() {
        let err = PolicyError::PolicyNotFound("policy-123".to_string());
        assert!(err.to_string().contains("policy-123"));
    }

    #[test]
    fn test_internal_error_display() {
        let err = PolicyError::Internal("unexpected state".to_string());
        assert!(err.to_string().contains("unexpected state"));
    }
}
