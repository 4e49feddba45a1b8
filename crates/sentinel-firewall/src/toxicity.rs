//! # Toxicity Scorer
//!
//! Not named in the original distillation, but implied by the gateway's
//! `toxicity_threshold` configuration option. Modeled as a heuristic
//! word-list scorer behind the same trait-object seam as
//! [`crate::pii::NerLabeler`] and [`crate::injection::InjectionScorer`],
//! so a learned classifier can be dropped in later without touching call
//! sites.

use std::collections::HashSet;
use std::sync::OnceLock;

/// Pluggable toxicity scorer. Returns a confidence in `[0, 1]`.
pub trait ToxicityScorer: Send + Sync {
    fn score(&self, text: &str) -> f64;
}

/// Default scorer: fraction of tokens found in a closed slur/profanity
/// word list, scaled and capped at 1.0.
struct HeuristicToxicityScorer {
    words: HashSet<&'static str>,
}

impl HeuristicToxicityScorer {
    fn new() -> Self {
        let words = [
            "idiot", "stupid", "hate", "kill", "worthless", "moron", "dumb", "shut up",
        ]
        .into_iter()
        .collect();
        Self { words }
    }
}

impl ToxicityScorer for HeuristicToxicityScorer {
    fn score(&self, text: &str) -> f64 {
        let lower = text.to_lowercase();
        let tokens: Vec<&str> = lower.split_whitespace().collect();
        if tokens.is_empty() {
            return 0.0;
        }

        let hits = self.words.iter().filter(|w| lower.contains(*w)).count();
        ((hits as f64) * 0.4).min(1.0)
    }
}

/// Result of [`ToxicityAnalyzer::analyze`].
#[derive(Debug, Clone, Copy)]
pub struct ToxicityResult {
    pub confidence: f64,
    pub is_toxic: bool,
}

/// Facade applying a configurable threshold to an underlying
/// [`ToxicityScorer`].
pub struct ToxicityAnalyzer {
    threshold: f64,
    scorer: OnceLock<Box<dyn ToxicityScorer>>,
}

impl ToxicityAnalyzer {
    #[must_use]
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            scorer: OnceLock::new(),
        }
    }

    /// Installs a custom scorer in place of the heuristic default.
    /// Idempotent: only the first call takes effect.
    pub fn with_scorer(self, scorer: Box<dyn ToxicityScorer>) -> Self {
        let _ = self.scorer.set(scorer);
        self
    }

    fn scorer(&self) -> &dyn ToxicityScorer {
        self.scorer
            .get_or_init(|| Box::new(HeuristicToxicityScorer::new()))
            .as_ref()
    }

    pub fn analyze(&self, text: &str) -> ToxicityResult {
        let confidence = self.scorer().score(text);
        ToxicityResult {
            confidence,
            is_toxic: confidence >= self.threshold,
        }
    }
}

impl Default for ToxicityAnalyzer {
    fn default() -> Self {
        Self::new(0.5)
    }
}
