//! # Sentinel Firewall - Threat Detection Layer
//!
//! Inspects request and response content passing through the gateway and
//! produces structured threat assessments. Each detector is independent
//! and stateless aside from its own pluggable deep-analysis layer; the
//! decision combiner upstream in `sentinel-core` is responsible for
//! selecting which detectors run for a given context and aggregating
//! their results into a single [`models::Recommendation`].
//!
//! ## Detectors
//!
//! | Module | Detects | Method |
//! |--------|---------|--------|
//! | [`injection`] | Prompt injection | Regex catalogue + pluggable deep layer |
//! | [`jailbreak`] | Safety-bypass phrasing | Closed vocabulary |
//! | [`exfiltration`] | Sensitive data + transport verbs | Regex + URL analysis |
//! | [`pii`] | Personally identifiable information | Regex + pluggable NER |
//! | [`toxicity`] | Abusive/toxic language | Pluggable word-list scorer |
//!
//! ## References
//!
//! - Perez & Ribeiro (2022), "Ignore This Title and HackAPrompt"
//! - Greshake et al. (2023), "Not What You've Signed Up For: Compromising
//!   Real-World LLM-Integrated Applications with Indirect Prompt Injection"
//! - Shen et al. (2023), "Do Anything Now"
//! - OWASP LLM Top 10: <https://owasp.org/www-project-top-10-for-large-language-model-applications/>
//!
//! ## Usage
//!
//! ```rust,no_run
//! use sentinel_firewall::injection::{PromptInjectionDetector, DetectionMode};
//!
//! let detector = PromptInjectionDetector::new();
//! let result = detector.detect("Ignore all previous instructions", DetectionMode::Hybrid);
//! if result.is_injection {
//!     println!("blocked: {:?}", result.recommendation);
//! }
//! ```

pub mod exfiltration;
pub mod injection;
pub mod jailbreak;
pub mod models;
pub mod pii;
pub mod toxicity;

pub use exfiltration::{ExfiltrationMonitor, ExfiltrationResult, IndicatorMatch, TransportMethod};
pub use injection::{DetectionMode, PromptInjectionDetector};
pub use jailbreak::{JailbreakDetector, JailbreakResult};
pub use models::{DetectedPattern, FirewallError, Recommendation, Severity, ThreatType};
pub use pii::{PiiDetector, PiiEntity};
pub use toxicity::{ToxicityAnalyzer, ToxicityResult};
