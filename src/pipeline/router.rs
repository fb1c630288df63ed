//! Two-tier triage router.
//!
//! The rule classifier always runs first. A rule result at or above the
//! threshold is returned as-is; anything below is handed to the fallback
//! classifier, whose answer replaces the rule result entirely. If there is no
//! fallback, or it errors, the rule result stands.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::DEFAULT_TRIAGE_THRESHOLD;
use crate::error::PipelineError;
use crate::pipeline::rules::RuleClassifier;
use crate::pipeline::types::{ClassificationResult, EmailInput};

/// A classifier the router can fall back to.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Short name for logging.
    fn name(&self) -> &str;

    /// Classify one email.
    async fn classify(&self, email: &EmailInput) -> Result<ClassificationResult, PipelineError>;
}

/// Rule-first router with an optional expensive fallback.
pub struct TriageRouter {
    rules: RuleClassifier,
    fallback: Option<Arc<dyn Classifier>>,
    threshold: f32,
}

impl TriageRouter {
    /// Create a rule-only router.
    pub fn new(rules: RuleClassifier) -> Self {
        Self {
            rules,
            fallback: None,
            threshold: DEFAULT_TRIAGE_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn Classifier>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    pub fn rules(&self) -> &RuleClassifier {
        &self.rules
    }

    /// Produce the final triage decision for one email.
    pub async fn route(&self, email: &EmailInput) -> ClassificationResult {
        let rule_result = self.rules.classify_email(email);

        if rule_result.confidence >= self.threshold {
            debug!(
                label = %rule_result.label,
                confidence = rule_result.confidence,
                "Rule confidence above threshold, skipping fallback"
            );
            return rule_result;
        }

        let Some(fallback) = &self.fallback else {
            debug!(
                label = %rule_result.label,
                confidence = rule_result.confidence,
                "No fallback classifier configured, keeping rule result"
            );
            return rule_result;
        };

        match fallback.classify(email).await {
            Ok(result) => {
                info!(
                    rule_label = %rule_result.label,
                    rule_confidence = rule_result.confidence,
                    label = %result.label,
                    confidence = result.confidence,
                    fallback = fallback.name(),
                    "Low rule confidence, using fallback classification"
                );
                result
            }
            Err(e) => {
                warn!(
                    fallback = fallback.name(),
                    error = %e,
                    label = %rule_result.label,
                    "Fallback classifier failed, keeping rule result"
                );
                rule_result
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::pipeline::rules::{KeywordRule, RuleSet};
    use crate::pipeline::types::{ClassificationSource, Label};

    /// Fallback that returns a fixed result and counts calls.
    struct FixedClassifier {
        result: Option<ClassificationResult>,
        calls: AtomicUsize,
    }

    impl FixedClassifier {
        fn ok(result: ClassificationResult) -> Arc<Self> {
            Arc::new(Self {
                result: Some(result),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                result: None,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Classifier for FixedClassifier {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn classify(
            &self,
            _email: &EmailInput,
        ) -> Result<ClassificationResult, PipelineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result
                .clone()
                .ok_or_else(|| PipelineError::Triage("rate limited".into()))
        }
    }

    /// Rules where "alpha" alone scores 1.0 and "beta" alone scores 0.5.
    fn router() -> TriageRouter {
        let mut rules = RuleSet::empty();
        rules.push_rule(KeywordRule::new(Label::Spam, &["alpha"]));
        rules.push_rule(KeywordRule::new(Label::Finance, &["beta", "gamma"]));
        TriageRouter::new(RuleClassifier::new(rules))
    }

    #[tokio::test]
    async fn confident_rule_result_returned_unchanged() {
        let fallback = FixedClassifier::ok(ClassificationResult::llm(Label::Personal, 0.9));
        let router = router().with_fallback(fallback.clone());

        let result = router.route(&EmailInput::new("alpha", "", "")).await;
        assert_eq!(result, ClassificationResult::rule(Label::Spam, 1.0));
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn threshold_is_inclusive() {
        let fallback = FixedClassifier::ok(ClassificationResult::llm(Label::Personal, 0.9));
        let router = router().with_threshold(0.5).with_fallback(fallback.clone());

        let result = router.route(&EmailInput::new("beta", "", "")).await;
        assert_eq!(result.source, ClassificationSource::Rule);
        assert_eq!(result.label, Label::Finance);
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn low_confidence_replaced_by_fallback() {
        let fallback = FixedClassifier::ok(ClassificationResult::llm(Label::Personal, 0.65));
        let router = router().with_fallback(fallback.clone());

        let result = router.route(&EmailInput::new("beta", "", "")).await;
        assert_eq!(result, ClassificationResult::llm(Label::Personal, 0.65));
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn uncertain_goes_to_fallback() {
        let fallback = FixedClassifier::ok(ClassificationResult::llm_fallback());
        let router = router().with_fallback(fallback);

        let result = router.route(&EmailInput::new("hello", "", "")).await;
        assert_eq!(result.source, ClassificationSource::Llm);
        assert_eq!(result.label, Label::Unknown);
    }

    #[tokio::test]
    async fn fallback_error_keeps_rule_result() {
        let fallback = FixedClassifier::failing();
        let router = router().with_fallback(fallback.clone());

        let result = router.route(&EmailInput::new("beta", "", "")).await;
        assert_eq!(result, ClassificationResult::rule(Label::Finance, 0.5));
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn rule_only_router_keeps_low_confidence() {
        let router = router();
        assert!(!router.has_fallback());
        let result = router.route(&EmailInput::new("hello", "", "")).await;
        assert_eq!(result, ClassificationResult::rule(Label::Uncertain, 0.0));
    }

    #[tokio::test]
    async fn default_threshold_sends_meeting_request_to_fallback() {
        let fallback = FixedClassifier::ok(ClassificationResult::llm(Label::Meeting, 0.92));
        let router =
            TriageRouter::new(RuleClassifier::default()).with_fallback(fallback.clone());

        let email = EmailInput::new("Schedule a meeting", "Can we have a Zoom call tomorrow?", "");
        let result = router.route(&email).await;
        assert_eq!(result.source, ClassificationSource::Llm);
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 1);
    }
}
