//! LLM fallback classifier.
//!
//! Never fails: transport errors and unparsable answers both collapse to
//! `{unknown, 0.5, llm}`. Parsing is all-or-nothing; a response that does not
//! decode against the expected shape contributes no fields to the result.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::PipelineError;
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider, extract_json_object};
use crate::pipeline::router::Classifier;
use crate::pipeline::types::{ClassificationResult, EmailInput, Label};

/// Max tokens for the classification call; the answer is a tiny JSON object.
const CLASSIFY_MAX_TOKENS: u32 = 128;

const CLASSIFY_TEMPERATURE: f32 = 0.0;

/// Confidence assumed when the model omits one.
const DEFAULT_LLM_CONFIDENCE: f32 = 0.5;

/// Classifies an email by asking a language model for a label.
pub struct LlmClassifier {
    llm: Arc<dyn LlmProvider>,
}

impl LlmClassifier {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    /// Classify subject + body. Always returns a result with `source = llm`.
    pub async fn classify(&self, subject: &str, body: &str) -> ClassificationResult {
        let request = CompletionRequest::new(vec![
            ChatMessage::system(build_classify_system_prompt()),
            ChatMessage::user(build_classify_user_prompt(subject, body)),
        ])
        .with_temperature(CLASSIFY_TEMPERATURE)
        .with_max_tokens(CLASSIFY_MAX_TOKENS);

        let response = match self.llm.complete(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    model = self.llm.model_name(),
                    error = %e,
                    "LLM classification call failed, using fallback"
                );
                return ClassificationResult::llm_fallback();
            }
        };

        match parse_classification_response(&response.content) {
            Ok(result) => {
                debug!(
                    label = %result.label,
                    confidence = result.confidence,
                    input_tokens = response.input_tokens,
                    output_tokens = response.output_tokens,
                    "LLM classification parsed"
                );
                result
            }
            Err(e) => {
                warn!(
                    raw_response = %response.content,
                    error = %e,
                    "Failed to parse LLM classification, using fallback"
                );
                ClassificationResult::llm_fallback()
            }
        }
    }
}

#[async_trait]
impl Classifier for LlmClassifier {
    fn name(&self) -> &str {
        "llm"
    }

    async fn classify(&self, email: &EmailInput) -> Result<ClassificationResult, PipelineError> {
        Ok(LlmClassifier::classify(self, &email.subject, &email.body).await)
    }
}

// ── Prompt construction ─────────────────────────────────────────────

fn build_classify_system_prompt() -> String {
    let categories: String = Label::llm_vocabulary()
        .map(|l| format!("- {}\n", l.as_str()))
        .collect();

    format!(
        "You are an email classifier. Read the email and respond ONLY in JSON.\n\n\
         Classify the email into one of these categories:\n{categories}\n\
         Return JSON in this EXACT format:\n\
         {{\"label\": \"one_of_the_categories\", \"confidence\": number_between_0_and_1}}\n\n\
         Think step-by-step internally but ONLY output JSON."
    )
}

fn build_classify_user_prompt(subject: &str, body: &str) -> String {
    // Body truncated for token efficiency
    let body_preview: String = body.chars().take(2000).collect();
    format!("Email subject: {subject}\nEmail body: {body_preview}")
}

// ── Response parsing ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ClassificationResponse {
    label: String,
    #[serde(default)]
    confidence: Option<f32>,
}

/// Decode the model's answer.
///
/// Out-of-vocabulary labels (including `uncertain`, which is rule-only)
/// become `unknown`; confidence is clamped to `[0, 1]`.
fn parse_classification_response(raw: &str) -> Result<ClassificationResult, String> {
    let json_str = extract_json_object(raw);
    let response: ClassificationResponse =
        serde_json::from_str(json_str).map_err(|e| format!("JSON parse error: {e}"))?;

    let label = match response.label.parse::<Label>() {
        Ok(Label::Uncertain) | Err(_) => Label::Unknown,
        Ok(label) => label,
    };
    let confidence = response.confidence.unwrap_or(DEFAULT_LLM_CONFIDENCE);

    Ok(ClassificationResult::llm(label, confidence))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use crate::llm::CompletionResponse;
    use crate::pipeline::types::ClassificationSource;

    /// Mock LLM that returns a fixed response, or fails when `response` is `None`.
    struct MockClassifyLlm {
        response: Option<String>,
    }

    #[async_trait]
    impl LlmProvider for MockClassifyLlm {
        fn model_name(&self) -> &str {
            "mock-classify"
        }

        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            match &self.response {
                Some(content) => Ok(CompletionResponse {
                    content: content.clone(),
                    input_tokens: 80,
                    output_tokens: 12,
                }),
                None => Err(LlmError::RequestFailed {
                    provider: "mock".into(),
                    reason: "connection refused".into(),
                }),
            }
        }
    }

    fn classifier(response: Option<&str>) -> LlmClassifier {
        LlmClassifier::new(Arc::new(MockClassifyLlm {
            response: response.map(String::from),
        }))
    }

    #[test]
    fn system_prompt_lists_vocabulary_without_uncertain() {
        let prompt = build_classify_system_prompt();
        assert!(prompt.contains("- job_related"));
        assert!(prompt.contains("- unknown"));
        assert!(!prompt.contains("uncertain"));
    }

    #[test]
    fn user_prompt_includes_subject_and_body() {
        let prompt = build_classify_user_prompt("Quarterly bill", "Please pay by Friday");
        assert!(prompt.contains("Quarterly bill"));
        assert!(prompt.contains("Please pay by Friday"));
    }

    #[test]
    fn parse_valid_response() {
        let result = parse_classification_response(r#"{"label": "personal", "confidence": 0.9}"#)
            .unwrap();
        assert_eq!(result.label, Label::Personal);
        assert!((result.confidence - 0.9).abs() < 1e-6);
        assert_eq!(result.source, ClassificationSource::Llm);
    }

    #[test]
    fn parse_out_of_vocabulary_becomes_unknown() {
        let result =
            parse_classification_response(r#"{"label": "newsletter", "confidence": 0.8}"#)
                .unwrap();
        assert_eq!(result.label, Label::Unknown);
        assert!((result.confidence - 0.8).abs() < 1e-6);
    }

    #[test]
    fn parse_uncertain_becomes_unknown() {
        let result = parse_classification_response(r#"{"label": "uncertain"}"#).unwrap();
        assert_eq!(result.label, Label::Unknown);
        assert_eq!(result.confidence, 0.5);
    }

    #[test]
    fn parse_clamps_confidence() {
        let high = parse_classification_response(r#"{"label": "spam", "confidence": 3}"#).unwrap();
        assert_eq!(high.confidence, 1.0);
        let low =
            parse_classification_response(r#"{"label": "spam", "confidence": -1}"#).unwrap();
        assert_eq!(low.confidence, 0.0);
    }

    #[test]
    fn parse_rejects_wrong_shape() {
        assert!(parse_classification_response(r#"{"category": "spam"}"#).is_err());
        assert!(parse_classification_response(r#"{"label": "spam", "confidence": "high"}"#).is_err());
        assert!(parse_classification_response("spam, probably").is_err());
    }

    #[test]
    fn parse_markdown_wrapped() {
        let raw = "```json\n{\"label\": \"finance\", \"confidence\": 0.7}\n```";
        assert_eq!(parse_classification_response(raw).unwrap().label, Label::Finance);
    }

    #[tokio::test]
    async fn classify_uses_model_answer() {
        let result = classifier(Some(r#"{"label": "meeting", "confidence": 0.95}"#))
            .classify("Sync", "Tuesday?")
            .await;
        assert_eq!(result.label, Label::Meeting);
        assert_eq!(result.source, ClassificationSource::Llm);
    }

    #[tokio::test]
    async fn classify_backend_failure_falls_back() {
        let result = classifier(None).classify("Sync", "Tuesday?").await;
        assert_eq!(result, ClassificationResult::llm_fallback());
    }

    #[tokio::test]
    async fn classify_garbage_falls_back() {
        let result = classifier(Some("I cannot help with that."))
            .classify("Sync", "Tuesday?")
            .await;
        assert_eq!(result.label, Label::Unknown);
        assert_eq!(result.confidence, 0.5);
    }

    #[tokio::test]
    async fn classifier_trait_never_errors() {
        let classifier = classifier(None);
        let email = EmailInput::new("Hi", "there", "x@y.com");
        let result = Classifier::classify(&classifier, &email).await.unwrap();
        assert_eq!(result.label, Label::Unknown);
    }
}
