//! Email pipeline: triage, then the ReAct loop.
//!
//! Flow per email:
//! 1. Triage router (rules, LLM fallback below the threshold)
//! 2. ReAct loop seeded with the sender and the triage decision
//!
//! Emails are independent. A batch runs up to `concurrency` emails at once
//! and returns results in input order.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::Serialize;
use tracing::info;

use crate::agent::react::ReactAgent;
use crate::agent::trace::ReactTrace;
use crate::pipeline::router::TriageRouter;
use crate::pipeline::types::{ClassificationResult, EmailInput};

/// Emails processed at once by [`EmailPipeline::process_batch`].
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Result of running one email through the pipeline.
#[derive(Debug, Serialize)]
pub struct ProcessedEmail {
    pub email: EmailInput,
    pub triage: ClassificationResult,
    pub trace: ReactTrace,
    pub processed_at: DateTime<Utc>,
}

/// Triage + ReAct for each email.
pub struct EmailPipeline {
    router: Arc<TriageRouter>,
    agent: Arc<ReactAgent>,
    concurrency: usize,
}

impl EmailPipeline {
    pub fn new(router: Arc<TriageRouter>, agent: Arc<ReactAgent>) -> Self {
        Self {
            router,
            agent,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Set batch concurrency (minimum 1).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Process a single email.
    pub async fn process(&self, email: EmailInput) -> ProcessedEmail {
        let triage = self.router.route(&email).await;
        info!(
            subject = %email.subject,
            label = %triage.label,
            confidence = triage.confidence,
            source = ?triage.source,
            "Email triaged"
        );

        let trace = self.agent.run_email(&email, Some(triage.clone())).await;

        ProcessedEmail {
            email,
            triage,
            trace,
            processed_at: Utc::now(),
        }
    }

    /// Process many emails, preserving input order.
    pub async fn process_batch(&self, emails: Vec<EmailInput>) -> Vec<ProcessedEmail> {
        let total = emails.len();
        let results: Vec<ProcessedEmail> = futures::stream::iter(emails)
            .map(|email| self.process(email))
            .buffered(self.concurrency)
            .collect()
            .await;
        info!(total, "Batch processed");
        results
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::config::AgentConfig;
    use crate::pipeline::rules::RuleClassifier;
    use crate::pipeline::types::{ClassificationSource, Label};
    use crate::tools::{ContactDirectory, MockCalendar, ToolRegistry};

    fn pipeline() -> EmailPipeline {
        let tools = Arc::new(ToolRegistry::with_mock_tools(
            MockCalendar::pinned(NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()),
            ContactDirectory::mock(),
        ));
        EmailPipeline::new(
            Arc::new(TriageRouter::new(RuleClassifier::default())),
            Arc::new(ReactAgent::new(tools, &AgentConfig::default())),
        )
    }

    #[tokio::test]
    async fn process_triages_then_runs_agent() {
        let processed = pipeline()
            .process(EmailInput::new(
                "Schedule a meeting",
                "Can we have a Zoom call tomorrow?",
                "manager@company.com",
            ))
            .await;
        assert_eq!(processed.triage.label, Label::Meeting);
        assert_eq!(processed.triage.source, ClassificationSource::Rule);
        assert_eq!(processed.trace.trace[0].action_input["tool"], "read_calendar");
        assert_eq!(
            processed.trace.input.context.triage.as_ref(),
            Some(&processed.triage)
        );
        assert_eq!(
            processed.trace.input.context.sender.as_deref(),
            Some("manager@company.com")
        );
    }

    #[tokio::test]
    async fn batch_preserves_order() {
        let emails = vec![
            EmailInput::new("Invoice due", "payment for your bill", ""),
            EmailInput::new("Hello", "just saying hi", ""),
            EmailInput::new("Schedule a meeting", "zoom call", ""),
        ];
        let results = pipeline().with_concurrency(2).process_batch(emails).await;
        let subjects: Vec<&str> = results.iter().map(|r| r.email.subject.as_str()).collect();
        assert_eq!(subjects, vec!["Invoice due", "Hello", "Schedule a meeting"]);
        assert_eq!(results[0].triage.label, Label::Finance);
    }

    #[test]
    fn concurrency_has_floor() {
        assert_eq!(pipeline().with_concurrency(0).concurrency(), 1);
    }
}
