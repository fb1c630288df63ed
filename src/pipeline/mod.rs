//! Email triage pipeline.
//!
//! Every email flows through:
//! 1. `RuleClassifier` - ordered keyword rules (no LLM)
//! 2. `TriageRouter` - escalates low-confidence rule results to the
//!    fallback classifier
//! 3. `EmailPipeline` - hands the triaged email to the ReAct agent
//!
//! `eval` scores the router against a human-labeled dataset.

pub mod eval;
pub mod llm_classifier;
pub mod processor;
pub mod router;
pub mod rules;
pub mod types;

pub use eval::{EvalReport, Evaluator, LabeledEmail};
pub use llm_classifier::LlmClassifier;
pub use processor::{EmailPipeline, ProcessedEmail};
pub use router::{Classifier, TriageRouter};
pub use rules::{KeywordRule, RuleClassifier, RuleSet};
pub use types::{ClassificationResult, ClassificationSource, EmailInput, Label};
