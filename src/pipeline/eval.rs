//! Triage evaluation against a labeled dataset.
//!
//! Dataset: a JSON array of `{subject, body, sender?, human_label}`.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::EvalError;
use crate::pipeline::router::TriageRouter;
use crate::pipeline::types::{EmailInput, Label};

/// Display categories and the labels counted under each.
const SUMMARY_CATEGORIES: &[(&str, &[Label])] = &[
    ("Spam", &[Label::Spam]),
    ("Promotion", &[Label::Promotion]),
    ("Finance", &[Label::Finance]),
    ("Action Intent", &[Label::Meeting]),
    ("Job Related", &[Label::JobRelated]),
    ("Transactional", &[Label::Transactional]),
    ("Automated", &[Label::Automated]),
    ("Personal", &[Label::Personal]),
    ("Unknown", &[Label::Unknown, Label::Uncertain]),
];

const COLUMN_WIDTH: usize = 15;

/// One human-labeled email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledEmail {
    pub subject: String,
    pub body: String,
    #[serde(default)]
    pub sender: String,
    /// Free-form; compared verbatim against predicted label names.
    pub human_label: String,
}

impl LabeledEmail {
    pub fn to_input(&self) -> EmailInput {
        EmailInput::new(&self.subject, &self.body, &self.sender)
    }
}

/// Accuracy, confusion matrix and per-label prediction counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvalReport {
    pub total: usize,
    pub correct: usize,
    /// `correct / total`, 0 for an empty dataset.
    pub accuracy: f64,
    /// human label → predicted label → count.
    pub confusion: BTreeMap<String, BTreeMap<String, usize>>,
    pub predicted_counts: BTreeMap<String, usize>,
}

impl EvalReport {
    fn record(&mut self, human: &str, predicted: &str) {
        self.total += 1;
        if human == predicted {
            self.correct += 1;
        }
        *self
            .confusion
            .entry(human.to_string())
            .or_default()
            .entry(predicted.to_string())
            .or_default() += 1;
        *self
            .predicted_counts
            .entry(predicted.to_string())
            .or_default() += 1;
        self.accuracy = self.correct as f64 / self.total as f64;
    }

    /// Sorted union of human and predicted labels.
    pub fn labels(&self) -> Vec<String> {
        let mut labels: BTreeSet<String> = self.confusion.keys().cloned().collect();
        for row in self.confusion.values() {
            labels.extend(row.keys().cloned());
        }
        labels.into_iter().collect()
    }

    pub fn cell(&self, human: &str, predicted: &str) -> usize {
        self.confusion
            .get(human)
            .and_then(|row| row.get(predicted))
            .copied()
            .unwrap_or(0)
    }

    /// Prediction counts grouped into display categories.
    pub fn summary_counts(&self) -> Vec<(&'static str, usize)> {
        SUMMARY_CATEGORIES
            .iter()
            .map(|(name, labels)| {
                let count = labels
                    .iter()
                    .map(|l| self.predicted_counts.get(l.as_str()).copied().unwrap_or(0))
                    .sum();
                (*name, count)
            })
            .collect()
    }

    pub fn render_confusion_matrix(&self) -> String {
        let labels = self.labels();
        let mut out = String::from("Confusion Matrix:\nTrue ↓  Pred →\n\n");

        let _ = write!(out, "{:<COLUMN_WIDTH$}", "");
        for label in &labels {
            let _ = write!(out, "{label:<COLUMN_WIDTH$}");
        }
        out.push('\n');

        for human in &labels {
            let _ = write!(out, "{human:<COLUMN_WIDTH$}");
            for predicted in &labels {
                let _ = write!(out, "{:<COLUMN_WIDTH$}", self.cell(human, predicted));
            }
            out.push('\n');
        }
        out
    }

    pub fn render_summary(&self) -> String {
        let mut out = String::from("Summary Counts:\n");
        for (name, count) in self.summary_counts() {
            let _ = writeln!(out, "{name}: {count}");
        }
        let _ = writeln!(out, "\nFinal Accuracy: {:.2}%", self.accuracy * 100.0);
        out
    }

    /// Write the report as pretty JSON, creating parent directories.
    pub fn write_json(&self, path: &Path) -> Result<(), EvalError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| EvalError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|source| EvalError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Scores a [`TriageRouter`] against labeled data.
pub struct Evaluator {
    router: TriageRouter,
}

impl Evaluator {
    pub fn new(router: TriageRouter) -> Self {
        Self { router }
    }

    pub fn load_dataset(path: &Path) -> Result<Vec<LabeledEmail>, EvalError> {
        let raw = std::fs::read_to_string(path).map_err(|source| EvalError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub async fn predict(&self, email: &LabeledEmail) -> Label {
        self.router.route(&email.to_input()).await.label
    }

    pub async fn evaluate(&self, dataset: &[LabeledEmail]) -> EvalReport {
        let mut report = EvalReport::default();
        for email in dataset {
            let predicted = self.predict(email).await;
            report.record(&email.human_label, predicted.as_str());
        }
        info!(
            total = report.total,
            correct = report.correct,
            accuracy = report.accuracy,
            "Evaluation complete"
        );
        report
    }

    pub async fn evaluate_file(&self, path: &Path) -> Result<EvalReport, EvalError> {
        let dataset = Self::load_dataset(path)?;
        Ok(self.evaluate(&dataset).await)
    }
}
