//! Shared types for the triage pipeline.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ── Inbound email ───────────────────────────────────────────────────

/// One email as handed to the pipeline.
///
/// Immutable once constructed; a run only ever borrows it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmailInput {
    pub subject: String,
    pub body: String,
    #[serde(default)]
    pub sender: String,
    /// Opaque attachment payloads. Never inspected by triage.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<serde_json::Value>,
}

impl EmailInput {
    pub fn new(
        subject: impl Into<String>,
        body: impl Into<String>,
        sender: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
            sender: sender.into(),
            attachments: Vec::new(),
        }
    }

    /// `None` when the sender field is blank.
    pub fn sender(&self) -> Option<&str> {
        let sender = self.sender.trim();
        (!sender.is_empty()).then_some(sender)
    }
}

// ── Labels ──────────────────────────────────────────────────────────

/// Closed set of triage categories.
///
/// `Uncertain` is produced only by the rule classifier (no keyword hit,
/// human sender). `Unknown` is what any out-of-vocabulary or failed LLM
/// answer is coerced to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    Spam,
    Promotion,
    Finance,
    Meeting,
    JobRelated,
    Transactional,
    Automated,
    Personal,
    Unknown,
    Uncertain,
}

impl Label {
    pub const ALL: [Label; 10] = [
        Label::Spam,
        Label::Promotion,
        Label::Finance,
        Label::Meeting,
        Label::JobRelated,
        Label::Transactional,
        Label::Automated,
        Label::Personal,
        Label::Unknown,
        Label::Uncertain,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spam => "spam",
            Self::Promotion => "promotion",
            Self::Finance => "finance",
            Self::Meeting => "meeting",
            Self::JobRelated => "job_related",
            Self::Transactional => "transactional",
            Self::Automated => "automated",
            Self::Personal => "personal",
            Self::Unknown => "unknown",
            Self::Uncertain => "uncertain",
        }
    }

    /// Labels an LLM may answer with (`uncertain` is rule-only).
    pub fn llm_vocabulary() -> impl Iterator<Item = Label> {
        Self::ALL.into_iter().filter(|l| *l != Label::Uncertain)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Label {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace([' ', '-'], "_");
        Self::ALL
            .into_iter()
            .find(|l| l.as_str() == normalized)
            .ok_or_else(|| format!("unknown label '{s}'"))
    }
}

// ── Classification ──────────────────────────────────────────────────

/// Which tier produced a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationSource {
    Rule,
    Llm,
}

/// A triage decision. Confidence is always within `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub label: Label,
    pub confidence: f32,
    pub source: ClassificationSource,
}

impl ClassificationResult {
    pub fn rule(label: Label, confidence: f32) -> Self {
        Self {
            label,
            confidence: clamp_confidence(confidence),
            source: ClassificationSource::Rule,
        }
    }

    pub fn llm(label: Label, confidence: f32) -> Self {
        Self {
            label,
            confidence: clamp_confidence(confidence),
            source: ClassificationSource::Llm,
        }
    }

    /// Degraded answer used whenever the LLM tier cannot produce one.
    pub fn llm_fallback() -> Self {
        Self::llm(Label::Unknown, 0.5)
    }
}

fn clamp_confidence(confidence: f32) -> f32 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}
