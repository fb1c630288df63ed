//! Rule-based classifier: ordered keyword rules with confidence scoring.
//!
//! Rules are evaluated in list order and the first rule with at least one
//! keyword hit wins, so the order of the list *is* the label priority:
//! spam → promotion → finance → meeting → job_related → transactional.
//! An email mentioning both a sale and an invoice is therefore always
//! `promotion`.
//!
//! When no rule matches, an automated-looking sender (`noreply@…`) yields
//! `automated`; anything else is `uncertain`.

use std::path::Path;

use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use crate::error::ConfigError;
use crate::pipeline::types::{ClassificationResult, EmailInput, Label};

/// Default sender pattern marking automated mail.
const DEFAULT_AUTOMATED_SENDER: &str = r"(?i)no[\-_.]?reply";

/// One keyword set bound to a label.
#[derive(Debug, Clone)]
pub struct KeywordRule {
    pub label: Label,
    /// Lower-cased keywords; matched as substrings.
    pub keywords: Vec<String>,
}

impl KeywordRule {
    pub fn new(label: Label, keywords: &[&str]) -> Self {
        Self {
            label,
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    /// Number of keywords present in already lower-cased `text`.
    fn matches(&self, text: &str) -> usize {
        self.keywords
            .iter()
            .filter(|kw| text.contains(kw.as_str()))
            .count()
    }

    /// Matched / total, rounded to 2 decimals.
    fn confidence(&self, matched: usize) -> f32 {
        if self.keywords.is_empty() {
            return 0.0;
        }
        let ratio = matched as f32 / self.keywords.len() as f32;
        (ratio * 100.0).round() / 100.0
    }
}

/// The ordered rule list plus automated-sender patterns.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<KeywordRule>,
    automated_senders: Vec<Regex>,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::default_rules()
    }
}

impl RuleSet {
    /// Built-in keyword sets in their fixed priority order.
    pub fn default_rules() -> Self {
        let rules = vec![
            KeywordRule::new(
                Label::Spam,
                &[
                    "win money",
                    "you won",
                    "lottery",
                    "claim now",
                    "urgent",
                    "100% free",
                    "click here",
                    "urgent prize",
                ],
            ),
            KeywordRule::new(
                Label::Promotion,
                &[
                    "sale",
                    "discount",
                    "offer",
                    "deal",
                    "promotion",
                    "unsubscribe",
                    "buy now",
                ],
            ),
            KeywordRule::new(
                Label::Finance,
                &[
                    "invoice",
                    "payment due",
                    "bill",
                    "receipt",
                    "transaction",
                    "bank",
                    "account update",
                ],
            ),
            KeywordRule::new(
                Label::Meeting,
                &[
                    "meeting",
                    "schedule",
                    "zoom",
                    "call",
                    "appointment",
                    "calendar",
                    "invite",
                    "reminder",
                    "reschedule",
                    "teams",
                ],
            ),
            KeywordRule::new(
                Label::JobRelated,
                &[
                    "interview",
                    "hiring",
                    "opportunity",
                    "resume",
                    "shortlisted",
                    "internship",
                    "job application",
                    "position",
                    "career",
                    "vacancy",
                    "role",
                ],
            ),
            KeywordRule::new(
                Label::Transactional,
                &[
                    "your order",
                    "shipped",
                    "tracking number",
                    "delivery",
                    "package",
                ],
            ),
        ];

        let mut set = Self::empty();
        set.rules = rules;
        set.automated_senders = vec![
            Regex::new(DEFAULT_AUTOMATED_SENDER).expect("default automated sender pattern is valid"),
        ];
        set
    }

    /// No rules at all: every email is `uncertain`.
    pub fn empty() -> Self {
        Self {
            rules: Vec::new(),
            automated_senders: Vec::new(),
        }
    }

    /// Append a rule at the lowest priority.
    pub fn push_rule(&mut self, rule: KeywordRule) {
        self.rules.push(rule);
    }

    /// Add a sender pattern that marks mail as automated.
    pub fn add_automated_sender(&mut self, pattern: &str) -> Result<(), regex::Error> {
        self.automated_senders.push(Regex::new(pattern)?);
        Ok(())
    }

    pub fn rules(&self) -> &[KeywordRule] {
        &self.rules
    }

    /// Labels in the order they are checked.
    pub fn priority(&self) -> Vec<Label> {
        self.rules.iter().map(|r| r.label).collect()
    }

    /// Load a rule set from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Parse a rule set from TOML.
    ///
    /// ```toml
    /// automated_senders = ['(?i)no[\-_.]?reply']
    ///
    /// [[rules]]
    /// label = "spam"
    /// keywords = ["lottery", "you won"]
    /// ```
    ///
    /// `[[rules]]` order is priority order. Omitting `automated_senders`
    /// keeps the default noreply pattern.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let file: RuleFile =
            toml::from_str(raw).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        let mut set = Self::empty();
        for entry in file.rules {
            if matches!(entry.label, Label::Uncertain | Label::Unknown) {
                return Err(ConfigError::InvalidValue {
                    key: "rules.label".into(),
                    message: format!("'{}' cannot be assigned by a keyword rule", entry.label),
                });
            }
            if entry.keywords.iter().all(|k| k.trim().is_empty()) {
                return Err(ConfigError::InvalidValue {
                    key: format!("rules.{}.keywords", entry.label),
                    message: "keyword list is empty".into(),
                });
            }
            set.rules.push(KeywordRule {
                label: entry.label,
                keywords: entry
                    .keywords
                    .iter()
                    .map(|k| k.trim().to_lowercase())
                    .filter(|k| !k.is_empty())
                    .collect(),
            });
        }

        let patterns = file
            .automated_senders
            .unwrap_or_else(|| vec![DEFAULT_AUTOMATED_SENDER.to_string()]);
        for pattern in patterns {
            set.add_automated_sender(&pattern)
                .map_err(|e| ConfigError::InvalidValue {
                    key: "automated_senders".into(),
                    message: e.to_string(),
                })?;
        }

        Ok(set)
    }

    fn is_automated_sender(&self, sender: &str) -> bool {
        self.automated_senders.iter().any(|r| r.is_match(sender))
    }
}

#[derive(Debug, Deserialize)]
struct RuleFile {
    #[serde(default)]
    automated_senders: Option<Vec<String>>,
    #[serde(default)]
    rules: Vec<RuleEntry>,
}

#[derive(Debug, Deserialize)]
struct RuleEntry {
    label: Label,
    keywords: Vec<String>,
}

/// Deterministic keyword classifier. Pure function of its inputs.
#[derive(Debug, Clone, Default)]
pub struct RuleClassifier {
    rules: RuleSet,
}

impl RuleClassifier {
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn classify_email(&self, email: &EmailInput) -> ClassificationResult {
        self.classify(&email.subject, &email.body, &email.sender)
    }

    pub fn classify(&self, subject: &str, body: &str, sender: &str) -> ClassificationResult {
        let text = format!("{subject} {body}").to_lowercase();

        for rule in &self.rules.rules {
            let matched = rule.matches(&text);
            if matched > 0 {
                let confidence = rule.confidence(matched);
                debug!(
                    label = %rule.label,
                    matched,
                    total = rule.keywords.len(),
                    confidence,
                    "Keyword rule matched"
                );
                return ClassificationResult::rule(rule.label, confidence);
            }
        }

        if self.rules.is_automated_sender(sender) {
            debug!(sender, "No keyword rule matched, automated sender");
            return ClassificationResult::rule(Label::Automated, 1.0);
        }

        ClassificationResult::rule(Label::Uncertain, 0.0)
    }
}
