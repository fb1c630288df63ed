//! Configuration types.
//!
//! Every config is built from a key lookup so the environment-backed
//! constructors (`from_env`) and tests share one code path.

use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::pipeline::rules::RuleSet;

/// Rule confidence at or above which the LLM tier is skipped.
pub const DEFAULT_TRIAGE_THRESHOLD: f32 = 0.80;

/// Upper bound on ReAct steps per email.
pub const DEFAULT_MAX_STEPS: usize = 6;

/// Triage configuration.
#[derive(Debug, Clone)]
pub struct TriageConfig {
    /// Minimum rule confidence to trust the rule label.
    pub threshold: f32,
    /// Optional TOML file replacing the built-in keyword rules.
    pub rules_path: Option<PathBuf>,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_TRIAGE_THRESHOLD,
            rules_path: None,
        }
    }
}

impl TriageConfig {
    /// Build config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let threshold =
            parse_var(&lookup, "TRIAGE_THRESHOLD")?.unwrap_or(DEFAULT_TRIAGE_THRESHOLD);
        let rules_path = lookup("TRIAGE_RULES_PATH")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        let config = Self {
            threshold,
            rules_path,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject thresholds outside `[0, 1]`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_threshold(self.threshold)
    }

    /// Load the configured rule set, or the built-in defaults.
    pub fn load_rules(&self) -> Result<RuleSet, ConfigError> {
        match &self.rules_path {
            Some(path) => RuleSet::load(path),
            None => Ok(RuleSet::default_rules()),
        }
    }
}

/// ReAct agent configuration.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Maximum number of loop steps per run.
    pub max_steps: usize,
    /// Calendar owner passed to `read_calendar`.
    pub user_id: String,
    /// Contact query used when the run has no sender.
    pub default_contact: String,
    /// Let scheduling runs FINISH once the calendar has offered slots.
    /// Off by default: a scheduling email keeps calling the calendar.
    pub finish_on_slots: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            user_id: "me".to_string(),
            default_contact: "alice".to_string(),
            finish_on_slots: false,
        }
    }
}

impl AgentConfig {
    /// Build config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let max_steps = parse_var(&lookup, "REACT_MAX_STEPS")?.unwrap_or(defaults.max_steps);
        let user_id = lookup("REACT_USER_ID").unwrap_or(defaults.user_id);
        let default_contact = lookup("REACT_DEFAULT_CONTACT").unwrap_or(defaults.default_contact);
        let finish_on_slots =
            parse_var(&lookup, "REACT_FINISH_ON_SLOTS")?.unwrap_or(defaults.finish_on_slots);

        Ok(Self {
            max_steps,
            user_id,
            default_contact,
            finish_on_slots,
        })
    }
}

/// Reject a threshold outside `[0, 1]`.
pub fn validate_threshold(threshold: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            key: "TRIAGE_THRESHOLD".into(),
            message: format!("{threshold} is outside [0, 1]"),
        })
    }
}

/// Parse an optional variable, failing loudly on malformed values.
pub(crate) fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            }),
    }
}
