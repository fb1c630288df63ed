//! LLM integration for Triage Assist.
//!
//! Supports:
//! - **OpenAI**: Direct API access via rig-core
//! - **Anthropic**: Direct API access via rig-core
//!
//! Uses the rig-core crate for HTTP transport and the `RigAdapter` to bridge
//! rig's `CompletionModel` trait to our `LlmProvider` trait. Callers treat every
//! provider as unreliable and wrap it with a safe default.

pub mod json;
pub mod provider;
mod rig_adapter;

pub use json::extract_json_object;
pub use provider::*;
pub use rig_adapter::RigAdapter;

use std::sync::Arc;

use rig::client::CompletionClient;
use secrecy::ExposeSecret;

use crate::error::{ConfigError, LlmError};

/// Supported LLM backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmBackend {
    Anthropic,
    OpenAi,
}

impl LlmBackend {
    /// Environment variable holding this backend's API key.
    pub fn api_key_var(self) -> &'static str {
        match self {
            Self::Anthropic => "ANTHROPIC_API_KEY",
            Self::OpenAi => "OPENAI_API_KEY",
        }
    }

    /// Model used when `TRIAGE_LLM_MODEL` is unset.
    pub fn default_model(self) -> &'static str {
        match self {
            Self::Anthropic => "claude-sonnet-4-20250514",
            Self::OpenAi => "gpt-4o-mini",
        }
    }
}

impl std::str::FromStr for LlmBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            other => Err(format!("unknown LLM backend '{other}' (expected openai or anthropic)")),
        }
    }
}

/// Configuration for creating an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    pub api_key: secrecy::SecretString,
    pub model: String,
}

impl LlmConfig {
    /// Read LLM settings from the environment.
    ///
    /// Returns `Ok(None)` when no API key is set, which puts triage and the
    /// ReAct loop into rule-only / heuristic-only mode.
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like `from_env`, but a missing key is an error.
    pub fn require_from_env() -> Result<Self, ConfigError> {
        Self::require_from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Option<Self>, ConfigError> {
        let backend = crate::config::parse_var::<LlmBackend>(&lookup, "TRIAGE_LLM_BACKEND")?
            .unwrap_or(LlmBackend::OpenAi);

        let Some(api_key) = lookup(backend.api_key_var()).filter(|k| !k.trim().is_empty())
        else {
            return Ok(None);
        };

        let model = lookup("TRIAGE_LLM_MODEL")
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| backend.default_model().to_string());

        Ok(Some(Self {
            backend,
            api_key: secrecy::SecretString::from(api_key),
            model,
        }))
    }

    pub fn require_from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let backend = crate::config::parse_var::<LlmBackend>(&lookup, "TRIAGE_LLM_BACKEND")?
            .unwrap_or(LlmBackend::OpenAi);
        Self::from_lookup(lookup)?
            .ok_or_else(|| ConfigError::MissingEnvVar(backend.api_key_var().to_string()))
    }
}

/// Create an LLM provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    match config.backend {
        LlmBackend::Anthropic => create_anthropic_provider(config),
        LlmBackend::OpenAi => create_openai_provider(config),
    }
}

fn create_anthropic_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    use rig::providers::anthropic;

    let client: rig::client::Client<anthropic::client::AnthropicExt> =
        anthropic::Client::new(config.api_key.expose_secret()).map_err(|e| {
            LlmError::RequestFailed {
                provider: "anthropic".to_string(),
                reason: format!("Failed to create Anthropic client: {}", e),
            }
        })?;

    let model = client.completion_model(&config.model);
    tracing::info!("Using Anthropic (model: {})", config.model);
    Ok(Arc::new(RigAdapter::new(model, &config.model)))
}

fn create_openai_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    use rig::providers::openai;

    let client: rig::client::Client<openai::client::OpenAIResponsesExt> =
        openai::Client::new(config.api_key.expose_secret()).map_err(|e| {
            LlmError::RequestFailed {
                provider: "openai".to_string(),
                reason: format!("Failed to create OpenAI client: {}", e),
            }
        })?;

    let model = client.completion_model(&config.model);
    tracing::info!("Using OpenAI (model: {})", config.model);
    Ok(Arc::new(RigAdapter::new(model, &config.model)))
}
