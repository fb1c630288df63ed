//! Error types for Triage Assist.

use std::path::PathBuf;

/// Configuration-related errors.
///
/// These are the only failures allowed to surface to a caller, and only
/// before a run starts.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

/// Tool execution errors.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Tool {name} execution failed: {reason}")]
    ExecutionFailed { name: String, reason: String },

    #[error("Invalid parameters for tool {name}: {reason}")]
    InvalidParameters { name: String, reason: String },
}

/// Pipeline-related errors.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Triage failed: {0}")]
    Triage(String),
}

/// Evaluation harness errors.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error("Failed to read dataset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse dataset: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Failed to write report {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_names_variable() {
        let err = ConfigError::MissingEnvVar("OPENAI_API_KEY".into());
        assert_eq!(
            err.to_string(),
            "Missing required environment variable: OPENAI_API_KEY"
        );
    }

    #[test]
    fn rules_file_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "rules.toml");
        let err: ConfigError = io.into();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn eval_io_error_names_path() {
        let err = EvalError::Io {
            path: PathBuf::from("data/golden.json"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert!(err.to_string().contains("data/golden.json"));
    }
}
