//! The `Tool` trait.

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::error::ToolError;

/// A capability the ReAct loop can call.
///
/// Tools return plain JSON mappings. Domain misses (no contact, no slots)
/// are part of that mapping, not errors; `ToolError` is reserved for calls
/// that could not run at all, and the registry turns those into
/// error-shaped observations too.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the parameters object.
    fn parameters_schema(&self) -> serde_json::Value;

    async fn execute(&self, params: serde_json::Value) -> Result<serde_json::Value, ToolError>;
}

/// Decode a tool's parameter object into its typed argument struct.
pub fn parse_params<T: DeserializeOwned>(
    tool: &str,
    params: serde_json::Value,
) -> Result<T, ToolError> {
    // A null params object means "no arguments"
    let params = if params.is_null() {
        serde_json::json!({})
    } else {
        params
    };
    serde_json::from_value(params).map_err(|e| ToolError::InvalidParameters {
        name: tool.to_string(),
        reason: e.to_string(),
    })
}

/// Serialize a tool result into an observation mapping.
pub fn to_observation<T: serde::Serialize>(
    tool: &str,
    result: &T,
) -> Result<serde_json::Value, ToolError> {
    serde_json::to_value(result).map_err(|e| ToolError::ExecutionFailed {
        name: tool.to_string(),
        reason: e.to_string(),
    })
}
