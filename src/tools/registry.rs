//! Tool registry and dispatch.
//!
//! Dispatch never fails: unknown tools and tool errors come back as
//! error-shaped observations (`{tool, error}`) so the ReAct loop has a single
//! path for every outcome.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::llm::ToolDefinition;
use crate::tools::calendar::{MockCalendar, READ_CALENDAR, ReadCalendarTool};
use crate::tools::contact::{ContactDirectory, LOOKUP_CONTACT, LookupContactTool};
use crate::tools::tool::Tool;

/// Names of built-in tools that cannot be shadowed by dynamic registrations.
const PROTECTED_TOOL_NAMES: &[&str] = &[READ_CALENDAR, LOOKUP_CONTACT];

/// Observation error text for a tool name nothing is registered under.
pub const UNKNOWN_TOOL_ERROR: &str = "Unknown tool";

/// Registry of available tools.
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Arc<dyn Tool>>>,
    /// Tracks which names were registered as built-in (protected from shadowing).
    builtin_names: RwLock<HashSet<String>>,
}

impl ToolRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            tools: RwLock::new(HashMap::new()),
            builtin_names: RwLock::new(HashSet::new()),
        }
    }

    /// Registry holding the mock calendar and contact tools.
    pub fn with_mock_tools(calendar: MockCalendar, directory: ContactDirectory) -> Self {
        let registry = Self::new();
        registry.register_sync(Arc::new(ReadCalendarTool::new(calendar)));
        registry.register_sync(Arc::new(LookupContactTool::new(directory)));
        registry
    }

    /// Register a tool. Rejects dynamic tools that try to shadow a built-in name.
    pub async fn register(&self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.builtin_names.read().await.contains(&name) {
            warn!(
                tool = %name,
                "Rejected tool registration: would shadow a built-in tool"
            );
            return;
        }
        self.tools.write().await.insert(name.clone(), tool);
        debug!("Registered tool: {}", name);
    }

    /// Register a tool (sync version for startup, marks as built-in).
    pub fn register_sync(&self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if let Ok(mut tools) = self.tools.try_write() {
            tools.insert(name.clone(), tool);
            if PROTECTED_TOOL_NAMES.contains(&name.as_str())
                && let Ok(mut builtins) = self.builtin_names.try_write()
            {
                builtins.insert(name.clone());
            }
            debug!("Registered tool: {}", name);
        }
    }

    /// Get a tool by name.
    pub async fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.read().await.get(name).cloned()
    }

    /// Check if a tool exists.
    pub async fn has(&self, name: &str) -> bool {
        self.tools.read().await.contains_key(name)
    }

    /// List all tool names, sorted.
    pub async fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Get the number of registered tools.
    pub fn count(&self) -> usize {
        self.tools.try_read().map(|t| t.len()).unwrap_or(0)
    }

    /// Get tool definitions for the planner prompt, sorted by name.
    pub async fn tool_definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self
            .tools
            .read()
            .await
            .values()
            .map(|tool| ToolDefinition {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters_schema(),
            })
            .collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Run a tool by name and return its observation.
    pub async fn dispatch(&self, name: &str, params: serde_json::Value) -> serde_json::Value {
        let Some(tool) = self.get(name).await else {
            warn!(tool = %name, "Dispatch to unknown tool");
            return serde_json::json!({ "tool": name, "error": UNKNOWN_TOOL_ERROR });
        };

        match tool.execute(params).await {
            Ok(observation) => {
                debug!(tool = %name, "Tool call succeeded");
                observation
            }
            Err(e) => {
                warn!(tool = %name, error = %e, "Tool call failed");
                serde_json::json!({ "tool": name, "error": e.to_string() })
            }
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::NaiveDate;

    use super::*;
    use crate::error::ToolError;

    #[derive(Debug)]
    struct MockTool {
        name: String,
    }

    #[async_trait]
    impl Tool for MockTool {
        fn name(&self) -> &str {
            &self.name
        }
        fn description(&self) -> &str {
            "A mock tool for testing"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({"type": "object", "properties": {}})
        }
        async fn execute(
            &self,
            _params: serde_json::Value,
        ) -> Result<serde_json::Value, ToolError> {
            Ok(serde_json::json!({"tool": self.name, "ok": true}))
        }
    }

    fn mock_registry() -> ToolRegistry {
        ToolRegistry::with_mock_tools(
            MockCalendar::pinned(NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()),
            ContactDirectory::mock(),
        )
    }

    #[tokio::test]
    async fn test_register_and_get() {
        let registry = ToolRegistry::new();
        registry
            .register(Arc::new(MockTool {
                name: "test_tool".to_string(),
            }))
            .await;
        assert!(registry.has("test_tool").await);
        assert!(!registry.has("nonexistent").await);
        assert_eq!(registry.get("test_tool").await.unwrap().name(), "test_tool");
    }

    #[tokio::test]
    async fn mock_tools_registered() {
        let registry = mock_registry();
        assert_eq!(registry.count(), 2);
        assert_eq!(registry.list().await, vec!["lookup_contact", "read_calendar"]);
    }

    #[tokio::test]
    async fn builtin_names_cannot_be_shadowed() {
        let registry = mock_registry();
        registry
            .register(Arc::new(MockTool {
                name: "read_calendar".to_string(),
            }))
            .await;
        let observation = registry
            .dispatch("read_calendar", serde_json::json!({}))
            .await;
        // still the real calendar
        assert!(observation.get("available_slots").is_some());
    }

    #[tokio::test]
    async fn test_tool_definitions() {
        let defs = mock_registry().tool_definitions().await;
        assert_eq!(defs.len(), 2);
        assert_eq!(defs[0].name, "lookup_contact");
        assert_eq!(defs[1].name, "read_calendar");
    }

    #[tokio::test]
    async fn dispatch_known_tool() {
        let observation = mock_registry()
            .dispatch("lookup_contact", serde_json::json!({"query": "bob"}))
            .await;
        assert_eq!(observation["contact"]["name"], "Bob Singh");
    }

    #[tokio::test]
    async fn dispatch_unknown_tool_is_error_shaped() {
        let observation = mock_registry()
            .dispatch("send_email", serde_json::json!({"to": "x"}))
            .await;
        assert_eq!(
            observation,
            serde_json::json!({"tool": "send_email", "error": "Unknown tool"})
        );
    }

    #[tokio::test]
    async fn dispatch_bad_params_is_error_shaped() {
        let observation = mock_registry()
            .dispatch("lookup_contact", serde_json::json!({}))
            .await;
        assert_eq!(observation["tool"], "lookup_contact");
        assert!(observation["error"].as_str().unwrap().contains("Invalid parameters"));
    }
}
