//! Actions a planner can choose.

use serde::{Deserialize, Serialize};

use crate::tools::calendar::READ_CALENDAR;
use crate::tools::contact::LOOKUP_CONTACT;

/// Proposed action when the agent asks the sender for times.
pub const ASK_FOR_AVAILABILITY: &str = "ask_for_availability";

/// A tool invocation with tool-specific arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    ReadCalendar {
        user_id: String,
        date_hint: Option<String>,
    },
    LookupContact {
        query: String,
    },
    /// A tool name outside the built-in vocabulary (only an LLM planner
    /// produces these). Dispatched by name; unregistered names yield an
    /// error observation.
    Unsupported {
        tool: String,
        args: serde_json::Value,
    },
}

impl ToolCall {
    pub fn tool_name(&self) -> &str {
        match self {
            Self::ReadCalendar { .. } => READ_CALENDAR,
            Self::LookupContact { .. } => LOOKUP_CONTACT,
            Self::Unsupported { tool, .. } => tool,
        }
    }

    /// Parameter object handed to the tool.
    pub fn args(&self) -> serde_json::Value {
        match self {
            Self::ReadCalendar { user_id, date_hint } => {
                serde_json::json!({ "user_id": user_id, "date_hint": date_hint })
            }
            Self::LookupContact { query } => serde_json::json!({ "query": query }),
            Self::Unsupported { args, .. } => args.clone(),
        }
    }
}

/// The recommendation a run ends with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalAnswer {
    pub final_message: String,
    pub proposed_action: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub proposed_slots: Vec<String>,
}

impl FinalAnswer {
    /// Reply asking the sender for preferred times.
    pub fn ask_for_availability() -> Self {
        Self {
            final_message: "Suggested action: Reply asking for preferred times, propose slots \
                            from calendar if available."
                .to_string(),
            proposed_action: ASK_FOR_AVAILABILITY.to_string(),
            proposed_slots: Vec::new(),
        }
    }

    pub fn with_slots(mut self, slots: Vec<String>) -> Self {
        self.proposed_slots = slots;
        self
    }
}

/// What the loop does this step.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    CallTool(ToolCall),
    Finish(FinalAnswer),
}

/// A planner's output for one step.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub thought: String,
    pub action: Action,
}

impl Decision {
    pub fn call(thought: impl Into<String>, call: ToolCall) -> Self {
        Self {
            thought: thought.into(),
            action: Action::CallTool(call),
        }
    }

    pub fn finish(thought: impl Into<String>, answer: FinalAnswer) -> Self {
        Self {
            thought: thought.into(),
            action: Action::Finish(answer),
        }
    }
}
