//! Trace builder: the auditable record of one ReAct run.
//!
//! The exported JSON shape is the contract review and export tooling read:
//!
//! ```json
//! {
//!   "trace_id": "…",
//!   "created_at": "2025-03-10T09:15:02",
//!   "input": {"subject": "…", "body": "…", "context": {…}},
//!   "trace": [{"step": 1, "timestamp": "…", "thought": "…",
//!              "action": "CALL_TOOL", "action_input": {"tool": "…", "args": {…}},
//!              "observation": {…}}],
//!   "final": {"summary": "…", "suggested_action": {…}}
//! }
//! ```

use chrono::Local;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agent::action::Action;
use crate::agent::context::RunContext;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Summary text attached to every finished trace.
pub const FINAL_SUMMARY: &str = "Agent suggests follow-up action based on tools and reasoning.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepAction {
    CallTool,
    Finish,
}

/// One (thought, action, observation) record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactStep {
    /// 1-based, contiguous.
    pub step: usize,
    pub timestamp: String,
    pub thought: String,
    pub action: StepAction,
    pub action_input: serde_json::Value,
    pub observation: Option<serde_json::Value>,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct TraceInput {
    pub subject: String,
    pub body: String,
    pub context: RunContext,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceFinal {
    pub summary: String,
    pub suggested_action: serde_json::Value,
}

/// A completed run.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct ReactTrace {
    pub trace_id: Uuid,
    pub created_at: String,
    pub input: TraceInput,
    pub trace: Vec<ReactStep>,
    #[serde(rename = "final")]
    pub outcome: TraceFinal,
}

impl ReactTrace {
    /// Whether the run ended on an explicit FINISH rather than the step bound.
    pub fn is_finished(&self) -> bool {
        self.last_step()
            .is_some_and(|s| s.action == StepAction::Finish)
    }

    pub fn step_count(&self) -> usize {
        self.trace.len()
    }

    pub fn last_step(&self) -> Option<&ReactStep> {
        self.trace.last()
    }

    /// Tool names called, in order.
    pub fn tools_called(&self) -> Vec<&str> {
        self.trace
            .iter()
            .filter(|s| s.action == StepAction::CallTool)
            .filter_map(|s| s.action_input.get("tool").and_then(|t| t.as_str()))
            .collect()
    }
}

/// Accumulates steps for one run, then seals them into a [`ReactTrace`].
///
/// Steps are append-only. Once a FINISH step is recorded further records are
/// dropped.
#[derive(Debug)]
pub struct TraceBuilder {
    trace_id: Uuid,
    created_at: String,
    subject: String,
    body: String,
    steps: Vec<ReactStep>,
}

impl TraceBuilder {
    /// Start a trace, assigning its id and creation time.
    pub fn begin(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            trace_id: Uuid::new_v4(),
            created_at: now(),
            subject: subject.into(),
            body: body.into(),
            steps: Vec::new(),
        }
    }

    pub fn trace_id(&self) -> Uuid {
        self.trace_id
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    fn is_sealed(&self) -> bool {
        self.steps
            .last()
            .is_some_and(|s| s.action == StepAction::Finish)
    }

    /// Append a step and return its number.
    pub fn record(
        &mut self,
        thought: impl Into<String>,
        action: &Action,
        observation: Option<serde_json::Value>,
    ) -> usize {
        if self.is_sealed() {
            tracing::warn!(
                trace_id = %self.trace_id,
                "Ignoring step recorded after FINISH"
            );
            return self.steps.len();
        }

        let (kind, action_input) = match action {
            Action::CallTool(call) => (
                StepAction::CallTool,
                serde_json::json!({ "tool": call.tool_name(), "args": call.args() }),
            ),
            Action::Finish(answer) => (
                StepAction::Finish,
                serde_json::to_value(answer).unwrap_or_else(|_| serde_json::json!({})),
            ),
        };

        let step = self.steps.len() + 1;
        self.steps.push(ReactStep {
            step,
            timestamp: now(),
            thought: thought.into(),
            action: kind,
            action_input,
            observation,
        });
        step
    }

    /// Seal the trace. The suggested action is the last step's observation.
    pub fn finish(self, context: RunContext) -> ReactTrace {
        let suggested_action = self
            .steps
            .last()
            .and_then(|s| s.observation.clone())
            .unwrap_or_else(|| serde_json::json!({}));

        ReactTrace {
            trace_id: self.trace_id,
            created_at: self.created_at,
            input: TraceInput {
                subject: self.subject,
                body: self.body,
                context,
            },
            trace: self.steps,
            outcome: TraceFinal {
                summary: FINAL_SUMMARY.to_string(),
                suggested_action,
            },
        }
    }
}

fn now() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}
