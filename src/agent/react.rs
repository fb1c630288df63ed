//! The bounded ReAct loop.
//!
//! Each step asks the planner for a decision, executes it and records it:
//!
//! - `CALL_TOOL`: dispatch through the registry, store the observation in
//!   the context and, when the observation offers slots, append the slots
//!   marker to the loop text.
//! - `FINISH`: record `{"final": answer}` as the observation and stop.
//!
//! Reaching `max_steps` without a FINISH is a normal end; the last
//! observation becomes the suggested action.

use std::sync::Arc;

use tracing::{debug, info};

use crate::agent::action::Action;
use crate::agent::context::RunContext;
use crate::agent::planner::{HeuristicPlanner, LoopState, Planner, SLOTS_MARKER};
use crate::agent::trace::{ReactTrace, TraceBuilder};
use crate::config::AgentConfig;
use crate::pipeline::types::{ClassificationResult, EmailInput};
use crate::tools::registry::ToolRegistry;

/// Runs one email through plan → act → observe until FINISH or the step bound.
///
/// Holds no per-run state; one agent can serve concurrent runs.
pub struct ReactAgent {
    planner: Arc<dyn Planner>,
    tools: Arc<ToolRegistry>,
    max_steps: usize,
}

impl ReactAgent {
    /// Agent with the keyword planner.
    pub fn new(tools: Arc<ToolRegistry>, config: &AgentConfig) -> Self {
        Self {
            planner: Arc::new(HeuristicPlanner::new(config)),
            tools,
            max_steps: config.max_steps,
        }
    }

    pub fn with_planner(mut self, planner: Arc<dyn Planner>) -> Self {
        self.planner = planner;
        self
    }

    /// Run the loop for one email and return its trace.
    pub async fn run(&self, subject: &str, body: &str, mut context: RunContext) -> ReactTrace {
        let mut builder = TraceBuilder::begin(subject, body);
        let mut text = format!("{subject} {body}").to_lowercase();

        info!(
            trace_id = %builder.trace_id(),
            planner = self.planner.name(),
            max_steps = self.max_steps,
            "Starting ReAct run"
        );

        for step in 1..=self.max_steps {
            let decision = {
                let state = LoopState {
                    step,
                    text: &text,
                    subject,
                    body,
                    context: &context,
                };
                self.planner.decide(&state).await
            };

            match &decision.action {
                Action::Finish(answer) => {
                    let observation = serde_json::json!({ "final": answer });
                    builder.record(decision.thought, &decision.action, Some(observation));
                    debug!(step, "ReAct run finished");
                    break;
                }
                Action::CallTool(call) => {
                    let observation = self.tools.dispatch(call.tool_name(), call.args()).await;
                    debug!(step, tool = call.tool_name(), "Tool observed");

                    if observation.get("available_slots").is_some()
                        && !text.contains(SLOTS_MARKER)
                    {
                        text.push(' ');
                        text.push_str(SLOTS_MARKER);
                    }
                    context.record_observation(observation.clone());
                    builder.record(decision.thought, &decision.action, Some(observation));
                }
            }
        }

        let trace = builder.finish(context);
        info!(
            trace_id = %trace.trace_id,
            steps = trace.step_count(),
            finished = trace.is_finished(),
            "ReAct run complete"
        );
        trace
    }

    /// Run the loop for a triaged email, seeding the context with its sender.
    pub async fn run_email(
        &self,
        email: &EmailInput,
        triage: Option<ClassificationResult>,
    ) -> ReactTrace {
        let mut context = RunContext::new();
        if let Some(sender) = email.sender() {
            context = context.with_sender(sender);
        }
        if let Some(triage) = triage {
            context = context.with_triage(triage);
        }
        self.run(&email.subject, &email.body, context).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::NaiveDate;

    use super::*;
    use crate::agent::action::{Decision, FinalAnswer, ToolCall};
    use crate::agent::trace::StepAction;
    use crate::tools::{ContactDirectory, MockCalendar};

    fn registry() -> Arc<ToolRegistry> {
        Arc::new(ToolRegistry::with_mock_tools(
            MockCalendar::pinned(NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()),
            ContactDirectory::mock(),
        ))
    }

    fn agent() -> ReactAgent {
        ReactAgent::new(registry(), &AgentConfig::default())
    }

    /// Plays back a fixed list of decisions, then finishes.
    struct ScriptedPlanner {
        script: Mutex<Vec<Decision>>,
    }

    impl ScriptedPlanner {
        fn new(mut script: Vec<Decision>) -> Self {
            script.reverse();
            Self {
                script: Mutex::new(script),
            }
        }
    }

    #[async_trait]
    impl Planner for ScriptedPlanner {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn decide(&self, _state: &LoopState<'_>) -> Decision {
            self.script
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Decision::finish("done", FinalAnswer::ask_for_availability()))
        }
    }

    #[tokio::test]
    async fn scheduling_email_reads_calendar_first() {
        let trace = agent()
            .run(
                "Schedule a meeting",
                "Can we have a Zoom call tomorrow?",
                RunContext::new(),
            )
            .await;

        let first = &trace.trace[0];
        assert_eq!(first.step, 1);
        assert_eq!(first.action, StepAction::CallTool);
        assert_eq!(first.action_input["tool"], "read_calendar");
        assert_eq!(first.action_input["args"]["date_hint"], "next available");
        assert_eq!(trace.tools_called(), vec!["read_calendar"; 6]);
        assert_eq!(trace.step_count(), 6);
        assert!(!trace.is_finished());
        assert!(
            trace.outcome.suggested_action["available_slots"]
                .as_array()
                .is_some_and(|slots| !slots.is_empty())
        );
    }

    #[tokio::test]
    async fn finish_on_slots_ends_scheduling_at_step_three() {
        let config = AgentConfig {
            finish_on_slots: true,
            ..AgentConfig::default()
        };
        let trace = ReactAgent::new(registry(), &config)
            .run("Schedule a meeting", "tomorrow?", RunContext::new())
            .await;
        assert_eq!(trace.tools_called(), vec!["read_calendar", "read_calendar"]);
        assert_eq!(trace.step_count(), 3);
        assert!(trace.is_finished());
    }

    #[tokio::test]
    async fn finish_proposes_slots_and_is_suggested_action() {
        let trace = agent()
            .run("Hello", "Just checking in.", RunContext::new())
            .await;
        let last = trace.last_step().unwrap();
        assert_eq!(last.action, StepAction::Finish);
        assert_eq!(
            last.observation.as_ref().unwrap()["final"]["proposed_slots"][0],
            "2025-03-10T09:00:00"
        );
        assert_eq!(
            trace.outcome.suggested_action,
            last.observation.clone().unwrap()
        );
    }

    #[tokio::test]
    async fn no_keywords_finishes_at_step_three() {
        let trace = agent()
            .run("Hello", "Just checking in.", RunContext::new())
            .await;
        assert_eq!(trace.step_count(), 3);
        assert_eq!(trace.trace[0].action, StepAction::CallTool);
        assert_eq!(trace.trace[1].action, StepAction::CallTool);
        assert_eq!(trace.trace[2].action, StepAction::Finish);
        assert_eq!(trace.trace[0].action_input["args"]["date_hint"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn contact_email_runs_to_max_steps() {
        let trace = agent()
            .run(
                "Who is this?",
                "Please share the contact.",
                RunContext::new().with_sender("bob"),
            )
            .await;
        assert_eq!(trace.step_count(), 6);
        assert!(!trace.is_finished());
        assert_eq!(trace.outcome.suggested_action["contact"]["name"], "Bob Singh");
        assert_eq!(
            trace.input.context.last_observation.as_ref().unwrap()["found"],
            true
        );
    }

    #[tokio::test]
    async fn max_steps_bounds_the_trace() {
        let config = AgentConfig {
            max_steps: 2,
            ..AgentConfig::default()
        };
        let trace = ReactAgent::new(registry(), &config)
            .run("Who is bob", "", RunContext::new())
            .await;
        assert_eq!(trace.step_count(), 2);
    }

    #[tokio::test]
    async fn zero_max_steps_yields_empty_trace() {
        let config = AgentConfig {
            max_steps: 0,
            ..AgentConfig::default()
        };
        let trace = ReactAgent::new(registry(), &config)
            .run("Schedule", "", RunContext::new())
            .await;
        assert!(trace.trace.is_empty());
        assert_eq!(trace.outcome.suggested_action, serde_json::json!({}));
    }

    #[tokio::test]
    async fn same_input_same_actions() {
        let agent = agent();
        let a = agent.run("Meeting?", "call me", RunContext::new()).await;
        let b = agent.run("Meeting?", "call me", RunContext::new()).await;
        assert_ne!(a.trace_id, b.trace_id);
        let shape = |t: &ReactTrace| {
            t.trace
                .iter()
                .map(|s| (s.action, s.action_input.clone(), s.observation.clone()))
                .collect::<Vec<_>>()
        };
        assert_eq!(shape(&a), shape(&b));
    }

    #[tokio::test]
    async fn unknown_tool_observation_and_loop_continues() {
        let planner = ScriptedPlanner::new(vec![
            Decision::call(
                "try sending",
                ToolCall::Unsupported {
                    tool: "send_email".into(),
                    args: serde_json::json!({"to": "bob"}),
                },
            ),
            Decision::call(
                "look up",
                ToolCall::LookupContact {
                    query: "bob".into(),
                },
            ),
        ]);
        let trace = agent()
            .with_planner(Arc::new(planner))
            .run("x", "y", RunContext::new())
            .await;

        assert_eq!(
            trace.trace[0].observation,
            Some(serde_json::json!({"tool": "send_email", "error": "Unknown tool"}))
        );
        assert_eq!(trace.trace[1].action_input["tool"], "lookup_contact");
        assert_eq!(trace.step_count(), 3);
        assert!(trace.is_finished());
    }

    #[tokio::test]
    async fn run_email_seeds_sender_and_triage() {
        use crate::pipeline::types::Label;

        let email = EmailInput::new("Who is this?", "contact info please", "alice");
        let trace = agent()
            .run_email(&email, Some(ClassificationResult::rule(Label::Personal, 0.9)))
            .await;
        assert_eq!(trace.input.context.sender.as_deref(), Some("alice"));
        assert_eq!(trace.input.context.triage.as_ref().unwrap().label, Label::Personal);
        assert_eq!(trace.trace[0].action_input["args"]["query"], "alice");
    }
}
