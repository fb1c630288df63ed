//! LLM-backed planner.
//!
//! The model answers `{thought, action, action_input}`. `read_calendar` and
//! `lookup_contact` map to their tool calls, `reply`/`finish` end the run and
//! any other action name is passed through for the registry to reject. A
//! failed call or unreadable answer ends the run with a reply asking for
//! preferred times.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::agent::action::{ASK_FOR_AVAILABILITY, Decision, FinalAnswer, ToolCall};
use crate::agent::planner::{LoopState, Planner};
use crate::config::AgentConfig;
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider, ToolDefinition, extract_json_object};
use crate::tools::calendar::READ_CALENDAR;
use crate::tools::contact::LOOKUP_CONTACT;

const PLAN_MAX_TOKENS: u32 = 512;

const PLAN_TEMPERATURE: f32 = 0.0;

/// Reply used when the model gives nothing usable.
const FALLBACK_REPLY: &str = "Let me know preferred times.";

pub struct LlmPlanner {
    llm: Arc<dyn LlmProvider>,
    tools: Vec<ToolDefinition>,
    user_id: String,
    default_contact: String,
}

impl LlmPlanner {
    /// `tools` are listed in the prompt; take them from the registry the loop
    /// dispatches to.
    pub fn new(llm: Arc<dyn LlmProvider>, tools: Vec<ToolDefinition>, config: &AgentConfig) -> Self {
        Self {
            llm,
            tools,
            user_id: config.user_id.clone(),
            default_contact: config.default_contact.clone(),
        }
    }

    fn fallback(&self, thought: String, state: &LoopState<'_>) -> Decision {
        Decision::finish(thought, reply(FALLBACK_REPLY, state))
    }

    fn to_decision(&self, response: PlanResponse, state: &LoopState<'_>) -> Decision {
        let thought = response.thought;
        let input = response.action_input;
        let action = response.action.trim().to_lowercase();

        match action.as_str() {
            READ_CALENDAR => {
                let (user_id, date_hint) = match &input {
                    serde_json::Value::Object(map) => (
                        map.get("user_id")
                            .and_then(|v| v.as_str())
                            .unwrap_or(&self.user_id)
                            .to_string(),
                        map.get("date_hint")
                            .and_then(|v| v.as_str())
                            .map(String::from),
                    ),
                    serde_json::Value::String(hint) => {
                        (self.user_id.clone(), Some(hint.clone()))
                    }
                    _ => (self.user_id.clone(), None),
                };
                Decision::call(thought, ToolCall::ReadCalendar { user_id, date_hint })
            }
            LOOKUP_CONTACT => {
                let query = match &input {
                    serde_json::Value::Object(map) => {
                        map.get("query").and_then(|v| v.as_str()).map(String::from)
                    }
                    serde_json::Value::String(q) => Some(q.clone()),
                    _ => None,
                }
                .filter(|q| !q.trim().is_empty())
                .or_else(|| state.context.sender.clone())
                .unwrap_or_else(|| self.default_contact.clone());
                Decision::call(thought, ToolCall::LookupContact { query })
            }
            "reply" | "finish" => {
                let message = match &input {
                    serde_json::Value::String(s) if !s.trim().is_empty() => s.as_str(),
                    serde_json::Value::Object(map) => map
                        .get("final_message")
                        .or_else(|| map.get("message"))
                        .and_then(|v| v.as_str())
                        .unwrap_or(FALLBACK_REPLY),
                    _ => FALLBACK_REPLY,
                };
                Decision::finish(thought, reply(message, state))
            }
            _ => Decision::call(
                thought,
                ToolCall::Unsupported {
                    tool: response.action,
                    args: input,
                },
            ),
        }
    }
}

fn reply(message: &str, state: &LoopState<'_>) -> FinalAnswer {
    FinalAnswer {
        final_message: message.to_string(),
        proposed_action: ASK_FOR_AVAILABILITY.to_string(),
        proposed_slots: state.context.known_slots(),
    }
}

#[async_trait]
impl Planner for LlmPlanner {
    fn name(&self) -> &str {
        "llm"
    }

    async fn decide(&self, state: &LoopState<'_>) -> Decision {
        let request = CompletionRequest::new(vec![
            ChatMessage::system(build_plan_system_prompt(&self.tools)),
            ChatMessage::user(build_plan_user_prompt(state)),
        ])
        .with_temperature(PLAN_TEMPERATURE)
        .with_max_tokens(PLAN_MAX_TOKENS);

        let response = match self.llm.complete(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    model = self.llm.model_name(),
                    step = state.step,
                    error = %e,
                    "LLM planning call failed, finishing with a reply"
                );
                return self.fallback("Planner unavailable.".to_string(), state);
            }
        };

        match parse_plan_response(&response.content) {
            Ok(plan) => {
                debug!(
                    step = state.step,
                    action = %plan.action,
                    input_tokens = response.input_tokens,
                    output_tokens = response.output_tokens,
                    "LLM plan parsed"
                );
                self.to_decision(plan, state)
            }
            Err(e) => {
                warn!(
                    raw_response = %response.content,
                    error = %e,
                    "Failed to parse LLM plan, finishing with a reply"
                );
                self.fallback(response.content, state)
            }
        }
    }
}

// ── Prompt construction ─────────────────────────────────────────────

fn build_plan_system_prompt(tools: &[ToolDefinition]) -> String {
    let tool_list: String = tools
        .iter()
        .map(|t| format!("- {}: {} Parameters: {}\n", t.name, t.description, t.parameters))
        .collect();

    format!(
        "You are an email assistant working in ReAct style.\n\
         Think step-by-step, then decide: call a tool or reply directly.\n\n\
         Available tools:\n{tool_list}\n\
         Respond ONLY in JSON with this EXACT format:\n\
         {{\"thought\": \"...\", \"action\": \"read_calendar\" | \"lookup_contact\" | \"reply\", \
         \"action_input\": {{...}} or \"string\"}}"
    )
}

fn build_plan_user_prompt(state: &LoopState<'_>) -> String {
    let body_preview: String = state.body.chars().take(2000).collect();
    let mut prompt = format!(
        "Step {}\n\nEmail:\nSubject: {}\nBody: {}\n",
        state.step, state.subject, body_preview
    );

    if let Some(triage) = &state.context.triage {
        prompt.push_str(&format!(
            "\nTriage result: {} (confidence {:.2}, source {:?})\n",
            triage.label, triage.confidence, triage.source
        ));
    }
    if let Some(sender) = &state.context.sender {
        prompt.push_str(&format!("\nSender: {sender}\n"));
    }
    if let Some(observation) = &state.context.last_observation {
        prompt.push_str(&format!("\nLast observation:\n{observation}\n"));
    }
    prompt
}

// ── Response parsing ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct PlanResponse {
    #[serde(default)]
    thought: String,
    action: String,
    #[serde(default)]
    action_input: serde_json::Value,
}

fn parse_plan_response(raw: &str) -> Result<PlanResponse, String> {
    let json_str = extract_json_object(raw);
    let plan: PlanResponse =
        serde_json::from_str(json_str).map_err(|e| format!("JSON parse error: {e}"))?;
    if plan.action.trim().is_empty() {
        return Err("empty action".to_string());
    }
    Ok(plan)
}
