//! Step planners: decide the next action from the loop state.
//!
//! [`HeuristicPlanner`] is keyword-driven and deterministic. The LLM-backed
//! planner lives in `llm_planner`.

use async_trait::async_trait;

use crate::agent::action::{Decision, FinalAnswer, ToolCall};
use crate::agent::context::RunContext;
use crate::config::AgentConfig;

pub const SCHEDULING_KEYWORDS: &[&str] = &["schedule", "meeting", "call"];

pub const CONTACT_KEYWORDS: &[&str] = &["who is", "contact", "email"];

/// Appended to the loop text once a calendar observation offered slots.
pub const SLOTS_MARKER: &str = "calendar_has_slots";

/// Steps after which the planner may finish instead of gathering more context.
pub const FINISH_AFTER_STEP: usize = 2;

/// What the email text asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Scheduling,
    ContactLookup,
    None,
}

impl Intent {
    /// Scheduling wins when both keyword classes match.
    pub fn detect(text: &str) -> Self {
        if SCHEDULING_KEYWORDS.iter().any(|k| text.contains(k)) {
            Self::Scheduling
        } else if CONTACT_KEYWORDS.iter().any(|k| text.contains(k)) {
            Self::ContactLookup
        } else {
            Self::None
        }
    }
}

/// Read-only view of the loop handed to a planner each step.
#[derive(Debug, Clone, Copy)]
pub struct LoopState<'a> {
    /// 1-based index of the step being decided.
    pub step: usize,
    /// Lowercased subject and body plus any appended markers.
    pub text: &'a str,
    pub subject: &'a str,
    pub body: &'a str,
    pub context: &'a RunContext,
}

impl LoopState<'_> {
    pub fn has_slots_marker(&self) -> bool {
        self.text.contains(SLOTS_MARKER)
    }
}

/// Chooses one action per step.
#[async_trait]
pub trait Planner: Send + Sync {
    fn name(&self) -> &str;

    /// Decide the next step. Must not fail; planners degrade to a FINISH.
    async fn decide(&self, state: &LoopState<'_>) -> Decision;
}

/// Keyword planner.
///
/// Same text and context always produce the same decision. A scheduling
/// email always calls the calendar unless `finish_on_slots` is set, in which
/// case it finishes after step 2 once the slots marker is present.
#[derive(Debug, Clone)]
pub struct HeuristicPlanner {
    user_id: String,
    default_contact: String,
    finish_on_slots: bool,
}

impl Default for HeuristicPlanner {
    fn default() -> Self {
        Self::new(&AgentConfig::default())
    }
}

impl HeuristicPlanner {
    pub fn new(config: &AgentConfig) -> Self {
        Self {
            user_id: config.user_id.clone(),
            default_contact: config.default_contact.clone(),
            finish_on_slots: config.finish_on_slots,
        }
    }

    fn calendar(&self, date_hint: Option<&str>) -> ToolCall {
        ToolCall::ReadCalendar {
            user_id: self.user_id.clone(),
            date_hint: date_hint.map(String::from),
        }
    }

    fn finish(&self, state: &LoopState<'_>) -> Decision {
        Decision::finish(
            "I have enough context; prepare a final suggested action.",
            FinalAnswer::ask_for_availability().with_slots(state.context.known_slots()),
        )
    }

    /// Synchronous core of [`Planner::decide`].
    pub fn plan(&self, state: &LoopState<'_>) -> Decision {
        let may_finish = state.step > FINISH_AFTER_STEP;
        let slots_known = self.finish_on_slots && state.has_slots_marker();

        match Intent::detect(state.text) {
            Intent::Scheduling if may_finish && slots_known => self.finish(state),
            Intent::Scheduling => Decision::call(
                "Email requests scheduling. I should check the user's calendar and find slots.",
                self.calendar(Some("next available")),
            ),
            Intent::ContactLookup => {
                let query = state
                    .context
                    .sender
                    .clone()
                    .unwrap_or_else(|| self.default_contact.clone());
                Decision::call(
                    "User is asking about a contact. I should look up the contact details.",
                    ToolCall::LookupContact { query },
                )
            }
            Intent::None if may_finish => self.finish(state),
            Intent::None => Decision::call(
                "No clear action yet. I'll check calendar proactively to gather context.",
                self.calendar(None),
            ),
        }
    }
}

#[async_trait]
impl Planner for HeuristicPlanner {
    fn name(&self) -> &str {
        "heuristic"
    }

    async fn decide(&self, state: &LoopState<'_>) -> Decision {
        self.plan(state)
    }
}
