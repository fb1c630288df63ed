//! ReAct orchestration: planners choose actions, the loop executes them
//! against the tool registry, and every step lands in a [`ReactTrace`].

pub mod action;
pub mod context;
pub mod llm_planner;
pub mod planner;
pub mod react;
pub mod trace;

pub use action::{Action, Decision, FinalAnswer, ToolCall};
pub use context::RunContext;
pub use llm_planner::LlmPlanner;
pub use planner::{HeuristicPlanner, Intent, LoopState, Planner};
pub use react::ReactAgent;
pub use trace::{ReactStep, ReactTrace, StepAction, TraceBuilder};
