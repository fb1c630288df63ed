//! Triage Assist: email triage routing and a bounded ReAct loop.

pub mod agent;
pub mod config;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod tools;
