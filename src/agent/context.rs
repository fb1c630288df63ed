//! Per-run mutable context threaded through the ReAct loop.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::pipeline::types::ClassificationResult;

/// State a single run carries from step to step.
///
/// Not `Clone`: a context is moved into exactly one run and comes back out
/// inside that run's trace.
#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    /// Triage decision made before the loop started.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triage: Option<ClassificationResult>,
    /// Observation from the most recent tool call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_observation: Option<serde_json::Value>,
    /// Ad hoc flags set by callers or actions. Kept under their own key so a
    /// flag name cannot shadow a field.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub flags: BTreeMap<String, serde_json::Value>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        let sender = sender.into();
        self.sender = (!sender.trim().is_empty()).then_some(sender);
        self
    }

    pub fn with_triage(mut self, triage: ClassificationResult) -> Self {
        self.triage = Some(triage);
        self
    }

    pub fn set_flag(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.flags.insert(key.into(), value);
    }

    pub fn flag(&self, key: &str) -> Option<&serde_json::Value> {
        self.flags.get(key)
    }

    pub fn record_observation(&mut self, observation: serde_json::Value) {
        self.last_observation = Some(observation);
    }

    /// Slots from the last calendar observation, if any.
    pub fn known_slots(&self) -> Vec<String> {
        self.last_observation
            .as_ref()
            .and_then(|o| o.get("available_slots"))
            .and_then(|s| s.as_array())
            .map(|slots| {
                slots
                    .iter()
                    .filter_map(|s| s.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::Label;

    #[test]
    fn blank_sender_is_none() {
        assert!(RunContext::new().with_sender("  ").sender.is_none());
        assert_eq!(
            RunContext::new().with_sender("bob").sender.as_deref(),
            Some("bob")
        );
    }

    #[test]
    fn flags_nest_under_their_own_key() {
        let mut ctx = RunContext::new().with_sender("alice");
        assert!(serde_json::to_value(&ctx).unwrap().get("flags").is_none());

        ctx.set_flag("priority", serde_json::json!("high"));
        let json = serde_json::to_value(&ctx).unwrap();
        assert_eq!(json["sender"], "alice");
        assert_eq!(json["flags"]["priority"], "high");
        assert!(json.get("priority").is_none());
        assert!(json.get("last_observation").is_none());
        assert_eq!(ctx.flag("priority"), Some(&serde_json::json!("high")));
    }

    #[test]
    fn flag_named_like_a_field_stays_separate() {
        let mut ctx = RunContext::new().with_sender("alice");
        ctx.set_flag("sender", serde_json::json!("spoofed"));
        ctx.set_flag("last_observation", serde_json::json!(1));

        let json = serde_json::to_string(&ctx).unwrap();
        let back: RunContext = serde_json::from_str(&json).unwrap();
        assert_eq!(back.sender.as_deref(), Some("alice"));
        assert_eq!(back.flag("sender"), Some(&serde_json::json!("spoofed")));
        assert!(back.last_observation.is_none());
        assert_eq!(back, ctx);
    }

    #[test]
    fn known_slots_from_calendar_observation() {
        let mut ctx = RunContext::new();
        assert!(ctx.known_slots().is_empty());
        ctx.record_observation(serde_json::json!({
            "tool": "read_calendar",
            "available_slots": ["2025-03-10T09:00:00", "2025-03-11T10:00:00"]
        }));
        assert_eq!(ctx.known_slots().len(), 2);
    }

    #[test]
    fn round_trips_through_json() {
        let mut ctx = RunContext::new()
            .with_sender("bob")
            .with_triage(ClassificationResult::rule(Label::Meeting, 0.4));
        ctx.set_flag("vip", serde_json::json!(true));
        let json = serde_json::to_string(&ctx).unwrap();
        let back: RunContext = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ctx);
    }
}
