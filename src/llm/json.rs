//! Locating the JSON answer in model output.
//!
//! Both LLM calls ask for a single object: the classifier for
//! `{"label", "confidence"}` and the planner for
//! `{"thought", "action", "action_input"}`. Models still wrap it in code
//! fences or a sentence of prose, so parsing goes through
//! [`extract_json_object`] first.

/// Slice of `text` holding the answer object.
///
/// Looks inside the first code fence when there is one, then narrows to the
/// outermost braces. Text with no braces comes back trimmed so the caller's
/// parse error shows what the model actually said.
pub fn extract_json_object(text: &str) -> &str {
    let body = fenced_body(text).unwrap_or(text).trim();
    match (body.find('{'), body.rfind('}')) {
        (Some(start), Some(end)) if end > start => &body[start..=end],
        _ => body,
    }
}

/// Contents of the first ``` fence, without its language tag line.
fn fenced_body(text: &str) -> Option<&str> {
    let (_, rest) = text.split_once("```")?;
    let (inner, _) = rest.split_once("```")?;
    match inner.split_once('\n') {
        Some((tag, body)) if !tag.contains('{') => Some(body),
        _ => Some(inner),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_classification_passes_through() {
        let raw = r#"  {"label": "meeting", "confidence": 0.4}
"#;
        assert_eq!(
            extract_json_object(raw),
            r#"{"label": "meeting", "confidence": 0.4}"#
        );
    }

    #[test]
    fn classification_in_json_fence() {
        let raw = "```json\n{\"label\": \"finance\", \"confidence\": 0.92}\n```";
        assert_eq!(
            extract_json_object(raw),
            r#"{"label": "finance", "confidence": 0.92}"#
        );
    }

    #[test]
    fn plan_in_untagged_fence_after_prose() {
        let raw = "Here is my plan:\n```\n{\"thought\": \"check slots\", \"action\": \"read_calendar\", \
                   \"action_input\": {\"user_id\": \"me\"}}\n```\nLet me know.";
        let json = extract_json_object(raw);
        let plan: serde_json::Value = serde_json::from_str(json).unwrap();
        assert_eq!(plan["action"], "read_calendar");
        assert_eq!(plan["action_input"]["user_id"], "me");
    }

    #[test]
    fn single_line_fence_keeps_object() {
        let raw = "```json {\"label\": \"spam\", \"confidence\": 0.99}```";
        assert_eq!(
            extract_json_object(raw),
            r#"{"label": "spam", "confidence": 0.99}"#
        );
    }

    #[test]
    fn reply_plan_with_braces_in_prose() {
        // nested object braces stay inside the slice
        let raw = r#"Sure. {"thought": "simple", "action": "reply", "action_input": {"text": "Tuesday works"}} Thanks!"#;
        let plan: serde_json::Value = serde_json::from_str(extract_json_object(raw)).unwrap();
        assert_eq!(plan["action"], "reply");
        assert_eq!(plan["action_input"]["text"], "Tuesday works");
    }

    #[test]
    fn refusal_text_comes_back_trimmed() {
        assert_eq!(
            extract_json_object("  I cannot classify this email.  "),
            "I cannot classify this email."
        );
    }
}
