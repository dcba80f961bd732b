//! Best-effort text extraction from completion payloads.
//!
//! Handles both the chat-completions shape (`choices[].message`) and the
//! responses shape (`output_text` / `output[].content`). The first shape
//! that matches wins; partial matches are never merged across shapes.

use serde_json::Value;

use crate::guards::to_str;

/// Flattened assistant text, or `""` when nothing is extractable.
pub fn extract_output_text(data: &Value) -> String {
    if let Some(text) = extract_chat_completion_text(data) {
        return text;
    }

    if let Some(text) = extract_output_text_field(data) {
        return text;
    }

    extract_output_items(data).unwrap_or_default()
}

/// `choices[]` path. `None` only when there is no `choices` array at all.
fn extract_chat_completion_text(data: &Value) -> Option<String> {
    let choices = data.get("choices")?.as_array()?;

    let mut parts: Vec<String> = Vec::new();
    for choice in choices {
        let Some(message) = choice.get("message").filter(|m| m.is_object()) else {
            continue;
        };

        let mut choice_has_text = false;
        match message.get("content") {
            Some(Value::String(content)) => {
                let trimmed = content.trim();
                if !trimmed.is_empty() {
                    parts.push(trimmed.to_string());
                    choice_has_text = true;
                }
            }
            Some(Value::Array(entries)) => {
                for entry in entries {
                    if to_str(entry.get("type")) != Some("text") {
                        continue;
                    }
                    if let Some(text) = to_str(entry.get("text")) {
                        parts.push(text.to_string());
                        choice_has_text = true;
                    }
                }
            }
            _ => {}
        }

        if !choice_has_text {
            if let Some(refusal) = to_str(message.get("refusal")).map(str::trim) {
                if !refusal.is_empty() {
                    parts.push(refusal.to_string());
                }
            }
        }
    }

    Some(parts.join("\n").trim().to_string())
}

/// Single-shot `output_text` convenience field.
fn extract_output_text_field(data: &Value) -> Option<String> {
    let text = to_str(data.get("output_text"))?.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Generic `output[]` path.
fn extract_output_items(data: &Value) -> Option<String> {
    let output = data.get("output")?.as_array()?;

    let mut parts: Vec<&str> = Vec::new();
    for item in output.iter().filter(|item| item.is_object()) {
        match item.get("content") {
            Some(Value::String(content)) => parts.push(content),
            Some(Value::Array(entries)) => {
                for entry in entries {
                    let kind = to_str(entry.get("type"));
                    if !matches!(kind, Some("output_text") | Some("text")) {
                        continue;
                    }
                    if let Some(text) = to_str(entry.get("text")) {
                        parts.push(text);
                    }
                }
            }
            _ => {}
        }
    }

    Some(parts.join("\n").trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn chat_completion_string_content() {
        let payload = json!({"choices": [{"message": {"content": "hi"}}]});
        assert_eq!(extract_output_text(&payload), "hi");
    }

    #[test]
    fn chat_completion_joins_choices_and_parts() {
        let payload = json!({"choices": [
            {"message": {"content": "  first  "}},
            {"message": {"content": [
                {"type": "text", "text": "second"},
                {"type": "image_url", "image_url": {"url": "x"}},
                {"type": "text", "text": "third"}
            ]}}
        ]});
        assert_eq!(extract_output_text(&payload), "first\nsecond\nthird");
    }

    #[test]
    fn chat_completion_falls_back_to_refusal() {
        let payload = json!({"choices": [
            {"message": {"content": null, "refusal": "  I can't help with that. "}}
        ]});
        assert_eq!(extract_output_text(&payload), "I can't help with that.");
    }

    #[test]
    fn refusal_ignored_when_choice_has_text() {
        let payload = json!({"choices": [
            {"message": {"content": "answer", "refusal": "nope"}}
        ]});
        assert_eq!(extract_output_text(&payload), "answer");
    }

    #[test]
    fn empty_choices_does_not_fall_through() {
        let payload = json!({"choices": [], "output_text": "ignored"});
        assert_eq!(extract_output_text(&payload), "");
    }

    #[test]
    fn output_text_field_is_trimmed() {
        assert_eq!(extract_output_text(&json!({"output_text": "  hi  "})), "hi");
    }

    #[test]
    fn blank_output_text_falls_through_to_output() {
        let payload = json!({
            "output_text": "   ",
            "output": [{"content": "from output"}]
        });
        assert_eq!(extract_output_text(&payload), "from output");
    }

    #[test]
    fn output_items_keep_only_text_parts() {
        let payload = json!({"output": [{"content": [
            {"type": "output_text", "text": "a"},
            {"type": "other", "text": "b"}
        ]}]});
        assert_eq!(extract_output_text(&payload), "a");
    }

    #[test]
    fn output_items_join_with_newlines() {
        let payload = json!({"output": [
            {"type": "reasoning", "summary": []},
            {"content": [{"type": "text", "text": "one"}]},
            {"content": "two"},
            "garbage"
        ]});
        assert_eq!(extract_output_text(&payload), "one\ntwo");
    }

    #[test]
    fn unknown_shapes_yield_empty() {
        assert_eq!(extract_output_text(&json!({})), "");
        assert_eq!(extract_output_text(&json!(null)), "");
        assert_eq!(extract_output_text(&json!([1, 2, 3])), "");
        assert_eq!(extract_output_text(&json!({"choices": "nope"})), "");
    }
}
