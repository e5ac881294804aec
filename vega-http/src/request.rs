//! Building the outbound request body.

use crate::types::{ChatMessage, ToolSpec};

/// Fixed per spec §6: every outbound request asks for at most 4096
/// output tokens regardless of agent configuration.
pub const MAX_TOKENS: u32 = 4096;

/// Anthropic API version header value this seam speaks.
pub const API_VERSION: &str = "2023-06-01";

/// Default per-request timeout (spec §5: "default 60 s").
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Build the JSON body for a `/v1/messages`-shaped request.
#[must_use]
pub fn build_request_body(
    model: &str,
    system: &str,
    temperature: f64,
    messages: &[ChatMessage],
    tools: &[ToolSpec],
) -> serde_json::Value {
    let mut body = serde_json::json!({
        "model": model,
        "max_tokens": MAX_TOKENS,
        "temperature": temperature,
        "system": system,
        "messages": messages,
    });
    if !tools.is_empty() {
        body["tools"] = serde_json::to_value(tools).unwrap_or(serde_json::Value::Null);
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn includes_required_fields() {
        let body = build_request_body("claude-3-5-sonnet", "you are helpful", 0.7, &[], &[]);
        assert_eq!(body["model"], "claude-3-5-sonnet");
        assert_eq!(body["max_tokens"], 4096);
        assert_eq!(body["system"], "you are helpful");
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn omits_tools_when_empty_and_includes_when_present() {
        let tool = ToolSpec {
            name: "search".into(),
            description: Some("search the web".into()),
            input_schema: serde_json::json!({"type": "object"}),
        };
        let body = build_request_body("m", "s", 0.0, &[], std::slice::from_ref(&tool));
        let tools = body["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0]["name"], "search");
    }

    #[test]
    fn messages_are_serialized_in_order() {
        let msgs = vec![ChatMessage::user_text("hi"), ChatMessage::assistant_text("hello")];
        let body = build_request_body("m", "s", 0.5, &msgs, &[]);
        let arr = body["messages"].as_array().unwrap();
        assert_eq!(arr.len(), 2);
        assert_eq!(arr[0]["role"], "user");
        assert_eq!(arr[1]["role"], "assistant");
    }
}
