use vega_http::{build_request_body, classify_status, parse_response, ChatMessage, FailureKind, ToolSpec};

#[test]
fn builds_and_parses_a_tool_call_round_trip() {
    let tool = ToolSpec {
        name: "search".into(),
        description: Some("search the web".into()),
        input_schema: serde_json::json!({"type": "object", "properties": {"query": {"type": "string"}}}),
    };
    let messages = vec![ChatMessage::user_text("find the rust book")];
    let request = build_request_body("claude-3-5-sonnet", "you are a researcher", 0.3, &messages, &[tool]);
    assert_eq!(request["model"], "claude-3-5-sonnet");
    assert_eq!(request["tools"].as_array().unwrap().len(), 1);

    let response_body = serde_json::json!({
        "content": [{"type": "tool_use", "id": "toolu_abc", "name": "search", "input": {"query": "rust book"}}],
        "usage": {"input_tokens": 42, "output_tokens": 18},
    });
    let parsed = parse_response(&response_body).unwrap();
    let (id, name, input) = parsed.tool_use().unwrap();
    assert_eq!(id, "toolu_abc");
    assert_eq!(name, "search");
    assert_eq!(input["query"], "rust book");
    assert_eq!(classify_status(200, ""), FailureKind::None);
}

#[test]
#[ignore] // Requires ANTHROPIC_API_KEY and a live network call.
fn real_request_against_anthropic() {
    let api_key = std::env::var("ANTHROPIC_API_KEY").expect("ANTHROPIC_API_KEY not set");
    let client = reqwest::blocking::Client::new();
    let body = build_request_body(
        "claude-3-5-haiku-20241022",
        "Be very concise.",
        0.0,
        &[ChatMessage::user_text("Say hello in exactly 3 words.")],
        &[],
    );
    let response = client
        .post("https://api.anthropic.com/v1/messages")
        .header("x-api-key", api_key)
        .header("anthropic-version", vega_http::API_VERSION)
        .json(&body)
        .send()
        .unwrap();
    assert_eq!(classify_status(response.status().as_u16(), ""), FailureKind::None);
    let json: serde_json::Value = response.json().unwrap();
    let parsed = parse_response(&json).unwrap();
    assert!(!parsed.text().is_empty());
}
