//! Parsing the inbound response body.

use crate::error::HttpError;
use crate::types::{ApiContentBlock, ApiResponse, ApiUsage};

/// Parse a `/v1/messages`-shaped response body into an [`ApiResponse`].
///
/// # Errors
///
/// Returns [`HttpError::Malformed`] if `content` is missing or a block
/// has an unrecognized or malformed shape.
pub fn parse_response(body: &serde_json::Value) -> Result<ApiResponse, HttpError> {
    let raw_content = body["content"].clone();
    let blocks = raw_content
        .as_array()
        .ok_or_else(|| HttpError::Malformed("missing 'content' array in response".to_string()))?;

    let mut content = Vec::with_capacity(blocks.len());
    for block in blocks {
        content.push(parse_block(block)?);
    }

    let usage = parse_usage(&body["usage"]);

    Ok(ApiResponse { content, usage, raw_content })
}

fn parse_block(block: &serde_json::Value) -> Result<ApiContentBlock, HttpError> {
    match block["type"].as_str() {
        Some("text") => {
            let text = block["text"]
                .as_str()
                .ok_or_else(|| HttpError::Malformed("text block missing 'text'".to_string()))?
                .to_string();
            Ok(ApiContentBlock::Text(text))
        }
        Some("tool_use") => {
            let id = block["id"]
                .as_str()
                .ok_or_else(|| HttpError::Malformed("tool_use block missing 'id'".to_string()))?
                .to_string();
            let name = block["name"]
                .as_str()
                .ok_or_else(|| HttpError::Malformed("tool_use block missing 'name'".to_string()))?
                .to_string();
            let input = block["input"].clone();
            Ok(ApiContentBlock::ToolUse { id, name, input })
        }
        Some(other) => Err(HttpError::Malformed(format!("unknown content block type: {other}"))),
        None => Err(HttpError::Malformed("content block missing 'type'".to_string())),
    }
}

fn parse_usage(usage: &serde_json::Value) -> ApiUsage {
    ApiUsage {
        input_tokens: usage["input_tokens"].as_u64().unwrap_or(0),
        output_tokens: usage["output_tokens"].as_u64().unwrap_or(0),
        cache_read_input_tokens: usage["cache_read_input_tokens"].as_u64().unwrap_or(0),
        cache_creation_input_tokens: usage["cache_creation_input_tokens"].as_u64().unwrap_or(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_text_response() {
        let body = serde_json::json!({
            "content": [{"type": "text", "text": "hello there"}],
            "usage": {"input_tokens": 10, "output_tokens": 5},
        });
        let parsed = parse_response(&body).unwrap();
        assert_eq!(parsed.text(), "hello there");
        assert_eq!(parsed.usage.input_tokens, 10);
        assert!(parsed.tool_use().is_none());
    }

    #[test]
    fn parses_tool_use_response() {
        let body = serde_json::json!({
            "content": [{"type": "tool_use", "id": "toolu_1", "name": "search", "input": {"q": "rust"}}],
            "usage": {"input_tokens": 20, "output_tokens": 8},
        });
        let parsed = parse_response(&body).unwrap();
        let (id, name, input) = parsed.tool_use().unwrap();
        assert_eq!(id, "toolu_1");
        assert_eq!(name, "search");
        assert_eq!(input["q"], "rust");
    }

    #[test]
    fn cache_fields_parsed_when_present() {
        let body = serde_json::json!({
            "content": [{"type": "text", "text": "hi"}],
            "usage": {
                "input_tokens": 5, "output_tokens": 2,
                "cache_read_input_tokens": 100, "cache_creation_input_tokens": 50,
            },
        });
        let parsed = parse_response(&body).unwrap();
        assert_eq!(parsed.usage.cache_read_input_tokens, 100);
        assert_eq!(parsed.usage.cache_creation_input_tokens, 50);
    }

    #[test]
    fn missing_content_is_malformed() {
        let body = serde_json::json!({"usage": {}});
        assert!(matches!(parse_response(&body), Err(HttpError::Malformed(_))));
    }

    #[test]
    fn unknown_block_type_is_malformed() {
        let body = serde_json::json!({"content": [{"type": "something_new"}], "usage": {}});
        assert!(matches!(parse_response(&body), Err(HttpError::Malformed(_))));
    }
}
