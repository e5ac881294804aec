//! Wire types for the outbound model API (treated as opaque/Anthropic-shaped
//! per spec §6: `model, max_tokens=4096, temperature, system, messages[],
//! tools[]?`, parsed response `usage.{input_tokens, output_tokens,
//! cache_read_input_tokens, cache_creation_input_tokens}`, a text block's
//! `text`, and a `tool_use` block's `id`/`name`/`input`).

use serde::Serialize;

/// One turn in an agent's conversation history.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    /// `"user"` or `"assistant"`.
    pub role: String,
    /// Raw content for this turn. For a user/tool-result turn this is
    /// typically a plain string; for an assistant turn that included a
    /// tool call, this is the raw content block array the API returned,
    /// preserved verbatim for the follow-up request (§4.4.4).
    pub content: serde_json::Value,
}

impl ChatMessage {
    /// A plain-text user message.
    #[must_use]
    pub fn user_text(text: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: serde_json::Value::String(text.into()) }
    }

    /// A plain-text assistant message (recorded once a terminal response
    /// is appended to history).
    #[must_use]
    pub fn assistant_text(text: impl Into<String>) -> Self {
        Self { role: "assistant".to_string(), content: serde_json::Value::String(text.into()) }
    }

    /// The prior assistant turn's raw content blocks, carried forward
    /// verbatim into the follow-up request after a tool call.
    #[must_use]
    pub fn assistant_raw(content: serde_json::Value) -> Self {
        Self { role: "assistant".to_string(), content }
    }

    /// A tool-result turn: the canonical endpoint variant that includes
    /// the tool_use_id and result text, per the resolved Open Question
    /// on which tool-result shape is authoritative.
    #[must_use]
    pub fn tool_result(tool_use_id: &str, result_text: &str) -> Self {
        Self {
            role: "user".to_string(),
            content: serde_json::json!([{
                "type": "tool_result",
                "tool_use_id": tool_use_id,
                "content": result_text,
            }]),
        }
    }
}

/// A declared tool, as surfaced to the model.
#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
    /// Tool name (matches `<AgentName>$<tool>` with the agent prefix stripped).
    pub name: String,
    /// Human-readable description, if the front end supplied one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON schema for the tool's input object.
    pub input_schema: serde_json::Value,
}

/// A parsed content block from a model response.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiContentBlock {
    /// Plain assistant text.
    Text(String),
    /// A tool invocation request.
    ToolUse {
        /// Opaque id correlating this call with its eventual tool_result.
        id: String,
        /// Tool name.
        name: String,
        /// Arguments, as a raw JSON object.
        input: serde_json::Value,
    },
}

/// Token usage reported on a response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApiUsage {
    /// Input (prompt) tokens.
    pub input_tokens: u64,
    /// Output (completion) tokens.
    pub output_tokens: u64,
    /// Tokens served from the prompt cache, if the provider reports it.
    pub cache_read_input_tokens: u64,
    /// Tokens written to the prompt cache, if the provider reports it.
    pub cache_creation_input_tokens: u64,
}

/// A fully parsed model response.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    /// Content blocks, in order.
    pub content: Vec<ApiContentBlock>,
    /// Token usage for this response.
    pub usage: ApiUsage,
    /// The raw `content` JSON array, preserved so a follow-up tool-result
    /// request can carry the assistant turn forward verbatim.
    pub raw_content: serde_json::Value,
}

impl ApiResponse {
    /// The first tool-use block in this response, if any (a response
    /// never carries more than one per spec §4.4).
    #[must_use]
    pub fn tool_use(&self) -> Option<(&str, &str, &serde_json::Value)> {
        self.content.iter().find_map(|b| match b {
            ApiContentBlock::ToolUse { id, name, input } => Some((id.as_str(), name.as_str(), input)),
            ApiContentBlock::Text(_) => None,
        })
    }

    /// Concatenated text from every text block, the assistant's final
    /// reply on a terminal response.
    #[must_use]
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|b| match b {
                ApiContentBlock::Text(t) => Some(t.as_str()),
                ApiContentBlock::ToolUse { .. } => None,
            })
            .collect()
    }
}
