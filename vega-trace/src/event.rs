//! Trace event vocabulary.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The kind of thing a [`TraceEvent`] reports.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// An agent was created.
    AgentSpawn,
    /// An agent's process table entry was released.
    AgentFree,
    /// A synchronous or async request was sent to an agent.
    MessageSent,
    /// A response was received for a sent message.
    MessageReceived,
    /// The tool-use sub-loop invoked a local function.
    ToolCall,
    /// A tool call returned a result.
    ToolResult,
    /// An HTTP request to the model endpoint began.
    HttpStart,
    /// An HTTP request to the model endpoint completed.
    HttpDone,
    /// A runtime or agent-level error occurred.
    Error,
    /// The `PRINT` opcode executed.
    Print,
}

/// Token usage reported on a completed model response.
///
/// Mirrors the triple the budget accountant tracks: input tokens, output
/// tokens, and the dollar cost those tokens were billed at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Input (prompt) tokens billed for this response.
    pub input_tokens: u64,
    /// Output (completion) tokens billed for this response.
    pub output_tokens: u64,
    /// Dollar cost of this response at the model's per-token pricing.
    pub cost: Decimal,
}

/// One observation published on the trace bus.
///
/// Every field but `kind` and `timestamp_ms` is optional: a `Print` event
/// carries `data` but no agent id; an `HttpStart` event carries an agent
/// id but no token usage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEvent {
    /// What kind of event this is.
    pub kind: EventKind,
    /// Milliseconds since the runtime started.
    pub timestamp_ms: u64,
    /// The agent this event concerns, if any.
    pub agent_id: Option<u32>,
    /// The agent's human-readable name, if known.
    pub agent_name: Option<String>,
    /// Free-form payload (message text, tool arguments, error message, ...).
    pub data: Option<serde_json::Value>,
    /// Token usage, present on `MessageReceived`/`HttpDone` events for
    /// completed model responses.
    pub usage: Option<TokenUsage>,
    /// Wall-clock duration of the operation this event reports, in
    /// milliseconds (present on `HttpDone`, `ToolCall`/`ToolResult` pairs).
    pub duration_ms: Option<u64>,
}

impl TraceEvent {
    /// Construct a bare event carrying only its kind and timestamp.
    #[must_use]
    pub fn new(kind: EventKind, timestamp_ms: u64) -> Self {
        Self {
            kind,
            timestamp_ms,
            agent_id: None,
            agent_name: None,
            data: None,
            usage: None,
            duration_ms: None,
        }
    }

    /// Attach an agent id.
    #[must_use]
    pub fn with_agent(mut self, agent_id: u32, agent_name: Option<String>) -> Self {
        self.agent_id = Some(agent_id);
        self.agent_name = agent_name;
        self
    }

    /// Attach a data payload.
    #[must_use]
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Attach token usage.
    #[must_use]
    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Attach a duration.
    #[must_use]
    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_methods_compose() {
        let ev = TraceEvent::new(EventKind::MessageSent, 42)
            .with_agent(1, Some("Researcher".to_string()))
            .with_data(serde_json::json!({"text": "hello"}));
        assert_eq!(ev.agent_id, Some(1));
        assert_eq!(ev.agent_name.as_deref(), Some("Researcher"));
        assert!(ev.usage.is_none());
    }

    #[test]
    fn serializes_as_tagged_json() {
        let ev = TraceEvent::new(EventKind::Print, 0).with_data(serde_json::json!("hi"));
        let json = serde_json::to_string(&ev).unwrap();
        assert!(json.contains("\"print\""));
    }
}
