//! An agent's async state machine (Design Notes §9: `Idle` and
//! `Awaiting(HttpRequest, optional tool context)`).

use vega_http::AsyncRequest;

/// Context carried across a tool-use round trip: the raw assistant
/// content block to replay, the tool_use id it answers, and how many
/// tool-use iterations have elapsed so far.
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// The raw `content` array from the response that requested the tool.
    pub assistant_content: serde_json::Value,
    /// The tool_use block's id, echoed back in the tool-result turn.
    pub tool_use_id: String,
    /// Number of tool-use round trips completed so far this send.
    pub iteration: u32,
    /// The tool's stringified result, carried alongside the rest of the
    /// context so a retried follow-up request can be rebuilt identically.
    pub result_text: String,
}

/// An agent's async state: idle, waiting on an in-flight request
/// (optionally mid tool-use loop), or waiting out a backoff delay before
/// retrying a retriable failure.
pub enum AsyncState {
    /// No send in flight.
    Idle,
    /// A request is in flight on its own thread.
    Awaiting {
        /// The in-flight request handle.
        request: AsyncRequest,
        /// Set when this request is a tool-result follow-up.
        tool_ctx: Option<ToolContext>,
    },
    /// A retriable failure was classified; waiting for `not_before` before
    /// relaunching.
    RetryScheduled {
        /// Carried-over tool context, if the failed request was itself a
        /// tool-use follow-up.
        tool_ctx: Option<ToolContext>,
        /// Earliest ms timestamp at which the retry may be launched.
        not_before: u64,
    },
}

impl std::fmt::Debug for AsyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AsyncState::Idle => write!(f, "Idle"),
            AsyncState::Awaiting { tool_ctx, .. } => {
                write!(f, "Awaiting {{ tool_ctx: {tool_ctx:?} }}")
            }
            AsyncState::RetryScheduled { tool_ctx, not_before } => {
                write!(f, "RetryScheduled {{ tool_ctx: {tool_ctx:?}, not_before: {not_before} }}")
            }
        }
    }
}
