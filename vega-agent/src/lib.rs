//! Agent instances, tool discovery, the pending-future table, and the
//! manager that drives a send through HTTP, tool-use rounds, and
//! retry/backoff/circuit-breaker policy.

#![deny(missing_docs)]

mod agent;
mod async_state;
mod error;
mod futures;
mod manager;
mod tool;

pub use agent::{Agent, Role, Turn};
pub use async_state::{AsyncState, ToolContext};
pub use error::AgentError;
pub use futures::{FutureRecord, FutureState, FutureTable};
pub use manager::{AgentManager, SendOutcome, DEFAULT_BASE_URL};
pub use tool::{decode_tool_args, discover_tools, AgentTool, ParamType};
