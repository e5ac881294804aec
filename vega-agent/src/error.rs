//! Agent-manager-level errors.
//!
//! These cover structural faults — an unknown agent name, a corrupt
//! image, a process-table limit — not an individual send's HTTP outcome.
//! A failed send (fatal HTTP status, exhausted retries, exceeded budget,
//! an unknown tool, too many tool-use iterations) is never a Rust `Err`:
//! it resolves to [`crate::manager::SendOutcome::Done`] carrying an
//! `Error: ...`-prefixed string, exactly as the agent itself would report
//! a failure to the program that sent it.

use thiserror::Error;

/// Errors that prevent the agent manager from even starting or resuming
/// a send.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum AgentError {
    /// No static agent definition in the image resolves to this name.
    #[error("unknown agent '{0}'")]
    UnknownAgent(String),

    /// An `AgentId` does not index into this manager's arena.
    #[error("invalid agent id #{0}")]
    InvalidAgentId(u32),

    /// The image is malformed in a way that only surfaces when resolving
    /// an agent's name/model/system/tool constants.
    #[error(transparent)]
    Image(#[from] vega_bytecode::ImageError),

    /// Linking a supervised agent to its owning process hit a process
    /// table limit (too many children on the parent).
    #[error(transparent)]
    Process(#[from] vega_process::ProcessLimitError),
}
