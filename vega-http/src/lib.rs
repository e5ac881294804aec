//! The outbound HTTP seam: request body construction, response parsing,
//! retry classification, and the thread-backed async request handle.
//!
//! The interpreter is cooperative and single-threaded; it never blocks on
//! network I/O. Each `SEND_MSG`/`SEND_ASYNC` starts an [`AsyncRequest`] on
//! its own OS thread and polls it once per VM step.

#![deny(missing_docs)]

mod async_request;
mod error;
mod request;
mod response;
mod types;

pub use async_request::{AsyncRequest, RequestOutcome};
pub use error::{classify_status, FailureKind, HttpError};
pub use request::{build_request_body, API_VERSION, DEFAULT_TIMEOUT_SECS, MAX_TOKENS};
pub use response::parse_response;
pub use types::{ApiContentBlock, ApiResponse, ApiUsage, ChatMessage, ToolSpec};
