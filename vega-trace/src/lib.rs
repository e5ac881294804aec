//! The Vega runtime's publish/subscribe trace bus.
//!
//! Every interpreter step that the spec calls out as observable — agent
//! lifecycle, message send/receive, tool calls, HTTP start/done, errors,
//! prints — is published as a [`TraceEvent`] to any subscribers
//! registered on a [`TraceBus`]. Publishing never blocks on subscriber
//! work beyond running the callback, and never short-circuits: every
//! subscriber observes every event, unlike a hook pipeline that can halt.

#![deny(missing_docs)]

mod bus;
mod event;

pub use bus::{SubscriberToken, TraceBus};
pub use event::{EventKind, TokenUsage, TraceEvent};
