//! # vega-process — the process table and supervisor trees for Vega
//!
//! A [`Process`](process::Process) is an independently scheduled, private
//! stack-owning unit of execution, modeled after an Erlang process: it
//! can spawn children, be supervised, and exit normally, in error, or by
//! being killed. [`supervisor::handle_exit`] implements spec §4.6's exit
//! propagation and restart-strategy dispatch; [`circuit_breaker`] and
//! [`backoff`] implement the failure-handling machinery a supervisor's
//! [`supervision::SupervisionConfig`] is built from.
//!
//! This crate owns bookkeeping only. Actually re-running a restarted
//! process's agent entry point, and driving the scheduling loop itself,
//! belong to `vega-scheduler` and `vega-vm`.

#![deny(missing_docs)]

mod backoff;
mod circuit_breaker;
mod pid;
mod process;
mod supervision;
mod supervisor;
mod table;

pub use backoff::{backoff_delay, BackoffKind};
pub use circuit_breaker::{CircuitBreaker, CircuitState};
pub use pid::Pid;
pub use process::{CallFrame, ExitReason, ExitStatus, Process, ProcessLimitError, ProcessState};
pub use process::{MAX_CHILDREN, MAX_FRAME_STACK, MAX_VALUE_STACK};
pub use supervision::{Strategy, SupervisionConfig};
pub use supervisor::{handle_exit, SupervisorAction};
pub use table::ProcessTable;
