//! # vega-vm — the bytecode interpreter
//!
//! [`Vm`] is the stack-based interpreter at the top of the runtime's
//! dependency graph (spec §4.2): it owns opcode dispatch, the per-step
//! value/frame registers it swaps in and out of whichever [`vega_process::Process`]
//! the scheduler hands it, the native function dispatch table
//! ([`native`]), and the glue that lets an agent's send/await/tool-use
//! cycle (`vega-agent`) ride on top of [`vega_scheduler::Scheduler`]'s
//! cooperative run loop.
//!
//! `Vm` implements [`vega_scheduler::ProcessRunner`]; it is never driven
//! directly except by `vega-cli`, which owns the real wall clock and the
//! top-level `Scheduler`/`ProcessTable` pair.

#![deny(missing_docs)]

mod error;
mod native;
mod vm;

pub use error::VmError;
pub use vm::{StepOutcome, Suspend, Vm};
