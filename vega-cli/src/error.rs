//! The `vega` binary's top-level error type. Every variant maps to a
//! distinct "exit 1" path named in spec §6/§7: a bad `.vgb` header, a
//! halting interpreter fault, or a CLI usage mistake.

use thiserror::Error;

/// Anything that can make the `vega` binary exit non-zero.
#[derive(Debug, Error)]
pub enum CliError {
    /// A flag was malformed, missing its value, or unrecognized.
    #[error("{0}")]
    Usage(String),

    /// Reading the `.vgb` file (or a `$HOME/.vega` config line) failed.
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// The bytecode image itself was malformed (spec §7 "Image errors" —
    /// bad magic, version mismatch, truncated section). No recovery.
    #[error("bad image: {0}")]
    Image(#[from] vega_bytecode::ImageError),

    /// An interpreter invariant was violated while running the entry
    /// process (spec §7 "VM errors"): reported as `Runtime error: <msg>`.
    #[error("{0}")]
    Runtime(String),
}
