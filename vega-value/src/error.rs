//! Errors raised by value-model operations (indexing, type coercions).

use thiserror::Error;

/// Errors produced while operating on [`crate::Value`]s directly (not yet
/// wrapped as a VM-level fault — `vega-vm` maps these into `VmError`).
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValueError {
    /// Array index was not within `0..len`.
    #[error("index {index} out of bounds (len {len})")]
    IndexOutOfBounds {
        /// The index that was requested.
        index: usize,
        /// The array's length at the time of the request.
        len: usize,
    },

    /// An operation expected one type but received another.
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        /// The type name the operation required.
        expected: &'static str,
        /// The type name actually present.
        found: &'static str,
    },
}
