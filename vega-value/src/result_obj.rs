//! Boxed `Ok`/`Err` payload backing the `RESULT_*` opcode family.

use crate::heap::{self, HeapKind};
use crate::value::Value;
use std::rc::Rc;

/// Heap-allocated `Ok`/`Err` wrapper produced by `RESULT_OK`/`RESULT_ERR`.
#[derive(Debug)]
pub struct ResultObj {
    ok: bool,
    inner: Value,
}

impl ResultObj {
    /// Wrap `value` as an `Ok` result.
    #[must_use]
    pub fn ok(value: Value) -> Rc<Self> {
        heap::inc(HeapKind::Result);
        Rc::new(Self { ok: true, inner: value })
    }

    /// Wrap `value` as an `Err` result.
    #[must_use]
    pub fn err(value: Value) -> Rc<Self> {
        heap::inc(HeapKind::Result);
        Rc::new(Self { ok: false, inner: value })
    }

    /// Whether this is the `Ok` variant (`RESULT_IS_OK`).
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.ok
    }

    /// Unwrap the inner value regardless of variant (`RESULT_UNWRAP`).
    ///
    /// The spec does not distinguish unwrapping `Ok` from `Err` at the
    /// opcode level — both simply expose the inner value to the caller,
    /// which is responsible for checking `RESULT_IS_OK` first if it cares.
    #[must_use]
    pub fn unwrap(&self) -> Value {
        self.inner.clone()
    }
}

impl Drop for ResultObj {
    fn drop(&mut self) {
        heap::dec(HeapKind::Result);
    }
}
