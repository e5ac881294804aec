//! Live heap object counters, kept for `vega-cli --debug` memory reporting.
//!
//! The original runtime carries an explicit refcount/kind/flags header on
//! every heap object (see the data model section of the spec this crate
//! implements). In Rust, `Rc` already gives us that refcounting; what we
//! still want for debug output is a running count of live objects per
//! kind, so each heap payload type decrements a thread-local counter on
//! `Drop` rather than the runtime hand-rolling retain/release.

use std::cell::Cell;

/// Heap object kind, matching the `kind tag` byte of the original header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeapKind {
    /// A `String` payload.
    String,
    /// An `Array` payload.
    Array,
    /// A `ResultObj` payload.
    Result,
}

/// Snapshot of live heap object counts by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapStats {
    /// Live `String` heap objects.
    pub strings_live: u64,
    /// Live `Array` heap objects.
    pub arrays_live: u64,
    /// Live `Result` heap objects.
    pub results_live: u64,
}

thread_local! {
    static STRINGS: Cell<u64> = const { Cell::new(0) };
    static ARRAYS: Cell<u64> = const { Cell::new(0) };
    static RESULTS: Cell<u64> = const { Cell::new(0) };
}

pub(crate) fn inc(kind: HeapKind) {
    let cell = match kind {
        HeapKind::String => &STRINGS,
        HeapKind::Array => &ARRAYS,
        HeapKind::Result => &RESULTS,
    };
    cell.with(|c| c.set(c.get() + 1));
}

pub(crate) fn dec(kind: HeapKind) {
    let cell = match kind {
        HeapKind::String => &STRINGS,
        HeapKind::Array => &ARRAYS,
        HeapKind::Result => &RESULTS,
    };
    cell.with(|c| c.set(c.get().saturating_sub(1)));
}

/// Snapshot the current live heap object counts.
///
/// Intended for `vega-cli --debug`'s post-run memory summary. Counts are
/// per-thread; since the interpreter is single-threaded this is exactly
/// the whole-runtime count.
#[must_use]
pub fn stats() -> HeapStats {
    HeapStats {
        strings_live: STRINGS.with(Cell::get),
        arrays_live: ARRAYS.with(Cell::get),
        results_live: RESULTS.with(Cell::get),
    }
}
