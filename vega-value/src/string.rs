//! Immutable, length-prefixed string payload.

use crate::heap::{self, HeapKind};
use std::rc::Rc;

/// Heap-allocated string payload. Immutable once constructed; identity is
/// byte-for-byte equality of the payload, matching the spec's String
/// definition.
#[derive(Debug)]
pub struct VString {
    bytes: Box<str>,
    interned: bool,
}

impl VString {
    /// Allocate a new string payload wrapped for shared ownership.
    #[must_use]
    pub fn new(s: impl Into<Box<str>>) -> Rc<Self> {
        heap::inc(HeapKind::String);
        Rc::new(Self {
            bytes: s.into(),
            interned: false,
        })
    }

    /// Allocate an interned string payload. Interned strings are never
    /// distinguished from ordinary ones for freeing purposes under Rust's
    /// ownership model (the last `Rc` drop always frees); the flag exists
    /// so constant-pool strings loaded once per image can be recognized as
    /// such in trace/debug output.
    #[must_use]
    pub fn new_interned(s: impl Into<Box<str>>) -> Rc<Self> {
        heap::inc(HeapKind::String);
        Rc::new(Self {
            bytes: s.into(),
            interned: true,
        })
    }

    /// Borrow the payload as a `&str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.bytes
    }

    /// Byte length of the payload.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Whether this string was constructed via [`VString::new_interned`].
    #[must_use]
    pub fn is_interned(&self) -> bool {
        self.interned
    }
}

impl Drop for VString {
    fn drop(&mut self) {
        heap::dec(HeapKind::String);
    }
}

impl PartialEq for VString {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for VString {}

impl std::fmt::Display for VString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.bytes)
    }
}
