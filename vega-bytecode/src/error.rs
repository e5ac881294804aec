//! Image-load-time errors. Fatal to the program per the spec's error
//! taxonomy — there is no recovery, the CLI reports and exits.

use thiserror::Error;

/// Magic number every `.vgb` image must start with (`b"VEGA"` as little-endian u32).
pub const MAGIC: u32 = 0x5645_4741;

/// The only bytecode version this loader understands.
pub const VERSION: u16 = 1;

/// Errors raised while loading a `.vgb` image.
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ImageError {
    /// The header's magic number did not match [`MAGIC`].
    #[error("bad image: magic {found:#010x} does not match expected {MAGIC:#010x}")]
    BadMagic {
        /// The magic value actually read.
        found: u32,
    },

    /// The header's version field is not one this loader supports.
    #[error("bad image: unsupported version {found} (expected {VERSION})")]
    BadVersion {
        /// The version value actually read.
        found: u16,
    },

    /// A section ended before its declared length was consumed.
    #[error("truncated image: {0}")]
    Truncated(&'static str),

    /// A section's bytes were structurally invalid (bad tag, bad offset).
    #[error("malformed image: {0}")]
    Malformed(String),
}
