//! The `.vgb` bytecode image format: header, function table, static agent
//! table, constant pool, code section, and the instruction encoding used
//! within the code section.
//!
//! Loading is pure and total: every malformed input maps to an
//! [`ImageError`] rather than a panic.

#![deny(missing_docs)]

mod agentdef;
mod assembler;
mod constpool;
mod error;
mod function;
mod image;
pub mod opcode;

pub use agentdef::AgentDef;
pub use assembler::{FunctionBuilder, ImageBuilder};
pub use constpool::{Const, ConstPool};
pub use error::{ImageError, MAGIC, VERSION};
pub use function::FunctionDef;
pub use image::{Image, ImageDebugSummary};
pub use opcode::Op;
