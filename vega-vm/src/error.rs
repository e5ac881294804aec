//! Runtime (not image-load-time) faults raised while executing bytecode.
//!
//! These are the interpreter's own invariant violations — a stack
//! underflow, an out-of-range function index, a caller/callee arity
//! mismatch — as opposed to [`vega_bytecode::ImageError`], which covers a
//! malformed `.vgb` file before a single instruction ever runs. Every
//! variant here is fatal to the process that triggered it: the VM exits
//! that process with an `Error` status rather than panicking, mirroring
//! how a failed agent send resolves to a `SendOutcome::Done` string
//! rather than propagating as a Rust `Err`.

use thiserror::Error;

/// Errors that halt the process currently executing.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum VmError {
    /// An opcode needed a value on the stack but found none.
    #[error("stack underflow")]
    StackUnderflow,

    /// `CALL`/`LOAD_GLOBAL` referenced a function index past the end of
    /// the function table.
    #[error("invalid function index {0}")]
    InvalidFunctionIndex(u32),

    /// `CALL` popped a callee that was not a `Value::Function`.
    #[error("value of type {0} is not callable")]
    NotCallable(&'static str),

    /// `CALL`'s argument count did not match the callee's declared
    /// parameter count.
    #[error("arity mismatch: function expects {expected} arguments, found {found}")]
    ArityMismatch {
        /// The callee's declared parameter count.
        expected: u16,
        /// The number of arguments actually supplied.
        found: u16,
    },

    /// `STORE_GLOBAL` would have created more than 256 distinct globals.
    #[error("too many globals (limit 256)")]
    TooManyGlobals,

    /// `AWAIT` popped a value that was not a `Value::Future`.
    #[error("value of type {0} is not awaitable")]
    NotAwaitable(&'static str),

    /// `SEND_MSG`/`SEND_ASYNC`/`LINK`/`MONITOR` popped a value that was
    /// not a `Value::Agent`.
    #[error("value of type {0} is not an agent")]
    NotAnAgent(&'static str),

    /// A local slot index was out of range for the current frame.
    #[error("invalid local slot {0}")]
    InvalidLocal(u8),

    /// The bytecode image itself was malformed in a way that only
    /// surfaces at execution time (an out-of-range constant index, a bad
    /// opcode byte reached by a corrupt jump).
    #[error(transparent)]
    Image(#[from] vega_bytecode::ImageError),

    /// A process-level resource limit (stack depth, child count) was hit.
    #[error(transparent)]
    Process(#[from] vega_process::ProcessLimitError),

    /// The agent manager reported a structural fault (unknown agent,
    /// invalid id, process-table limit).
    #[error(transparent)]
    Agent(#[from] vega_agent::AgentError),

    /// `LOAD_GLOBAL`/`STORE_GLOBAL` fallback found neither a bound global
    /// nor a function of that name.
    #[error("unknown global '{0}'")]
    UnknownGlobal(String),

    /// `CALL_NATIVE` named a function outside the fixed native set.
    #[error("unknown native function '{0}'")]
    UnknownNative(String),

    /// `AWAIT` popped a `Future` id this VM's agent manager never allocated.
    #[error("unknown future #{0}")]
    UnknownFuture(u32),

    /// A heap operation (array index, string index) violated a value
    /// invariant.
    #[error(transparent)]
    Value(#[from] vega_value::ValueError),
}
