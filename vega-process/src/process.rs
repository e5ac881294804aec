//! The per-process execution record (spec §3).

use vega_value::{AgentId, Value};

use crate::pid::Pid;
use crate::supervision::SupervisionConfig;

/// Private value stack depth limit.
pub const MAX_VALUE_STACK: usize = 256;
/// Call frame stack depth limit.
pub const MAX_FRAME_STACK: usize = 32;
/// Maximum number of directly supervised children.
pub const MAX_CHILDREN: usize = 64;

/// Scheduling state of a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    /// Runnable, waiting for a scheduler slot.
    Ready,
    /// Currently executing on the interpreter.
    Running,
    /// Blocked on a message, a future, or a child exit.
    Waiting,
    /// Terminated; [`Process::exit_status`] is set.
    Exited,
}

/// Why a process terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// Completed without error.
    Normal,
    /// Terminated by an unrecoverable runtime error.
    Error,
    /// Terminated by its supervisor (directly, or cascading from a
    /// sibling's `RestartAll`, or a parent's own exit).
    Killed,
}

/// Terminal status recorded once a process exits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitStatus {
    /// Exit reason.
    pub reason: ExitReason,
    /// Optional human-readable detail (the error message, for `Error`).
    pub message: Option<String>,
}

impl ExitStatus {
    /// A normal exit with no message.
    #[must_use]
    pub fn normal() -> Self {
        Self { reason: ExitReason::Normal, message: None }
    }

    /// An error exit carrying `message`.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self { reason: ExitReason::Error, message: Some(message.into()) }
    }

    /// A supervisor-initiated kill, optionally annotated with why.
    #[must_use]
    pub fn killed(message: impl Into<String>) -> Self {
        Self { reason: ExitReason::Killed, message: Some(message.into()) }
    }
}

/// A single call frame, captured when the scheduler swaps a process off
/// the interpreter and restored when it is swapped back on.
#[derive(Debug, Clone)]
pub struct CallFrame {
    /// Index into the function table.
    pub function_index: u32,
    /// Instruction pointer to resume at on return.
    pub return_ip: usize,
    /// Base offset of this frame's locals within the process's value stack.
    pub base: usize,
}

/// Error returned when a bounded stack or child list would overflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ProcessLimitError {
    /// The value stack is already at [`MAX_VALUE_STACK`].
    #[error("value stack overflow (limit {MAX_VALUE_STACK})")]
    ValueStackOverflow,
    /// The frame stack is already at [`MAX_FRAME_STACK`].
    #[error("frame stack overflow (limit {MAX_FRAME_STACK})")]
    FrameStackOverflow,
    /// The child list is already at [`MAX_CHILDREN`].
    #[error("too many children (limit {MAX_CHILDREN})")]
    TooManyChildren,
}

/// An independently scheduled, supervisable unit of execution. Analogous
/// to an Erlang process: it owns a private value stack and call-frame
/// stack that are swapped in and out of the interpreter by the
/// scheduler, and may supervise children.
#[derive(Debug, Clone)]
pub struct Process {
    pid: Pid,
    state: ProcessState,
    ip: usize,
    value_stack: Vec<Value>,
    frames: Vec<CallFrame>,
    parent: Option<Pid>,
    children: Vec<Pid>,
    supervision: Option<SupervisionConfig>,
    is_supervisor: bool,
    exit_status: Option<ExitStatus>,
    agent: Option<AgentId>,
    waiting_on: Option<Pid>,
}

impl Process {
    /// Construct a freshly spawned, `Ready` process at instruction 0.
    #[must_use]
    pub fn new(pid: Pid, parent: Option<Pid>, agent: Option<AgentId>) -> Self {
        Self {
            pid,
            state: ProcessState::Ready,
            ip: 0,
            value_stack: Vec::new(),
            frames: Vec::new(),
            parent,
            children: Vec::new(),
            supervision: None,
            is_supervisor: false,
            exit_status: None,
            agent,
            waiting_on: None,
        }
    }

    /// This process's pid.
    #[must_use]
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Current scheduling state.
    #[must_use]
    pub fn state(&self) -> ProcessState {
        self.state
    }

    /// Set the scheduling state.
    pub fn set_state(&mut self, state: ProcessState) {
        self.state = state;
    }

    /// Current instruction pointer.
    #[must_use]
    pub fn ip(&self) -> usize {
        self.ip
    }

    /// Set the instruction pointer.
    pub fn set_ip(&mut self, ip: usize) {
        self.ip = ip;
    }

    /// Parent pid, if any.
    #[must_use]
    pub fn parent(&self) -> Option<Pid> {
        self.parent
    }

    /// Direct children, in spawn order.
    #[must_use]
    pub fn children(&self) -> &[Pid] {
        &self.children
    }

    /// Back-reference to the agent this process is running, if any.
    #[must_use]
    pub fn agent(&self) -> Option<AgentId> {
        self.agent
    }

    /// Whether this process supervises its children.
    #[must_use]
    pub fn is_supervisor(&self) -> bool {
        self.is_supervisor
    }

    /// This process's supervision policy, if it is a supervisor.
    #[must_use]
    pub fn supervision(&self) -> Option<&SupervisionConfig> {
        self.supervision.as_ref()
    }

    /// Mutable access to the supervision policy.
    pub fn supervision_mut(&mut self) -> Option<&mut SupervisionConfig> {
        self.supervision.as_mut()
    }

    /// Install a supervision policy and mark this process as a supervisor.
    pub fn make_supervisor(&mut self, config: SupervisionConfig) {
        self.is_supervisor = true;
        self.supervision = Some(config);
    }

    /// Register `child` as a direct child of this process.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessLimitError::TooManyChildren`] if already at
    /// [`MAX_CHILDREN`].
    pub fn add_child(&mut self, child: Pid) -> Result<(), ProcessLimitError> {
        if self.children.len() >= MAX_CHILDREN {
            return Err(ProcessLimitError::TooManyChildren);
        }
        self.children.push(child);
        Ok(())
    }

    /// Remove `child` from the child list (on its exit).
    pub fn remove_child(&mut self, child: Pid) {
        self.children.retain(|&c| c != child);
    }

    /// Push a value onto the private value stack.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessLimitError::ValueStackOverflow`] at
    /// [`MAX_VALUE_STACK`].
    pub fn push_value(&mut self, value: Value) -> Result<(), ProcessLimitError> {
        if self.value_stack.len() >= MAX_VALUE_STACK {
            return Err(ProcessLimitError::ValueStackOverflow);
        }
        self.value_stack.push(value);
        Ok(())
    }

    /// Pop a value off the private value stack.
    pub fn pop_value(&mut self) -> Option<Value> {
        self.value_stack.pop()
    }

    /// The private value stack, for the scheduler to swap into the VM.
    #[must_use]
    pub fn value_stack(&self) -> &[Value] {
        &self.value_stack
    }

    /// Replace the private value stack wholesale (the scheduler swapping
    /// the VM's working stack back in).
    pub fn set_value_stack(&mut self, stack: Vec<Value>) {
        self.value_stack = stack;
    }

    /// Push a call frame.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessLimitError::FrameStackOverflow`] at
    /// [`MAX_FRAME_STACK`].
    pub fn push_frame(&mut self, frame: CallFrame) -> Result<(), ProcessLimitError> {
        if self.frames.len() >= MAX_FRAME_STACK {
            return Err(ProcessLimitError::FrameStackOverflow);
        }
        self.frames.push(frame);
        Ok(())
    }

    /// Pop the innermost call frame.
    pub fn pop_frame(&mut self) -> Option<CallFrame> {
        self.frames.pop()
    }

    /// Current call frames, innermost last.
    #[must_use]
    pub fn frames(&self) -> &[CallFrame] {
        &self.frames
    }

    /// Replace the call frame stack wholesale (the scheduler swapping the
    /// VM's working frames back in, mirroring [`Process::set_value_stack`]).
    pub fn set_frames(&mut self, frames: Vec<CallFrame>) {
        self.frames = frames;
    }

    /// The pid this process is waiting on (a child exit, typically),
    /// if it is blocked for that reason.
    #[must_use]
    pub fn waiting_on(&self) -> Option<Pid> {
        self.waiting_on
    }

    /// Block this process waiting on `pid`.
    pub fn wait_on(&mut self, pid: Pid) {
        self.state = ProcessState::Waiting;
        self.waiting_on = Some(pid);
    }

    /// Exit status, once exited.
    #[must_use]
    pub fn exit_status(&self) -> Option<&ExitStatus> {
        self.exit_status.as_ref()
    }

    /// Mark this process exited with the given status.
    pub fn exit(&mut self, status: ExitStatus) {
        self.state = ProcessState::Exited;
        self.exit_status = Some(status);
    }

    /// Reset a process back to a fresh, `Ready` state at instruction 0
    /// after a supervisor's [`crate::supervisor::SupervisorAction::Restart`]
    /// (spec §4.6: "restart the exited child").
    pub fn revive(&mut self) {
        self.state = ProcessState::Ready;
        self.ip = 0;
        self.value_stack.clear();
        self.frames.clear();
        self.exit_status = None;
        self.waiting_on = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(n: u32) -> Pid {
        Pid::new(n)
    }

    #[test]
    fn fresh_process_is_ready_at_instruction_zero() {
        let p = Process::new(pid(1), None, None);
        assert_eq!(p.state(), ProcessState::Ready);
        assert_eq!(p.ip(), 0);
        assert!(p.parent().is_none());
        assert!(p.children().is_empty());
    }

    #[test]
    fn value_stack_respects_capacity() {
        let mut p = Process::new(pid(1), None, None);
        for _ in 0..MAX_VALUE_STACK {
            p.push_value(Value::Null).unwrap();
        }
        assert!(matches!(p.push_value(Value::Null), Err(ProcessLimitError::ValueStackOverflow)));
    }

    #[test]
    fn frame_stack_respects_capacity() {
        let mut p = Process::new(pid(1), None, None);
        for _ in 0..MAX_FRAME_STACK {
            p.push_frame(CallFrame { function_index: 0, return_ip: 0, base: 0 }).unwrap();
        }
        assert!(matches!(
            p.push_frame(CallFrame { function_index: 0, return_ip: 0, base: 0 }),
            Err(ProcessLimitError::FrameStackOverflow)
        ));
    }

    #[test]
    fn children_respect_capacity() {
        let mut p = Process::new(pid(1), None, None);
        for i in 0..MAX_CHILDREN {
            p.add_child(pid(i as u32 + 2)).unwrap();
        }
        assert!(matches!(p.add_child(pid(999)), Err(ProcessLimitError::TooManyChildren)));
    }

    #[test]
    fn exit_sets_state_and_status() {
        let mut p = Process::new(pid(1), None, None);
        p.exit(ExitStatus::error("boom"));
        assert_eq!(p.state(), ProcessState::Exited);
        assert_eq!(p.exit_status().unwrap().reason, ExitReason::Error);
        assert_eq!(p.exit_status().unwrap().message.as_deref(), Some("boom"));
    }

    #[test]
    fn set_frames_replaces_the_frame_stack_wholesale() {
        let mut p = Process::new(pid(1), None, None);
        p.push_frame(CallFrame { function_index: 0, return_ip: 0, base: 0 }).unwrap();
        p.set_frames(vec![CallFrame { function_index: 3, return_ip: 7, base: 2 }]);
        assert_eq!(p.frames().len(), 1);
        assert_eq!(p.frames()[0].function_index, 3);
    }

    #[test]
    fn revive_clears_exit_status_and_resets_execution_state() {
        let mut p = Process::new(pid(1), None, None);
        p.push_value(Value::Int(1)).unwrap();
        p.push_frame(CallFrame { function_index: 0, return_ip: 3, base: 0 }).unwrap();
        p.set_ip(12);
        p.exit(ExitStatus::error("boom"));

        p.revive();

        assert_eq!(p.state(), ProcessState::Ready);
        assert_eq!(p.ip(), 0);
        assert!(p.value_stack().is_empty());
        assert!(p.frames().is_empty());
        assert!(p.exit_status().is_none());
    }
}
