//! # vega-scheduler — the cooperative process scheduler for Vega
//!
//! A [`Scheduler`] owns nothing but a FIFO ready queue of pids and a
//! pointer to whichever one is currently running (spec §4.5). It never
//! touches the wall clock, never spawns a thread, and is never wrapped
//! in a `Mutex`/`Arc` — it is `!Send` by construction (it borrows the
//! interpreter's [`ProcessRunner`] for the lifetime of every call) and is
//! meant to be driven by a single-threaded loop that owns the real clock
//! (`vega-cli`).
//!
//! Deciding *what running a process actually does* — dispatching
//! opcodes, advancing an in-flight HTTP send — is the job of whatever
//! implements [`ProcessRunner`]; this crate only ever moves pids between
//! `Ready`/`Running`/`Waiting`/`Exited`, per spec §4.5's state machine.

#![deny(missing_docs)]

use std::collections::VecDeque;

use vega_process::{Pid, ProcessState, ProcessTable};

/// What running a process produced, reported back to the [`Scheduler`] so
/// it knows where the pid goes next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Hit `YIELD`: requeue at the back of the ready queue.
    Yielded,
    /// Blocked on a send, an `AWAIT`, or a child exit: leave `Waiting`
    /// until something calls [`Scheduler::unblock`].
    Blocked,
    /// The process exited (`RETURN` with an empty frame stack,
    /// `EXIT_PROCESS`, or an unrecoverable runtime error). Already marked
    /// `Exited` in the table by the runner.
    Exited,
}

/// Whether a full scheduling pass left any work still outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerStatus {
    /// Every process in the table has exited; there is nothing left to run.
    Done,
    /// Nothing is runnable right now, but at least one process is
    /// `Waiting` — typically on an in-flight HTTP send. The driving loop
    /// should let real time pass (sleep, poll a socket, whatever `vega-cli`
    /// chooses) and call [`Scheduler::run_to_quiescence`] again.
    Idle,
}

/// Implemented by whatever actually executes a process's bytecode and
/// advances its pending agent sends. `vega-vm`'s `Vm` is the only
/// implementer; this trait exists purely so `vega-scheduler` does not
/// need to depend on the interpreter (the dependency points the other
/// way, per the crate graph).
pub trait ProcessRunner {
    /// Run `pid` until it yields, blocks, or exits, mutating `table` and
    /// `scheduler` as needed (requeuing children, registering waits,
    /// etc). `now_ms` is the single timestamp this whole scheduling step
    /// is allowed to see — every retry/backoff/circuit-breaker decision
    /// made while running this process uses it, not a fresh read of the
    /// clock.
    fn run_process(&mut self, table: &mut ProcessTable, scheduler: &mut Scheduler, pid: Pid, now_ms: u64) -> RunOutcome;

    /// Advance whatever asynchronous work is in flight (agent sends,
    /// scheduled retries) that isn't tied to any currently-`Running`
    /// process. Returns whether anything changed — a response arrived, a
    /// retry fired, a process was unblocked — so the scheduler knows
    /// whether another ready-queue pass might now make progress.
    fn poll_async(&mut self, table: &mut ProcessTable, scheduler: &mut Scheduler, now_ms: u64) -> bool;
}

/// The FIFO ready-queue scheduler (spec §4.5).
///
/// `next()`/`yield()`/`block()`/`unblock()` map directly onto the spec's
/// named operations; [`Scheduler::run_to_quiescence`] is the convenience
/// loop that drains the ready queue and polls pending async work until
/// neither produces any further progress.
#[derive(Debug, Default)]
pub struct Scheduler {
    ready: VecDeque<Pid>,
    current: Option<Pid>,
}

impl Scheduler {
    /// An empty scheduler with nothing queued.
    #[must_use]
    pub fn new() -> Self {
        Self { ready: VecDeque::new(), current: None }
    }

    /// Add a freshly spawned (or revived) process to the back of the
    /// ready queue. No-op if `pid` is not actually `Ready` in `table`.
    pub fn enqueue(&mut self, table: &ProcessTable, pid: Pid) {
        if table.get(pid).is_some_and(|p| p.state() == ProcessState::Ready) {
            self.ready.push_back(pid);
        }
    }

    /// The pid currently running, if any.
    #[must_use]
    pub fn current(&self) -> Option<Pid> {
        self.current
    }

    /// Dequeue the first `Ready` pid and mark it `Running`. Stale entries
    /// (a pid that exited or was killed while still queued) are skipped
    /// rather than ever handed back.
    pub fn next(&mut self, table: &mut ProcessTable) -> Option<Pid> {
        while let Some(pid) = self.ready.pop_front() {
            if table.get(pid).is_some_and(|p| p.state() == ProcessState::Ready) {
                if let Some(p) = table.get_mut(pid) {
                    p.set_state(ProcessState::Running);
                }
                self.current = Some(pid);
                return Some(pid);
            }
        }
        None
    }

    /// Requeue the currently running process as `Ready` (`YIELD`).
    pub fn yield_current(&mut self, table: &mut ProcessTable) {
        if let Some(pid) = self.current.take() {
            if let Some(p) = table.get_mut(pid) {
                if p.state() == ProcessState::Running {
                    p.set_state(ProcessState::Ready);
                }
            }
            self.ready.push_back(pid);
        }
    }

    /// Mark the currently running process `Waiting` and forget it as
    /// current, without requeuing it. Something must later call
    /// [`Scheduler::unblock`] to make it runnable again.
    pub fn block_current(&mut self, table: &mut ProcessTable) {
        if let Some(pid) = self.current.take() {
            if let Some(p) = table.get_mut(pid) {
                if p.state() == ProcessState::Running {
                    p.set_state(ProcessState::Waiting);
                }
            }
        }
    }

    /// Forget the currently running process without requeuing it — it
    /// has already been marked `Exited` in `table` by the runner.
    pub fn exit_current(&mut self) {
        self.current = None;
    }

    /// Move a `Waiting` process back to `Ready` and enqueue it. No-op if
    /// `pid` is not currently `Waiting`.
    pub fn unblock(&mut self, table: &mut ProcessTable, pid: Pid) {
        if let Some(p) = table.get_mut(pid) {
            if p.state() == ProcessState::Waiting {
                p.set_state(ProcessState::Ready);
                self.ready.push_back(pid);
            }
        }
    }

    /// Whether the ready queue is empty and nothing is currently running.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.current.is_none() && self.ready.is_empty()
    }

    /// Drain the ready queue, running each process to its next
    /// yield/block/exit, then poll pending async work and repeat as long
    /// as either phase makes progress.
    ///
    /// Returns [`SchedulerStatus::Done`] once every process in `table`
    /// has exited, or [`SchedulerStatus::Idle`] if the ready queue is
    /// empty but at least one process is still `Waiting` — the caller
    /// (only ever `vega-cli`) decides how long to let real time pass
    /// before calling this again.
    pub fn run_to_quiescence<R: ProcessRunner>(&mut self, table: &mut ProcessTable, runner: &mut R, now_ms: u64) -> SchedulerStatus {
        loop {
            let mut progressed = false;
            while let Some(pid) = self.next(table) {
                progressed = true;
                match runner.run_process(table, self, pid, now_ms) {
                    RunOutcome::Yielded => self.yield_current(table),
                    RunOutcome::Blocked => self.block_current(table),
                    RunOutcome::Exited => self.exit_current(),
                }
            }
            let advanced = runner.poll_async(table, self, now_ms);
            if !advanced && !progressed {
                break;
            }
            if !advanced && self.ready.is_empty() {
                break;
            }
        }

        let done = table.pids().all(|pid| table.get(pid).is_none_or(|p| p.state() == ProcessState::Exited));
        if done {
            SchedulerStatus::Done
        } else {
            SchedulerStatus::Idle
        }
    }
}
