//! The flat process table: every live process, keyed by pid.

use std::collections::HashMap;

use vega_value::AgentId;

use crate::pid::Pid;
use crate::process::Process;

/// Owns every process in the runtime and hands out fresh pids.
#[derive(Debug, Default)]
pub struct ProcessTable {
    processes: HashMap<u32, Process>,
    next_pid: u32,
}

impl ProcessTable {
    /// An empty table; the first spawned process gets pid 1.
    #[must_use]
    pub fn new() -> Self {
        Self { processes: HashMap::new(), next_pid: 1 }
    }

    /// Spawn a new process with the given parent and agent back-reference,
    /// returning its freshly assigned pid.
    pub fn spawn(&mut self, parent: Option<Pid>, agent: Option<AgentId>) -> Pid {
        let pid = Pid::new(self.next_pid);
        self.next_pid += 1;
        self.processes.insert(pid.as_u32(), Process::new(pid, parent, agent));
        pid
    }

    /// Look up a process by pid.
    #[must_use]
    pub fn get(&self, pid: Pid) -> Option<&Process> {
        self.processes.get(&pid.as_u32())
    }

    /// Mutably look up a process by pid.
    pub fn get_mut(&mut self, pid: Pid) -> Option<&mut Process> {
        self.processes.get_mut(&pid.as_u32())
    }

    /// Remove a process from the table entirely (after its exit has been
    /// fully handled and nothing references it anymore).
    pub fn remove(&mut self, pid: Pid) -> Option<Process> {
        self.processes.remove(&pid.as_u32())
    }

    /// Number of processes currently tracked (live or exited-but-not-reaped).
    #[must_use]
    pub fn len(&self) -> usize {
        self.processes.len()
    }

    /// Whether the table holds no processes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    /// Iterate over every pid currently tracked.
    pub fn pids(&self) -> impl Iterator<Item = Pid> + '_ {
        self.processes.keys().map(|&raw| Pid::new(raw))
    }
}
