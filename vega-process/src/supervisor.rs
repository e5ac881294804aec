//! Supervisor-tree exit propagation and restart-strategy dispatch
//! (spec §4.6).

use crate::pid::Pid;
use crate::process::{ExitStatus, ProcessState};
use crate::supervision::Strategy;
use crate::table::ProcessTable;

/// What the scheduler must do in response to a process exit, as decided
/// by [`handle_exit`]. The process table has already been mutated
/// (children killed, restart bookkeeping updated) by the time these are
/// returned; these are instructions for the scheduler, which owns
/// actually re-running a process's agent/entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorAction {
    /// `pid` was killed as a cascade of its parent's exit.
    Killed(Pid),
    /// `pid` should be restarted from its agent's entry point.
    Restart(Pid),
    /// `pid` exited and its supervisor's strategy is `Stop`: no further
    /// action.
    Stopped(Pid),
    /// `pid`'s supervisor wanted to restart it but the restart window or
    /// circuit breaker denied the attempt; the child is forgotten rather
    /// than escalated.
    RestartExhausted(Pid),
    /// The supervisor at `pid` must exit with reason `Error`, propagating
    /// the failure to its own parent (strategy is `Escalate`).
    Escalate(Pid),
}

/// Apply spec §4.6's exit-propagation rule to `exited`, which must
/// already be marked [`crate::process::ProcessState::Exited`] in
/// `table`.
///
/// Every non-exited child of `exited` is recursively killed first — a
/// `Killed` action is returned for each — before the parent supervisor
/// (if any) is notified and its strategy applied.
pub fn handle_exit(table: &mut ProcessTable, exited: Pid, now_ms: u64) -> Vec<SupervisorAction> {
    let mut actions = Vec::new();
    kill_children(table, exited, &mut actions);

    let parent = table.get(exited).and_then(|p| p.parent());
    if let Some(parent_pid) = parent {
        let is_supervisor = table.get(parent_pid).is_some_and(|p| p.is_supervisor());
        if is_supervisor {
            actions.extend(apply_strategy(table, parent_pid, exited, now_ms));
        }
        if let Some(parent_proc) = table.get_mut(parent_pid) {
            parent_proc.remove_child(exited);
        }
    }
    actions
}

fn kill_children(table: &mut ProcessTable, pid: Pid, actions: &mut Vec<SupervisorAction>) {
    let children: Vec<Pid> = table.get(pid).map(|p| p.children().to_vec()).unwrap_or_default();
    for child in children {
        let already_exited = table.get(child).map_or(true, |p| p.state() == ProcessState::Exited);
        if already_exited {
            continue;
        }
        kill_children(table, child, actions);
        if let Some(c) = table.get_mut(child) {
            c.exit(ExitStatus::killed("parent process exited"));
        }
        actions.push(SupervisorAction::Killed(child));
    }
}

fn apply_strategy(table: &mut ProcessTable, supervisor: Pid, exited: Pid, now_ms: u64) -> Vec<SupervisorAction> {
    let mut actions = Vec::new();

    let Some(strategy) = table.get(supervisor).and_then(|p| p.supervision()).map(|c| c.strategy) else {
        return actions;
    };

    let allowed = match table.get_mut(supervisor).and_then(|p| p.supervision_mut()) {
        Some(cfg) => {
            cfg.circuit.record_failure(now_ms);
            cfg.circuit.allow(now_ms) && cfg.record_restart_attempt(now_ms)
        }
        None => false,
    };

    match strategy {
        Strategy::Stop => actions.push(SupervisorAction::Stopped(exited)),
        Strategy::Escalate => actions.push(SupervisorAction::Escalate(supervisor)),
        Strategy::Restart => {
            if allowed {
                actions.push(SupervisorAction::Restart(exited));
            } else {
                actions.push(SupervisorAction::RestartExhausted(exited));
            }
        }
        Strategy::RestartAll => {
            if allowed {
                let siblings: Vec<Pid> = table.get(supervisor).map(|p| p.children().to_vec()).unwrap_or_default();
                for sibling in siblings {
                    let still_alive = table.get(sibling).is_some_and(|p| p.state() != ProcessState::Exited);
                    if still_alive {
                        if let Some(s) = table.get_mut(sibling) {
                            s.exit(ExitStatus::killed("sibling restart"));
                        }
                        actions.push(SupervisorAction::Killed(sibling));
                    }
                    actions.push(SupervisorAction::Restart(sibling));
                }
                actions.push(SupervisorAction::Restart(exited));
            } else {
                actions.push(SupervisorAction::RestartExhausted(exited));
            }
        }
    }
    actions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::supervision::SupervisionConfig;

    fn make_supervised_pair(strategy: Strategy) -> (ProcessTable, Pid, Pid) {
        let mut table = ProcessTable::new();
        let sup = table.spawn(None, None);
        let child = table.spawn(Some(sup), None);
        table.get_mut(sup).unwrap().add_child(child).unwrap();
        table.get_mut(sup).unwrap().make_supervisor(SupervisionConfig {
            strategy,
            max_restarts: 3,
            ..SupervisionConfig::default()
        });
        (table, sup, child)
    }

    #[test]
    fn restart_strategy_restarts_just_the_child() {
        let (mut table, _sup, child) = make_supervised_pair(Strategy::Restart);
        table.get_mut(child).unwrap().exit(ExitStatus::error("boom"));
        let actions = handle_exit(&mut table, child, 0);
        assert_eq!(actions, vec![SupervisorAction::Restart(child)]);
    }

    #[test]
    fn stop_strategy_leaves_the_child_dead() {
        let (mut table, _sup, child) = make_supervised_pair(Strategy::Stop);
        table.get_mut(child).unwrap().exit(ExitStatus::error("boom"));
        let actions = handle_exit(&mut table, child, 0);
        assert_eq!(actions, vec![SupervisorAction::Stopped(child)]);
    }

    #[test]
    fn escalate_strategy_notifies_the_supervisors_own_parent() {
        let (mut table, sup, child) = make_supervised_pair(Strategy::Escalate);
        table.get_mut(child).unwrap().exit(ExitStatus::error("boom"));
        let actions = handle_exit(&mut table, child, 0);
        assert_eq!(actions, vec![SupervisorAction::Escalate(sup)]);
    }

    #[test]
    fn restart_forgets_the_child_once_restart_budget_is_exhausted() {
        let (mut table, sup, child) = make_supervised_pair(Strategy::Restart);
        table.get_mut(sup).unwrap().supervision_mut().unwrap().max_restarts = 1;

        table.get_mut(child).unwrap().exit(ExitStatus::error("boom"));
        let first = handle_exit(&mut table, child, 0);
        assert_eq!(first, vec![SupervisorAction::Restart(child)]);

        table.get_mut(child).unwrap().exit(ExitStatus::error("boom again"));
        let second = handle_exit(&mut table, child, 10);
        assert_eq!(second, vec![SupervisorAction::RestartExhausted(child)]);
    }

    #[test]
    fn exiting_a_supervisor_kills_every_non_exited_child_first() {
        let mut table = ProcessTable::new();
        let sup = table.spawn(None, None);
        let a = table.spawn(Some(sup), None);
        let b = table.spawn(Some(sup), None);
        table.get_mut(sup).unwrap().add_child(a).unwrap();
        table.get_mut(sup).unwrap().add_child(b).unwrap();

        table.get_mut(sup).unwrap().exit(ExitStatus::normal());
        let actions = handle_exit(&mut table, sup, 0);

        assert!(actions.contains(&SupervisorAction::Killed(a)));
        assert!(actions.contains(&SupervisorAction::Killed(b)));
        assert_eq!(table.get(a).unwrap().state(), ProcessState::Exited);
        assert_eq!(table.get(b).unwrap().state(), ProcessState::Exited);
    }

    #[test]
    fn restart_all_kills_and_restarts_every_sibling() {
        let mut table = ProcessTable::new();
        let sup = table.spawn(None, None);
        let a = table.spawn(Some(sup), None);
        let b = table.spawn(Some(sup), None);
        table.get_mut(sup).unwrap().add_child(a).unwrap();
        table.get_mut(sup).unwrap().add_child(b).unwrap();
        table.get_mut(sup).unwrap().make_supervisor(SupervisionConfig {
            strategy: Strategy::RestartAll,
            max_restarts: 3,
            ..SupervisionConfig::default()
        });

        table.get_mut(a).unwrap().exit(ExitStatus::error("boom"));
        let actions = handle_exit(&mut table, a, 0);

        assert!(actions.contains(&SupervisorAction::Killed(b)));
        assert!(actions.contains(&SupervisorAction::Restart(b)));
        assert!(actions.contains(&SupervisorAction::Restart(a)));
    }
}
