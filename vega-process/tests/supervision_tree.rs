use vega_process::{handle_exit, ExitStatus, ProcessState, ProcessTable, Strategy, SupervisionConfig, SupervisorAction};

#[test]
fn killing_a_supervisor_cascades_through_two_generations() {
    let mut table = ProcessTable::new();
    let root = table.spawn(None, None);
    let mid = table.spawn(Some(root), None);
    let leaf = table.spawn(Some(mid), None);

    table.get_mut(root).unwrap().add_child(mid).unwrap();
    table.get_mut(mid).unwrap().add_child(leaf).unwrap();

    table.get_mut(root).unwrap().exit(ExitStatus::normal());
    let actions = handle_exit(&mut table, root, 0);

    assert!(actions.contains(&SupervisorAction::Killed(mid)));
    assert!(actions.contains(&SupervisorAction::Killed(leaf)));
    assert_eq!(table.get(mid).unwrap().state(), ProcessState::Exited);
    assert_eq!(table.get(leaf).unwrap().state(), ProcessState::Exited);
}

#[test]
fn restart_budget_and_circuit_breaker_interact_across_repeated_failures() {
    let mut table = ProcessTable::new();
    let sup = table.spawn(None, None);
    let child = table.spawn(Some(sup), None);
    table.get_mut(sup).unwrap().add_child(child).unwrap();
    table.get_mut(sup).unwrap().make_supervisor(SupervisionConfig {
        strategy: Strategy::Restart,
        max_restarts: 10,
        window_ms: 60_000,
        ..SupervisionConfig::default()
    });
    // Circuit breaker default trips after 5 consecutive failures; the
    // restart budget (10) is generous enough that the breaker, not the
    // window, is the first thing to deny a restart. The 5th failure
    // both crosses the threshold and is denied in the same call.
    for attempt in 0..4 {
        table.get_mut(child).unwrap().exit(ExitStatus::error("flaky"));
        let actions = handle_exit(&mut table, child, u64::from(attempt) * 10);
        assert_eq!(actions, vec![SupervisorAction::Restart(child)]);
        // Simulate the restart itself failing again immediately.
        table.get_mut(sup).unwrap().add_child(child).unwrap();
    }

    table.get_mut(child).unwrap().exit(ExitStatus::error("flaky"));
    let actions = handle_exit(&mut table, child, 50);
    assert_eq!(actions, vec![SupervisorAction::RestartExhausted(child)]);
}
