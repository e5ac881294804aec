//! Supervision policy attached to a supervisor process (spec §3, §4.6).

use crate::backoff::{backoff_delay, BackoffKind};
use crate::circuit_breaker::CircuitBreaker;

/// What a supervisor does when a monitored child exits abnormally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Restart only the exited child.
    Restart,
    /// Leave the child dead; do not restart it.
    Stop,
    /// Propagate the exit to the supervisor's own parent.
    Escalate,
    /// Kill and restart every sibling alongside the exited child.
    RestartAll,
}

/// Per-supervisor restart policy: strategy, restart-window accounting,
/// backoff schedule, and an embedded circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisionConfig {
    /// Restart strategy applied to an abnormal child exit.
    pub strategy: Strategy,
    /// Maximum restarts allowed within `window_ms` before the supervisor
    /// itself gives up and escalates.
    pub max_restarts: u32,
    /// Length of the sliding restart-accounting window, in ms.
    pub window_ms: u64,
    /// Restarts counted within the current window.
    pub restart_count: u32,
    /// When the current window started, in ms.
    pub window_start: u64,
    /// Backoff kind applied between successive restarts.
    pub backoff: BackoffKind,
    /// Backoff base delay, in ms.
    pub base_delay_ms: u64,
    /// Backoff delay ceiling, in ms.
    pub max_delay_ms: u64,
    /// Earliest ms timestamp at which the next restart may run.
    pub next_retry_at: u64,
    /// Circuit breaker guarding repeated restart attempts.
    pub circuit: CircuitBreaker,
}

impl Default for SupervisionConfig {
    /// Spec §3 defaults: `Restart`, 3 restarts per 60s window,
    /// exponential backoff from 1s capped at 30s, circuit breaker
    /// tripping after 5 failures with a 60s cooldown.
    fn default() -> Self {
        Self {
            strategy: Strategy::Restart,
            max_restarts: 3,
            window_ms: 60_000,
            restart_count: 0,
            window_start: 0,
            backoff: BackoffKind::Exponential,
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
            next_retry_at: 0,
            circuit: CircuitBreaker::new(5, 60_000),
        }
    }
}

impl SupervisionConfig {
    /// Account for a restart attempt at `now_ms` and report whether the
    /// supervisor is still within its restart budget.
    ///
    /// Spec §4.6: "if `now - window_start > window_ms`, reset
    /// `restart_count` to 0 and `window_start` to `now` before the bound
    /// check." On success this also sets `next_retry_at` from the
    /// backoff schedule and increments `restart_count`.
    pub fn record_restart_attempt(&mut self, now_ms: u64) -> bool {
        if now_ms.saturating_sub(self.window_start) > self.window_ms {
            self.restart_count = 0;
            self.window_start = now_ms;
        }
        if self.restart_count >= self.max_restarts {
            return false;
        }
        let delay = backoff_delay(self.backoff, self.base_delay_ms, self.max_delay_ms, self.restart_count);
        self.restart_count += 1;
        self.next_retry_at = now_ms + delay;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = SupervisionConfig::default();
        assert_eq!(cfg.strategy, Strategy::Restart);
        assert_eq!(cfg.max_restarts, 3);
        assert_eq!(cfg.window_ms, 60_000);
        assert_eq!(cfg.backoff, BackoffKind::Exponential);
        assert_eq!(cfg.base_delay_ms, 1_000);
        assert_eq!(cfg.max_delay_ms, 30_000);
    }

    #[test]
    fn allows_restarts_up_to_the_bound_then_denies() {
        let mut cfg = SupervisionConfig { window_ms: 60_000, max_restarts: 2, ..SupervisionConfig::default() };
        assert!(cfg.record_restart_attempt(0));
        assert!(cfg.record_restart_attempt(10));
        assert!(!cfg.record_restart_attempt(20));
    }

    #[test]
    fn window_resets_restart_count_after_expiry() {
        let mut cfg = SupervisionConfig { window_ms: 100, max_restarts: 1, ..SupervisionConfig::default() };
        assert!(cfg.record_restart_attempt(0));
        assert!(!cfg.record_restart_attempt(50));
        assert!(cfg.record_restart_attempt(201));
    }

    #[test]
    fn backoff_delay_accumulates_into_next_retry_at() {
        let mut cfg = SupervisionConfig {
            backoff: BackoffKind::Linear,
            base_delay_ms: 100,
            max_delay_ms: 10_000,
            max_restarts: 5,
            ..SupervisionConfig::default()
        };
        cfg.record_restart_attempt(1_000);
        assert_eq!(cfg.next_retry_at, 1_100);
        cfg.record_restart_attempt(1_100);
        assert_eq!(cfg.next_retry_at, 1_300);
    }
}
