//! Circuit breaker state machine (spec §4.8).
//!
//! Time is always passed in explicitly as a millisecond timestamp rather
//! than read from the wall clock, so the restart/backoff scenarios in
//! integration tests run instantly and deterministically instead of
//! sleeping.

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Requests/restarts are allowed.
    Closed,
    /// Requests/restarts are denied until the cooldown elapses.
    Open,
    /// One probe is allowed through; its outcome decides `Closed` vs `Open`.
    HalfOpen,
}

/// Tracks consecutive failures and trips open once `failure_threshold`
/// is reached, per spec §4.8.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreaker {
    state: CircuitState,
    failure_threshold: u32,
    failure_count: u32,
    circuit_opened_at: Option<u64>,
    cooldown_ms: u64,
}

impl CircuitBreaker {
    /// A breaker that trips after `failure_threshold` consecutive
    /// failures and stays open for `cooldown_ms` before probing again.
    #[must_use]
    pub fn new(failure_threshold: u32, cooldown_ms: u64) -> Self {
        Self {
            state: CircuitState::Closed,
            failure_threshold,
            failure_count: 0,
            circuit_opened_at: None,
            cooldown_ms,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> CircuitState {
        self.state
    }

    /// Whether a request/restart is allowed to proceed right now.
    ///
    /// In `Open`, once `now_ms` is past `circuit_opened_at + cooldown_ms`
    /// the breaker transitions to `HalfOpen` and allows exactly this one
    /// call through; every subsequent call while still `HalfOpen` is
    /// denied until [`CircuitBreaker::record_success`] or
    /// [`CircuitBreaker::record_failure`] resolves the probe.
    pub fn allow(&mut self, now_ms: u64) -> bool {
        match self.state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => false,
            CircuitState::Open => {
                let opened_at = self.circuit_opened_at.unwrap_or(now_ms);
                if now_ms.saturating_sub(opened_at) >= self.cooldown_ms {
                    self.state = CircuitState::HalfOpen;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Record a successful call. Closes the circuit and clears the
    /// failure count regardless of prior state.
    pub fn record_success(&mut self) {
        self.state = CircuitState::Closed;
        self.failure_count = 0;
        self.circuit_opened_at = None;
    }

    /// Record a failed call.
    ///
    /// From `HalfOpen` the probe failed: re-open and restart the
    /// cooldown. From `Closed`, increment the failure count and trip
    /// open once `failure_threshold` is reached.
    pub fn record_failure(&mut self, now_ms: u64) {
        match self.state {
            CircuitState::HalfOpen => {
                self.state = CircuitState::Open;
                self.circuit_opened_at = Some(now_ms);
            }
            CircuitState::Closed | CircuitState::Open => {
                self.failure_count += 1;
                if self.failure_count >= self.failure_threshold {
                    self.state = CircuitState::Open;
                    self.circuit_opened_at = Some(now_ms);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trips_open_after_threshold_failures() {
        let mut cb = CircuitBreaker::new(2, 100);
        assert_eq!(cb.state(), CircuitState::Closed);
        cb.record_failure(0);
        assert_eq!(cb.state(), CircuitState::Closed);
        cb.record_failure(10);
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[test]
    fn denies_while_open_and_probes_after_cooldown() {
        let mut cb = CircuitBreaker::new(2, 100);
        cb.record_failure(0);
        cb.record_failure(10);
        assert!(!cb.allow(50));
        assert!(cb.allow(110));
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        assert!(!cb.allow(111));
    }

    #[test]
    fn successful_probe_closes_the_circuit() {
        let mut cb = CircuitBreaker::new(2, 100);
        cb.record_failure(0);
        cb.record_failure(10);
        assert!(cb.allow(110));
        cb.record_success();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert!(cb.allow(111));
    }

    #[test]
    fn failed_probe_reopens_and_restarts_cooldown() {
        let mut cb = CircuitBreaker::new(2, 100);
        cb.record_failure(0);
        cb.record_failure(10);
        assert!(cb.allow(110));
        cb.record_failure(110);
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(!cb.allow(150));
        assert!(cb.allow(210));
    }

    #[test]
    fn end_to_end_scenario_threshold_2_cooldown_100ms() {
        let mut cb = CircuitBreaker::new(2, 100);
        assert!(cb.allow(0));
        cb.record_failure(0);
        assert!(cb.allow(5));
        cb.record_failure(5);
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(!cb.allow(50));
        assert!(cb.allow(105));
        cb.record_success();
        assert!(cb.allow(106));
        assert_eq!(cb.state(), CircuitState::Closed);
    }
}
