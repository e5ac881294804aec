//! Restart backoff delay calculation (spec §4.7).

/// How the delay between successive restarts grows with the attempt
/// number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffKind {
    /// No delay between restarts.
    None,
    /// `base_delay_ms * (attempt + 1)`.
    Linear,
    /// `base_delay_ms * 2^attempt`, saturating at `max_delay_ms`.
    Exponential,
}

/// Delay in milliseconds before the `attempt`-th restart (0-indexed),
/// given `base_delay_ms` and a `max_delay_ms` ceiling.
///
/// `Exponential` saturates rather than overflows: an `attempt` large
/// enough that `2^attempt` would overflow `u64` still returns
/// `max_delay_ms`, never panics and never wraps.
#[must_use]
pub fn backoff_delay(kind: BackoffKind, base_delay_ms: u64, max_delay_ms: u64, attempt: u32) -> u64 {
    let raw = match kind {
        BackoffKind::None => 0,
        BackoffKind::Linear => base_delay_ms.saturating_mul(u64::from(attempt) + 1),
        BackoffKind::Exponential => {
            let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
            base_delay_ms.saturating_mul(factor)
        }
    };
    raw.min(max_delay_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_is_always_zero() {
        assert_eq!(backoff_delay(BackoffKind::None, 1000, 30_000, 0), 0);
        assert_eq!(backoff_delay(BackoffKind::None, 1000, 30_000, 50), 0);
    }

    #[test]
    fn linear_grows_by_base_per_attempt() {
        assert_eq!(backoff_delay(BackoffKind::Linear, 1000, 30_000, 0), 1000);
        assert_eq!(backoff_delay(BackoffKind::Linear, 1000, 30_000, 2), 3000);
    }

    #[test]
    fn exponential_doubles_and_saturates_at_cap() {
        assert_eq!(backoff_delay(BackoffKind::Exponential, 1000, 30_000, 0), 1000);
        assert_eq!(backoff_delay(BackoffKind::Exponential, 1000, 30_000, 1), 2000);
        assert_eq!(backoff_delay(BackoffKind::Exponential, 1000, 30_000, 5), 30_000);
    }

    #[test]
    fn exponential_never_overflows_for_large_attempts() {
        assert_eq!(backoff_delay(BackoffKind::Exponential, 1000, 30_000, 16), 30_000);
        assert_eq!(backoff_delay(BackoffKind::Exponential, 1000, 30_000, 63), 30_000);
        assert_eq!(backoff_delay(BackoffKind::Exponential, 1000, 30_000, 64), 30_000);
    }
}
