//! HTTP seam errors and the retry/fatal classification of a response.

use thiserror::Error;

/// How a completed (or failed-to-complete) HTTP attempt should be treated
/// by the agent manager's retry logic (spec §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The request succeeded; nothing to retry.
    None,
    /// Worth retrying through backoff/circuit-breaker: HTTP 429, any 5xx,
    /// a network-level failure, or a body containing `overloaded`.
    Retriable,
    /// Not worth retrying: any other non-200 status.
    Fatal,
}

/// Classify a completed attempt per the spec's exact rule: 200 is `None`;
/// 429, any 5xx, status 0 (meaning "no HTTP status", i.e. a network
/// error), or a body containing the substring `overloaded` is
/// `Retriable`; everything else is `Fatal`.
#[must_use]
pub fn classify_status(status: u16, body: &str) -> FailureKind {
    if status == 200 {
        FailureKind::None
    } else if status == 429 || (500..600).contains(&status) || status == 0 || body.contains("overloaded") {
        FailureKind::Retriable
    } else {
        FailureKind::Fatal
    }
}

/// Errors raised by the HTTP seam itself (as opposed to the remote API
/// returning a non-200 status, which is surfaced as a classified failure
/// rather than this error type).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum HttpError {
    /// The underlying `reqwest` call failed (DNS, connect, TLS, timeout, ...).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body was not valid JSON.
    #[error("invalid JSON response: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The response JSON was valid but missing a field the parser requires.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The helper thread panicked or was otherwise lost before completing.
    #[error("request thread did not complete cleanly")]
    ThreadLost,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_status_is_none() {
        assert_eq!(classify_status(200, ""), FailureKind::None);
    }

    #[test]
    fn rate_limit_is_retriable() {
        assert_eq!(classify_status(429, ""), FailureKind::Retriable);
    }

    #[test]
    fn server_errors_are_retriable() {
        assert_eq!(classify_status(500, ""), FailureKind::Retriable);
        assert_eq!(classify_status(503, ""), FailureKind::Retriable);
        assert_eq!(classify_status(599, ""), FailureKind::Retriable);
    }

    #[test]
    fn network_error_status_zero_is_retriable() {
        assert_eq!(classify_status(0, ""), FailureKind::Retriable);
    }

    #[test]
    fn overloaded_body_is_retriable_regardless_of_status() {
        assert_eq!(classify_status(400, "the service is overloaded right now"), FailureKind::Retriable);
    }

    #[test]
    fn other_non_200_is_fatal() {
        assert_eq!(classify_status(401, ""), FailureKind::Fatal);
        assert_eq!(classify_status(404, ""), FailureKind::Fatal);
    }
}
