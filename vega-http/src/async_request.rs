//! The async request handle: one private OS thread per in-flight HTTP
//! call, polled by the interpreter through a mutex-guarded status word.
//!
//! Per spec §5, the interpreter never blocks on network I/O — it polls
//! `status()` once per step. The helper thread is joined exactly when
//! the owner calls [`AsyncRequest::get_response`] or
//! [`AsyncRequest::cancel`], transferring response ownership at that
//! point and nowhere else.

use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::error::HttpError;
use crate::types::ApiResponse;

/// Outcome of a completed HTTP attempt, before the agent manager's
/// retry classification is applied.
#[derive(Debug, Clone)]
pub enum RequestOutcome {
    /// The model returned a successful response.
    Success(ApiResponse),
    /// The model returned a non-200 status with this body.
    HttpStatus { status: u16, body: String },
    /// The request never reached the server (connect/DNS/TLS/timeout).
    Transport(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Status {
    Pending,
    Done,
}

/// A single in-flight (or completed) HTTP request, running on its own
/// OS thread.
pub struct AsyncRequest {
    status: Arc<Mutex<Status>>,
    result: Arc<Mutex<Option<RequestOutcome>>>,
    handle: Option<JoinHandle<()>>,
}

impl AsyncRequest {
    /// Spawn a POST request on a private thread.
    ///
    /// `client` is cloned cheaply (an `Arc`-backed `reqwest::blocking::Client`
    /// internally) so each request gets its own thread without building a
    /// fresh connector.
    #[must_use]
    pub fn spawn(
        client: reqwest::blocking::Client,
        url: String,
        api_key: String,
        body: serde_json::Value,
        timeout: Duration,
    ) -> Self {
        let status = Arc::new(Mutex::new(Status::Pending));
        let result = Arc::new(Mutex::new(None));

        let status_w = status.clone();
        let result_w = result.clone();

        let handle = std::thread::spawn(move || {
            let outcome = Self::run(client, &url, &api_key, body, timeout);
            *result_w.lock().expect("result mutex poisoned") = Some(outcome);
            *status_w.lock().expect("status mutex poisoned") = Status::Done;
        });

        Self { status, result, handle: Some(handle) }
    }

    fn run(
        client: reqwest::blocking::Client,
        url: &str,
        api_key: &str,
        body: serde_json::Value,
        timeout: Duration,
    ) -> RequestOutcome {
        let sent = client
            .post(url)
            .timeout(timeout)
            .header("x-api-key", api_key)
            .header("anthropic-version", crate::request::API_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send();

        let response = match sent {
            Ok(r) => r,
            Err(e) => return RequestOutcome::Transport(e.to_string()),
        };

        let status = response.status().as_u16();
        let text = match response.text() {
            Ok(t) => t,
            Err(e) => return RequestOutcome::Transport(e.to_string()),
        };

        if status != 200 {
            return RequestOutcome::HttpStatus { status, body: text };
        }

        match serde_json::from_str::<serde_json::Value>(&text) {
            Ok(json) => match crate::response::parse_response(&json) {
                Ok(parsed) => RequestOutcome::Success(parsed),
                Err(e) => RequestOutcome::Transport(e.to_string()),
            },
            Err(e) => RequestOutcome::Transport(HttpError::InvalidJson(e).to_string()),
        }
    }

    /// Whether the request has completed. Pure status read; never joins.
    #[must_use]
    pub fn is_done(&self) -> bool {
        *self.status.lock().expect("status mutex poisoned") == Status::Done
    }

    /// Join the helper thread and take ownership of the result.
    ///
    /// Returns `None` if called more than once (the result was already
    /// taken) or if the request is still pending (callers must check
    /// [`AsyncRequest::is_done`] first).
    pub fn get_response(&mut self) -> Option<RequestOutcome> {
        if !self.is_done() {
            return None;
        }
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
        self.result.lock().expect("result mutex poisoned").take()
    }

    /// Cancel an in-flight request: the network call still runs to
    /// completion on its thread (no interrupt), but the thread is joined
    /// immediately and the result discarded.
    pub fn cancel(mut self) {
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_done_until_thread_finishes_some_work() {
        let client = reqwest::blocking::Client::new();
        let req = AsyncRequest::spawn(
            client,
            "http://127.0.0.1:0/v1/messages".to_string(),
            "key".to_string(),
            serde_json::json!({}),
            Duration::from_millis(50),
        );
        // Connection to a closed port fails fast; give the thread a moment.
        std::thread::sleep(Duration::from_millis(200));
        assert!(req.is_done());
    }

    #[test]
    fn get_response_returns_transport_failure_on_connection_refused() {
        let client = reqwest::blocking::Client::new();
        let mut req = AsyncRequest::spawn(
            client,
            "http://127.0.0.1:0/v1/messages".to_string(),
            "key".to_string(),
            serde_json::json!({}),
            Duration::from_millis(50),
        );
        std::thread::sleep(Duration::from_millis(200));
        let outcome = req.get_response();
        assert!(matches!(outcome, Some(RequestOutcome::Transport(_))));
        assert!(req.get_response().is_none());
    }
}
