//! The publish/subscribe trace bus.

use crate::event::TraceEvent;

/// A handle returned by [`TraceBus::subscribe`], used to later
/// [`TraceBus::unsubscribe`] the same callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberToken(u64);

/// Publishes [`TraceEvent`]s to every registered subscriber in
/// registration order.
///
/// Unlike a hook pipeline, publishing never short-circuits: trace events
/// are pure observation, and every subscriber sees every event. The bus
/// never blocks the interpreter on subscriber work beyond running the
/// callback itself — subscribers are expected to be cheap (buffer, log,
/// forward to a channel) rather than perform their own I/O.
#[derive(Default)]
pub struct TraceBus {
    subscribers: Vec<(SubscriberToken, Box<dyn Fn(&TraceEvent) + Send>)>,
    next_token: u64,
}

impl TraceBus {
    /// Create an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self { subscribers: Vec::new(), next_token: 0 }
    }

    /// Register a callback, returning a token that can later unsubscribe it.
    pub fn subscribe(&mut self, callback: Box<dyn Fn(&TraceEvent) + Send>) -> SubscriberToken {
        let token = SubscriberToken(self.next_token);
        self.next_token += 1;
        self.subscribers.push((token, callback));
        token
    }

    /// Remove a previously registered subscriber. No-op if the token is
    /// unknown or was already removed.
    pub fn unsubscribe(&mut self, token: SubscriberToken) {
        self.subscribers.retain(|(t, _)| *t != token);
    }

    /// Whether any subscriber is currently registered. Used by the `PRINT`
    /// opcode to decide between routing through the bus and writing
    /// straight to standard output.
    #[must_use]
    pub fn has_subscribers(&self) -> bool {
        !self.subscribers.is_empty()
    }

    /// Publish an event to every subscriber, in registration order.
    pub fn publish(&self, event: &TraceEvent) {
        for (_, callback) in &self.subscribers {
            callback(event);
        }
    }

    /// Render a batch of events as JSON-lines (one compact JSON object per
    /// line, newline-terminated), the format `vega --debug` and any
    /// trace-export subscriber use.
    #[must_use]
    pub fn export_jsonl(&self, events: &[TraceEvent]) -> String {
        let mut out = String::new();
        for event in events {
            match serde_json::to_string(event) {
                Ok(line) => {
                    out.push_str(&line);
                    out.push('\n');
                }
                Err(_) => continue,
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn dispatches_to_all_subscribers_in_order() {
        let mut bus = TraceBus::new();
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));

        let o1 = order.clone();
        bus.subscribe(Box::new(move |_| o1.lock().unwrap().push(1)));
        let o2 = order.clone();
        bus.subscribe(Box::new(move |_| o2.lock().unwrap().push(2)));

        bus.publish(&TraceEvent::new(EventKind::Print, 0));
        assert_eq!(*order.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn unsubscribe_stops_future_delivery() {
        let mut bus = TraceBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let token = bus.subscribe(Box::new(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        }));

        bus.publish(&TraceEvent::new(EventKind::Print, 0));
        bus.unsubscribe(token);
        bus.publish(&TraceEvent::new(EventKind::Print, 1));

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn has_subscribers_reflects_registration_state() {
        let mut bus = TraceBus::new();
        assert!(!bus.has_subscribers());
        let token = bus.subscribe(Box::new(|_| {}));
        assert!(bus.has_subscribers());
        bus.unsubscribe(token);
        assert!(!bus.has_subscribers());
    }

    #[test]
    fn export_jsonl_emits_one_line_per_event() {
        let bus = TraceBus::new();
        let events = vec![TraceEvent::new(EventKind::Print, 0), TraceEvent::new(EventKind::HttpStart, 1)];
        let rendered = bus.export_jsonl(&events);
        assert_eq!(rendered.lines().count(), 2);
    }
}
