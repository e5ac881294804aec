//! The runtime's pending-future table, backing `SEND_ASYNC`/`AWAIT`.

use vega_value::{AgentId, FutureId};

/// A write-once result: becomes `Ready` or `Error` exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FutureState {
    /// Still awaiting the underlying send.
    Pending,
    /// Resolved successfully with the assistant's text.
    Ready(String),
    /// Resolved to an error string.
    Error(String),
}

/// A single pending or resolved async send.
#[derive(Debug, Clone)]
pub struct FutureRecord {
    /// The agent the send was issued against.
    pub owner: AgentId,
    /// Current resolution state.
    pub state: FutureState,
}

/// Arena of in-flight/resolved futures, indexed by [`FutureId`].
#[derive(Debug, Default)]
pub struct FutureTable {
    records: Vec<FutureRecord>,
}

impl FutureTable {
    /// An empty table.
    #[must_use]
    pub fn new() -> Self {
        Self { records: Vec::new() }
    }

    /// Register a new pending future for `owner`, returning its handle.
    pub fn alloc(&mut self, owner: AgentId) -> FutureId {
        let id = FutureId(self.records.len() as u32);
        self.records.push(FutureRecord { owner, state: FutureState::Pending });
        id
    }

    /// Look up a future by id.
    #[must_use]
    pub fn get(&self, id: FutureId) -> Option<&FutureRecord> {
        self.records.get(id.0 as usize)
    }

    /// Resolve a pending future. A future resolves exactly once; resolving
    /// an already-resolved future is a no-op (the first result sticks).
    pub fn resolve(&mut self, id: FutureId, outcome: Result<String, String>) {
        if let Some(record) = self.records.get_mut(id.0 as usize) {
            if record.state == FutureState::Pending {
                record.state = match outcome {
                    Ok(text) => FutureState::Ready(text),
                    Err(message) => FutureState::Error(message),
                };
            }
        }
    }

    /// Whether the future has left `Pending`.
    #[must_use]
    pub fn is_ready(&self, id: FutureId) -> bool {
        !matches!(self.get(id).map(|r| &r.state), Some(FutureState::Pending) | None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_exactly_once() {
        let mut table = FutureTable::new();
        let id = table.alloc(AgentId(0));
        assert!(!table.is_ready(id));
        table.resolve(id, Ok("hello".to_string()));
        assert!(table.is_ready(id));
        assert_eq!(table.get(id).unwrap().state, FutureState::Ready("hello".to_string()));
        table.resolve(id, Err("too late".to_string()));
        assert_eq!(table.get(id).unwrap().state, FutureState::Ready("hello".to_string()));
    }
}
