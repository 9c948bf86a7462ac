use dashmap::DashMap;

use crate::traits::ConnectionHandle;
use crate::types::SessionId;

/// Live viewer connection per session, at most one each.
pub struct ConnectionTable<H> {
    connections: DashMap<SessionId, H>,
}

impl<H: ConnectionHandle> ConnectionTable<H> {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    /// Last writer wins. Returns the handle that got replaced, if any.
    pub fn bind(&self, session_id: &str, handle: H) -> Option<H> {
        let replaced = self.connections.insert(session_id.to_owned(), handle);
        if replaced.is_some() {
            log::warn!("Session {} rebound, previous connection orphaned", session_id);
        }
        replaced
    }

    /// Removes the binding only while it still points at `handle`, so a late
    /// disconnect of a replaced connection leaves the newer one alone.
    pub fn unbind(&self, session_id: &str, handle: &H) -> bool {
        self.connections
            .remove_if(session_id, |_, bound| bound.same_connection(handle))
            .is_some()
    }

    pub fn get(&self, session_id: &str) -> Option<H> {
        self.connections
            .get(session_id)
            .map(|entry| entry.value().clone())
    }

    pub fn is_bound(&self, session_id: &str) -> bool {
        self.connections.contains_key(session_id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn bound_tokens(&self) -> Vec<SessionId> {
        self.connections
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }
}

impl<H: ConnectionHandle> std::default::Default for ConnectionTable<H> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PushError;

    #[derive(Debug, Clone, PartialEq)]
    struct FakeHandle(u32);

    impl ConnectionHandle for FakeHandle {
        fn push(&self, _payload: String) -> Result<(), PushError> {
            Ok(())
        }

        fn same_connection(&self, other: &Self) -> bool {
            self == other
        }
    }

    #[test]
    fn it_should_replace_previous_binding() {
        let table = ConnectionTable::new();
        assert_eq!(table.bind("abc", FakeHandle(1)), None);
        assert_eq!(table.bind("abc", FakeHandle(2)), Some(FakeHandle(1)));

        assert_eq!(table.get("abc"), Some(FakeHandle(2)));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn it_should_ignore_stale_unbind() {
        let table = ConnectionTable::new();
        table.bind("abc", FakeHandle(1));
        table.bind("abc", FakeHandle(2));

        assert!(!table.unbind("abc", &FakeHandle(1)));
        assert_eq!(table.get("abc"), Some(FakeHandle(2)));

        assert!(table.unbind("abc", &FakeHandle(2)));
        assert_eq!(table.get("abc"), None);
    }

    #[test]
    fn it_should_unbind_idempotently() {
        let table = ConnectionTable::new();
        table.bind("abc", FakeHandle(1));

        assert!(table.unbind("abc", &FakeHandle(1)));
        assert!(!table.unbind("abc", &FakeHandle(1)));
        assert!(!table.unbind("missing", &FakeHandle(1)));
        assert!(table.is_empty());
    }

    #[test]
    fn it_should_keep_sessions_apart() {
        let table = ConnectionTable::new();
        table.bind("a", FakeHandle(1));
        table.bind("b", FakeHandle(2));
        table.unbind("a", &FakeHandle(1));

        assert!(!table.is_bound("a"));
        assert!(table.is_bound("b"));
        assert_eq!(table.bound_tokens(), vec!["b".to_owned()]);
    }
}
