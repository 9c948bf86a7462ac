use dashmap::DashSet;
use uuid::Uuid;

use crate::types::SessionId;

/// Every session token handed out so far. Sessions are never removed.
pub struct SessionRegistry {
    sessions: DashSet<SessionId>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashSet::new(),
        }
    }

    pub fn create(&self) -> SessionId {
        loop {
            let session_id = Uuid::new_v4().to_string();
            if self.sessions.insert(session_id.clone()) {
                log::info!("Session {} created", session_id);
                break session_id;
            }
        }
    }

    pub fn exists(&self, session_id: &str) -> bool {
        self.sessions.contains(session_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn tokens(&self) -> Vec<SessionId> {
        self.sessions.iter().map(|entry| entry.key().clone()).collect()
    }
}

impl std::default::Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_should_know_created_sessions() {
        let registry = SessionRegistry::new();
        let a = registry.create();
        let b = registry.create();

        assert_ne!(a, b);
        assert!(registry.exists(&a));
        assert!(registry.exists(&b));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn it_should_not_know_foreign_tokens() {
        let registry = SessionRegistry::new();
        registry.create();

        assert!(!registry.exists("abc"));
        assert!(!registry.exists(""));
    }

    #[test]
    fn it_should_list_tokens() {
        let registry = SessionRegistry::new();
        assert!(registry.is_empty());

        let session_id = registry.create();
        assert_eq!(registry.tokens(), vec![session_id]);
    }
}
