use std::sync::Arc;

use system::{ConnectionTable, Dispatcher, SessionRegistry};

use crate::config::Settings;
use crate::connection::ConnectionTx;

/// Process-wide state, created once in `main` and shared through `web::Data`.
pub struct ServerState {
    pub sessions: Arc<SessionRegistry>,
    pub connections: Arc<ConnectionTable<ConnectionTx>>,
    pub dispatcher: Dispatcher<ConnectionTx>,
    pub settings: Settings,
}

impl ServerState {
    pub fn new(settings: Settings) -> Self {
        let sessions = Arc::new(SessionRegistry::new());
        let connections = Arc::new(ConnectionTable::new());
        let dispatcher = Dispatcher::new(sessions.clone(), connections.clone());
        Self {
            sessions,
            connections,
            dispatcher,
            settings,
        }
    }

    /// Link a human opens to attach a map page to `session_id`.
    pub fn viewer_url(&self, session_id: &str) -> String {
        let mut url = format!("{}?sessionid={}", self.settings.viewer_base_url, session_id);
        if let Some(keys) = &self.settings.map_keys {
            url.push_str(&format!(
                "&apikey={}&securitycode={}",
                keys.api_key, keys.security_code
            ));
        }
        url
    }
}
