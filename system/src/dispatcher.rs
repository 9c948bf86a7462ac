use std::sync::Arc;

use serde_json::Value;

use crate::connection_table::ConnectionTable;
use crate::error::{DispatchError, PushError};
use crate::message::{NavType, NavigationCommand, NavigationPoint, ServerMessage};
use crate::session_registry::SessionRegistry;
use crate::traits::ConnectionHandle;
use crate::types::{Policy, MIN_POINTS};

#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub delivered: bool,
    pub command: NavigationCommand,
    pub summary: String,
}

/// Validates navigation requests and pushes them to whichever viewer is
/// attached to the session at that moment. One attempt, no queue.
pub struct Dispatcher<H> {
    sessions: Arc<SessionRegistry>,
    connections: Arc<ConnectionTable<H>>,
}

impl<H: ConnectionHandle> Dispatcher<H> {
    pub fn new(sessions: Arc<SessionRegistry>, connections: Arc<ConnectionTable<H>>) -> Self {
        Self {
            sessions,
            connections,
        }
    }

    pub fn dispatch(
        &self,
        session_id: &str,
        raw_points: &[Value],
        policy: Policy,
        nav_type: &str,
    ) -> Result<DispatchOutcome, DispatchError> {
        if !self.sessions.exists(session_id) {
            return Err(DispatchError::UnknownSession(session_id.to_owned()));
        }
        let nav_type = nav_type.parse::<NavType>()?;
        if raw_points.len() < MIN_POINTS {
            return Err(DispatchError::TooFewPoints(raw_points.len()));
        }
        let points = raw_points
            .iter()
            .enumerate()
            .map(|(i, raw)| {
                NavigationPoint::from_raw(raw)
                    .map_err(|reason| DispatchError::MalformedPoint { index: i + 1, reason })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let command = NavigationCommand::new(points, policy, nav_type)?;
        let delivery = self.deliver(session_id, &command);
        let summary = match delivery {
            Delivery::Delivered => format!(
                "Navigation command sent to session {}\n{}",
                session_id,
                command.describe()
            ),
            undelivered => format!(
                "Navigation command for session {} was not delivered: {}\n{}",
                session_id,
                undelivered.reason(),
                command.describe()
            ),
        };

        Ok(DispatchOutcome {
            delivered: delivery == Delivery::Delivered,
            command,
            summary,
        })
    }

    fn deliver(&self, session_id: &str, command: &NavigationCommand) -> Delivery {
        let handle = match self.connections.get(session_id) {
            Some(handle) => handle,
            None => {
                log::info!("No connection for session {}, command dropped", session_id);
                return Delivery::NoConnection;
            }
        };

        let payload = match serde_json::to_string(&ServerMessage::Navigation { command }) {
            Ok(payload) => payload,
            Err(err) => {
                log::error!("Failed to serialize navigation command: {}", err);
                return Delivery::Unencodable;
            }
        };
        log::debug!("Egress to session {}: {}", session_id, payload);

        match handle.push(payload) {
            Ok(()) => {
                log::info!(
                    "Navigation ({}, {} points) delivered to session {}",
                    command.nav_type(),
                    command.points().len(),
                    session_id
                );
                Delivery::Delivered
            }
            Err(PushError::Closed) => {
                log::warn!(
                    "Connection of session {} is closed, removing it",
                    session_id
                );
                self.connections.unbind(session_id, &handle);
                Delivery::Closed
            }
            Err(PushError::Full) => {
                log::warn!(
                    "Connection of session {} is not draining, command dropped",
                    session_id
                );
                Delivery::Backlogged
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {
    Delivered,
    NoConnection,
    Closed,
    Backlogged,
    Unencodable,
}

impl Delivery {
    fn reason(self) -> &'static str {
        match self {
            Delivery::Delivered => "delivered",
            Delivery::NoConnection => {
                "no map page is connected. \
                 Open the map page for this session and send the command again."
            }
            Delivery::Closed => {
                "the map page disconnected. \
                 Reopen the map page for this session and send the command again."
            }
            Delivery::Backlogged => {
                "the map page is connected but not keeping up with commands. \
                 Wait a moment and send the command again."
            }
            Delivery::Unencodable => "the command could not be encoded.",
        }
    }
}
