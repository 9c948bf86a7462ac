use thiserror::Error;

use crate::types::{SessionId, MIN_POINTS};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    #[error("invalid session id: {0}")]
    UnknownSession(SessionId),
    #[error("invalid navigation type: {0}, supported types: driving, riding, walking")]
    InvalidNavType(String),
    #[error("at least {min} points are required (start and destination), got {0}", min = MIN_POINTS)]
    TooFewPoints(usize),
    /// `index` is 1-based.
    #[error("point {index} is malformed: {reason}")]
    MalformedPoint { index: usize, reason: PointError },
}

impl DispatchError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownSession(_) => "unknown_session",
            Self::InvalidNavType(_) => "invalid_nav_type",
            Self::TooFewPoints(_) => "too_few_points",
            Self::MalformedPoint { .. } => "malformed_point",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PointError {
    #[error("must contain either lng/lat coordinates or a keyword")]
    MissingLocation,
    #[error("a keyword point must also name its city")]
    MissingCity,
    #[error("{0}")]
    InvalidShape(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PushError {
    #[error("connection is closed")]
    Closed,
    #[error("connection buffer is full")]
    Full,
}
