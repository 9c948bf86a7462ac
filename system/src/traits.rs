use crate::error::PushError;

/// Send side of one live viewer connection.
///
/// Implementations must never block: a connection that cannot take the payload
/// right now reports `PushError::Full`, one whose remote end is gone reports
/// `PushError::Closed`.
pub trait ConnectionHandle: Clone + Send + Sync {
    fn push(&self, payload: String) -> Result<(), PushError>;

    /// Whether both handles feed the same underlying connection.
    fn same_connection(&self, other: &Self) -> bool;
}
