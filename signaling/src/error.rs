use thiserror::Error;

use vouch_types::ConnectionId;

#[derive(Debug, Error)]
pub enum SignalError {
    /// The session is terminal or the join link has expired. Surfaced to
    /// the client as an explicit `session_closed` frame, distinct from a
    /// generic disconnect.
    #[error("session closed: {reason}")]
    Closed { reason: String },

    #[error("unknown session: {0}")]
    UnknownSession(String),

    /// The sender is not a member of the room it is relaying into.
    #[error("connection is not a member of this room")]
    NotMember,

    /// The named relay target is no longer present in the room.
    #[error("relay target {0} is not present")]
    Unreachable(ConnectionId),

    #[error("server error: {0}")]
    Server(String),
}
