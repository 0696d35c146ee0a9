//! Session error taxonomy.
//!
//! `AlreadyClaimed` and `StaleState` are expected-frequency outcomes of the
//! claim and transition races; they are plain values, not failures of the
//! caller's request pipeline.

use thiserror::Error;

use vouch_store::StoreError;
use vouch_types::{SessionStatus, StaffId};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session not found: {0}")]
    NotFound(String),

    /// The transition's expected `From` no longer matches the persisted
    /// status. The caller must re-read and decide; it is never auto-resolved.
    #[error("stale state: session is now {actual}")]
    StaleState { actual: SessionStatus },

    /// The claim compare-and-set lost the race.
    #[error("session already claimed by another staff member")]
    AlreadyClaimed { holder: Option<StaffId> },

    /// Operation attempted against a terminal-status session or an expired
    /// join link.
    #[error("session is closed ({status})")]
    Closed { status: SessionStatus },

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("invalid request: {0}")]
    Validation(String),

    /// Backend failure; the only variant that escalates to a fatal response.
    #[error("store error: {0}")]
    Store(String),
}

impl From<StoreError> for SessionError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(token) => SessionError::NotFound(token),
            StoreError::StatusConflict { actual } if actual.is_terminal() => {
                SessionError::Closed { status: actual }
            }
            StoreError::StatusConflict { actual } => SessionError::StaleState { actual },
            StoreError::AssigneeConflict { current } => {
                SessionError::AlreadyClaimed { holder: current }
            }
            other => SessionError::Store(other.to_string()),
        }
    }
}
