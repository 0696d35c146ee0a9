use thiserror::Error;

use vouch_types::{SessionStatus, StaffId};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session not found: {0}")]
    NotFound(String),

    #[error("duplicate session token: {0}")]
    Duplicate(String),

    /// A conditional update found a status outside its allowed `From` set.
    #[error("status precondition failed, session is {actual}")]
    StatusConflict { actual: SessionStatus },

    /// The claim compare-and-set lost the race to another staff member.
    #[error("assignee precondition failed, currently held by {current:?}")]
    AssigneeConflict { current: Option<StaffId> },

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}
