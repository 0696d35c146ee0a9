//! Session lifecycle states.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The lifecycle state of a verification session.
///
/// The happy path runs `NotStarted → Pending → InProgress → PendingReview →
/// Completed`; `Rejected` ends a failed review, and `Expired` / `Cancelled`
/// are side exits reachable from any non-terminal state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Created, nobody has joined the call yet.
    NotStarted,
    /// At least one participant has joined the room.
    Pending,
    /// Staff has explicitly started the verification.
    InProgress,
    /// Evidence captured, awaiting staff review.
    PendingReview,
    /// Verification approved.
    Completed,
    /// Verification rejected.
    Rejected,
    /// Abandoned: the room emptied or the requester ended the call.
    Expired,
    /// Withdrawn by staff or admin.
    Cancelled,
}

impl SessionStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [SessionStatus; 8] = [
        SessionStatus::NotStarted,
        SessionStatus::Pending,
        SessionStatus::InProgress,
        SessionStatus::PendingReview,
        SessionStatus::Completed,
        SessionStatus::Rejected,
        SessionStatus::Expired,
        SessionStatus::Cancelled,
    ];

    /// The non-terminal statuses (valid `From` set for side-exit transitions).
    pub const NON_TERMINAL: [SessionStatus; 4] = [
        SessionStatus::NotStarted,
        SessionStatus::Pending,
        SessionStatus::InProgress,
        SessionStatus::PendingReview,
    ];

    /// Whether this status permits no further transitions, claims, or joins.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionStatus::Completed
                | SessionStatus::Rejected
                | SessionStatus::Expired
                | SessionStatus::Cancelled
        )
    }

    /// The lowercase wire form (matches the serde representation).
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::NotStarted => "not_started",
            SessionStatus::Pending => "pending",
            SessionStatus::InProgress => "in_progress",
            SessionStatus::PendingReview => "pending_review",
            SessionStatus::Completed => "completed",
            SessionStatus::Rejected => "rejected",
            SessionStatus::Expired => "expired",
            SessionStatus::Cancelled => "cancelled",
        }
    }

    /// Parse from the lowercase wire form.
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == raw)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
