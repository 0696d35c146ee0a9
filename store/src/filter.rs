//! Listing filters.

use vouch_types::{SessionStatus, StaffId};

/// Criteria for [`SessionStore::list`](crate::SessionStore::list).
///
/// An empty filter matches everything (the administrator view). The agent
/// view sets both fields: non-terminal statuses, visible to that agent.
#[derive(Clone, Debug, Default)]
pub struct SessionFilter {
    /// Only these statuses; `None` = all statuses.
    pub statuses: Option<Vec<SessionStatus>>,
    /// Only sessions that are unassigned or assigned to this staff member;
    /// `None` = no assignee restriction.
    pub visible_to: Option<StaffId>,
}

impl SessionFilter {
    pub fn matches(&self, status: SessionStatus, assignee: Option<&StaffId>) -> bool {
        if let Some(statuses) = &self.statuses {
            if !statuses.contains(&status) {
                return false;
            }
        }
        if let Some(me) = &self.visible_to {
            if let Some(holder) = assignee {
                if holder != me {
                    return false;
                }
            }
        }
        true
    }
}
