//! Caller identities, as supplied by the external credential provider.
//!
//! The coordinator trusts these without revalidating credentials itself.

use vouch_types::{StaffId, StaffRole};

/// An authenticated staff member.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StaffIdentity {
    pub id: StaffId,
    pub role: StaffRole,
}

impl StaffIdentity {
    pub fn agent(id: impl Into<String>) -> Self {
        Self {
            id: StaffId::new(id),
            role: StaffRole::Agent,
        }
    }

    pub fn admin(id: impl Into<String>) -> Self {
        Self {
            id: StaffId::new(id),
            role: StaffRole::Admin,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == StaffRole::Admin
    }
}

/// Who is driving a lifecycle transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Actor {
    Staff(StaffIdentity),
    /// The person being verified (unauthenticated, link-holder).
    Requester,
    /// Internal triggers: the expiry reaper, the first-join hook.
    System,
}

impl Actor {
    pub fn staff(&self) -> Option<&StaffIdentity> {
        match self {
            Actor::Staff(identity) => Some(identity),
            _ => None,
        }
    }
}
