//! Role enums for room occupants and staff identities.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The side of the call a real-time connection belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeerRole {
    /// A verification staff member's browser.
    Staff,
    /// The person being verified.
    Requester,
}

impl fmt::Display for PeerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeerRole::Staff => write!(f, "staff"),
            PeerRole::Requester => write!(f, "requester"),
        }
    }
}

/// Authorization role of a staff identity, as reported by the external
/// credential provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    /// Handles assigned sessions; sees open and own sessions only.
    Agent,
    /// Sees and may act on every session in any status.
    Admin,
}

impl StaffRole {
    /// Parse from the lowercase wire form used by the identity gateway.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "agent" => Some(Self::Agent),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for StaffRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaffRole::Agent => write!(f, "agent"),
            StaffRole::Admin => write!(f, "admin"),
        }
    }
}
