//! Fundamental types for the vouch coordination service.
//!
//! This crate defines the core types shared across every other crate in the
//! workspace: session tokens, staff and connection identifiers, roles,
//! session statuses, timestamps, and requester contact details.

pub mod contact;
pub mod ids;
pub mod role;
pub mod status;
pub mod time;
pub mod token;

pub use contact::ContactInfo;
pub use ids::{ConnectionId, StaffId};
pub use role::{PeerRole, StaffRole};
pub use status::SessionStatus;
pub use time::Timestamp;
pub use token::SessionToken;
