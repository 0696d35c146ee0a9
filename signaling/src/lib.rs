//! Real-time room presence and signaling relay.
//!
//! Clients open a WebSocket, join the room named by their session token,
//! and exchange opaque peer-negotiation payloads (offer/answer/candidate)
//! which the relay forwards verbatim — unicast to a named member or
//! broadcast to the rest of the room. Presence is ephemeral and process
//! local: a room exists exactly while it has members, and the reaper
//! expires the session when its room empties.

pub mod error;
pub mod protocol;
pub mod reaper;
pub mod rooms;
pub mod server;

pub use error::SignalError;
pub use protocol::{ClientFrame, PeerInfo, ServerFrame, SignalKind};
pub use reaper::ExpiryReaper;
pub use rooms::{authorize_join, RoomRegistry};
pub use server::{SignalServer, SignalState};
