//! The JSON wire protocol spoken over the signaling WebSocket.
//!
//! Negotiation payloads are opaque [`serde_json::Value`]s: the relay never
//! parses, validates, or persists them.

use serde::{Deserialize, Serialize};

use vouch_types::{ConnectionId, PeerRole};

/// Kind of a relayed negotiation message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Offer,
    Answer,
    Candidate,
}

/// Messages a client may send.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Join the room named by the session token.
    Join { token: String, role: PeerRole },
    /// Leave the current room without closing the socket.
    Leave,
    /// Relay a negotiation payload: unicast when `target` is set,
    /// broadcast to the rest of the room otherwise.
    Signal {
        kind: SignalKind,
        payload: serde_json::Value,
        #[serde(default)]
        target: Option<ConnectionId>,
    },
    /// The requester ends the call; the session expires.
    EndCall,
    Ping,
}

/// A room member as seen by another client.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PeerInfo {
    pub connection_id: ConnectionId,
    pub role: PeerRole,
}

/// Messages the server sends.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Join accepted. `peers` lists the members already present, in join
    /// order; the new connection is the offerer toward each of them.
    Joined {
        connection_id: ConnectionId,
        peers: Vec<PeerInfo>,
    },
    /// Another member joined. `initiator` is always `false`: the newcomer
    /// initiates, the existing member waits for the inbound offer.
    PeerJoined {
        connection_id: ConnectionId,
        role: PeerRole,
        initiator: bool,
    },
    PeerLeft {
        connection_id: ConnectionId,
    },
    /// A relayed negotiation payload.
    Signal {
        kind: SignalKind,
        payload: serde_json::Value,
        from: ConnectionId,
    },
    /// The session is terminal (or its link expired): render a closed
    /// message, do not retry.
    SessionClosed {
        reason: String,
    },
    Error {
        code: String,
        message: String,
    },
    Pong,
}
