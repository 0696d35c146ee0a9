//! The room registry: who is present in which session's room.
//!
//! Owned exclusively by this module — no other component iterates or
//! mutates the table. The outer map lock is held only to look up or insert
//! a room slot; membership mutation happens under the per-room mutex, so
//! unrelated sessions never serialize against each other.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex, RwLock};

use vouch_store::{SessionRecord, SessionStore};
use vouch_types::{ConnectionId, PeerRole, SessionToken, Timestamp};

use crate::error::SignalError;
use crate::protocol::{PeerInfo, ServerFrame, SignalKind};

/// One member's presence: role plus the handle used to push frames to it.
struct Member {
    role: PeerRole,
    tx: mpsc::UnboundedSender<ServerFrame>,
}

/// Ephemeral state of one session's room. Members are kept in join order;
/// that order is what `peer_joined` delivery and the `peers` list follow.
struct Room {
    members: Vec<(ConnectionId, Member)>,
}

impl Room {
    fn member_index(&self, id: ConnectionId) -> Option<usize> {
        self.members.iter().position(|(mid, _)| *mid == id)
    }

    fn peer_infos(&self) -> Vec<PeerInfo> {
        self.members
            .iter()
            .map(|(id, m)| PeerInfo {
                connection_id: *id,
                role: m.role,
            })
            .collect()
    }
}

/// Outcome of removing a connection from a room.
#[derive(Debug, PartialEq, Eq)]
pub struct LeaveOutcome {
    pub was_member: bool,
    /// The removal emptied the room (which has been deleted).
    pub emptied: bool,
}

/// Authorize a join against the store.
///
/// The record is read fresh, never cached: a session can reach a terminal
/// status between the client loading its page and opening the socket, and
/// this boundary must catch that independently of the HTTP one. The link
/// expiry is checked regardless of status.
pub fn authorize_join(
    store: &dyn SessionStore,
    raw_token: &str,
    now: Timestamp,
) -> Result<SessionRecord, SignalError> {
    let token = SessionToken::parse(raw_token)
        .ok_or_else(|| SignalError::UnknownSession(raw_token.to_string()))?;
    let record = match store.get(&token) {
        Ok(record) => record,
        Err(vouch_store::StoreError::NotFound(_)) => {
            return Err(SignalError::UnknownSession(raw_token.to_string()));
        }
        Err(e) => return Err(SignalError::Server(e.to_string())),
    };

    if record.status.is_terminal() {
        return Err(SignalError::Closed {
            reason: format!("this session has expired or been closed ({})", record.status),
        });
    }
    if record.link_expires_at.is_past(now) {
        return Err(SignalError::Closed {
            reason: "the join link for this session has expired".into(),
        });
    }
    Ok(record)
}

/// Concurrency-safe keyed map of open rooms.
pub struct RoomRegistry {
    rooms: RwLock<HashMap<SessionToken, Arc<Mutex<Room>>>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
        }
    }

    /// Record `conn` as a member of `token`'s room, creating the room on
    /// first join.
    ///
    /// Returns the members that were already present (the newcomer's offer
    /// targets); each of them is sent a `peer_joined` notification with
    /// `initiator: false` so only the newcomer initiates — the deterministic
    /// answer to the dual-offer race.
    pub async fn join(
        &self,
        token: &SessionToken,
        conn: ConnectionId,
        role: PeerRole,
        tx: mpsc::UnboundedSender<ServerFrame>,
    ) -> Vec<PeerInfo> {
        let room = {
            let mut rooms = self.rooms.write().await;
            rooms
                .entry(token.clone())
                .or_insert_with(|| Arc::new(Mutex::new(Room { members: Vec::new() })))
                .clone()
        };

        let mut room = room.lock().await;
        let existing = room.peer_infos();
        for (_, member) in &room.members {
            let _ = member.tx.send(ServerFrame::PeerJoined {
                connection_id: conn,
                role,
                initiator: false,
            });
        }
        room.members.push((conn, Member { role, tx }));
        existing
    }

    /// Remove `conn` from `token`'s room, notifying the remaining members.
    /// Deletes the room when it empties. Safe to call twice: the second
    /// call reports `was_member: false` and changes nothing.
    pub async fn leave(&self, token: &SessionToken, conn: ConnectionId) -> LeaveOutcome {
        let room = {
            let rooms = self.rooms.read().await;
            rooms.get(token).cloned()
        };
        let Some(room) = room else {
            return LeaveOutcome {
                was_member: false,
                emptied: false,
            };
        };

        let emptied = {
            let mut room = room.lock().await;
            let Some(index) = room.member_index(conn) else {
                return LeaveOutcome {
                    was_member: false,
                    emptied: false,
                };
            };
            room.members.remove(index);
            for (_, member) in &room.members {
                let _ = member.tx.send(ServerFrame::PeerLeft {
                    connection_id: conn,
                });
            }
            room.members.is_empty()
        };

        if emptied {
            let mut rooms = self.rooms.write().await;
            // Re-check under the write lock: a new member may have joined
            // between dropping the room lock and taking the map lock.
            let still_empty = match rooms.get(token).cloned() {
                Some(slot) => slot.lock().await.members.is_empty(),
                None => false,
            };
            if still_empty {
                rooms.remove(token);
            } else {
                return LeaveOutcome {
                    was_member: true,
                    emptied: false,
                };
            }
        }

        LeaveOutcome {
            was_member: true,
            emptied,
        }
    }

    /// Forward a negotiation payload.
    ///
    /// The sender must currently be a member of `token`'s room. With a
    /// target, the frame goes to that member only — or is dropped with
    /// [`SignalError::Unreachable`] if it has gone. Without a target, it is
    /// broadcast to every other member. At-most-once: nothing is queued or
    /// retried.
    pub async fn relay(
        &self,
        token: &SessionToken,
        from: ConnectionId,
        kind: SignalKind,
        payload: serde_json::Value,
        target: Option<ConnectionId>,
    ) -> Result<usize, SignalError> {
        let room = {
            let rooms = self.rooms.read().await;
            rooms.get(token).cloned()
        };
        let Some(room) = room else {
            return Err(SignalError::NotMember);
        };

        let room = room.lock().await;
        if room.member_index(from).is_none() {
            return Err(SignalError::NotMember);
        }

        let frame = ServerFrame::Signal {
            kind,
            payload,
            from,
        };
        match target {
            Some(target_id) => {
                let Some(index) = room.member_index(target_id) else {
                    return Err(SignalError::Unreachable(target_id));
                };
                let _ = room.members[index].1.tx.send(frame);
                Ok(1)
            }
            None => {
                let mut delivered = 0;
                for (id, member) in &room.members {
                    if *id == from {
                        continue;
                    }
                    if member.tx.send(frame.clone()).is_ok() {
                        delivered += 1;
                    }
                }
                Ok(delivered)
            }
        }
    }

    /// Push a `session_closed` frame to every member and drop the room.
    /// Used when the requester ends the call.
    pub async fn close_room(&self, token: &SessionToken, reason: &str) {
        let room = {
            let mut rooms = self.rooms.write().await;
            rooms.remove(token)
        };
        if let Some(room) = room {
            let room = room.lock().await;
            for (_, member) in &room.members {
                let _ = member.tx.send(ServerFrame::SessionClosed {
                    reason: reason.to_string(),
                });
            }
        }
    }

    /// Number of open rooms.
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Total members across all open rooms.
    pub async fn connection_count(&self) -> usize {
        let rooms: Vec<_> = self.rooms.read().await.values().cloned().collect();
        let mut total = 0;
        for room in rooms {
            total += room.lock().await.members.len();
        }
        total
    }

    /// Whether `conn` is currently a member of `token`'s room.
    pub async fn is_member(&self, token: &SessionToken, conn: ConnectionId) -> bool {
        let room = {
            let rooms = self.rooms.read().await;
            rooms.get(token).cloned()
        };
        match room {
            Some(room) => room.lock().await.member_index(conn).is_some(),
            None => false,
        }
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}
