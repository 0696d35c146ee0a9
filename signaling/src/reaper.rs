//! Retires sessions whose room has emptied.
//!
//! Runs synchronously inside the leave handler. The transition is guarded
//! by the lifecycle table's non-terminal `From` rule, so a room emptying
//! after the session already completed is a quiet no-op rather than an
//! error, and a disconnect handler firing twice expires the session once.

use std::sync::Arc;

use vouch_session::{Actor, CoordMetrics, ExpiryCause, LifecycleEngine, SessionError, Transition};
use vouch_types::{SessionToken, Timestamp};

pub struct ExpiryReaper {
    engine: Arc<LifecycleEngine>,
    metrics: Arc<CoordMetrics>,
}

impl ExpiryReaper {
    pub fn new(engine: Arc<LifecycleEngine>, metrics: Arc<CoordMetrics>) -> Self {
        Self { engine, metrics }
    }

    /// Drive the session to `expired` because its room emptied.
    pub fn room_emptied(&self, token: &SessionToken, now: Timestamp) {
        self.expire(token, ExpiryCause::RoomEmptied, now);
    }

    /// Drive the session to `expired` because the requester ended the call.
    pub fn requester_ended(&self, token: &SessionToken, now: Timestamp) {
        self.expire(token, ExpiryCause::RequesterEnded, now);
    }

    fn expire(&self, token: &SessionToken, cause: ExpiryCause, now: Timestamp) {
        let result = self.engine.apply(
            token,
            &Transition::Expire { cause },
            &Actor::System,
            now,
        );
        match result {
            Ok(_) => {
                self.metrics.sessions_reaped.inc();
                tracing::info!(token = %token, ?cause, "session expired");
            }
            // Already terminal: the room outlived the session, nothing to do.
            Err(SessionError::Closed { status }) => {
                tracing::debug!(token = %token, %status, "room emptied on closed session");
            }
            Err(e) => {
                tracing::warn!(token = %token, error = %e, "failed to expire session");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vouch_store::memory::{test_record, MemorySessionStore};
    use vouch_store::SessionStore;
    use vouch_types::SessionStatus;

    fn reaper() -> (Arc<MemorySessionStore>, ExpiryReaper) {
        let store = Arc::new(MemorySessionStore::new());
        let metrics = Arc::new(CoordMetrics::new());
        let engine = Arc::new(LifecycleEngine::new(store.clone(), metrics.clone()));
        (store, ExpiryReaper::new(engine, metrics))
    }

    #[test]
    fn expires_pending_session_exactly_once() {
        let (store, reaper) = reaper();
        let token = SessionToken::generate();
        store.create(&test_record(&token, 100)).unwrap();

        reaper.room_emptied(&token, Timestamp::new(200));
        let record = store.get(&token).unwrap();
        assert_eq!(record.status, SessionStatus::Expired);
        assert_eq!(record.completed_at, Some(Timestamp::new(200)));

        // Duplicate disconnect: no error, no second side effect.
        reaper.room_emptied(&token, Timestamp::new(300));
        let record = store.get(&token).unwrap();
        assert_eq!(record.completed_at, Some(Timestamp::new(200)));
    }

    #[test]
    fn no_op_on_completed_session() {
        let (store, reaper) = reaper();
        let token = SessionToken::generate();
        store.create(&test_record(&token, 100)).unwrap();
        store
            .update_conditional(&token, &|record| {
                record.status = SessionStatus::Completed;
                Ok(())
            })
            .unwrap();

        reaper.room_emptied(&token, Timestamp::new(200));
        assert_eq!(store.get(&token).unwrap().status, SessionStatus::Completed);
    }
}
