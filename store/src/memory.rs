//! In-memory backend, used by unit tests and single-process development.
//!
//! Rows live behind per-token mutexes so conditional updates on different
//! sessions never serialize against each other; the outer map lock is held
//! only long enough to look up or insert a slot.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use vouch_types::{SessionToken, Timestamp};

use crate::{ConditionalUpdate, SessionFilter, SessionRecord, SessionStore, StoreError};

#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<SessionToken, Arc<Mutex<SessionRecord>>>>,
    /// join link → token, maintained alongside `sessions`.
    links: RwLock<HashMap<String, SessionToken>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, token: &SessionToken) -> Result<Arc<Mutex<SessionRecord>>, StoreError> {
        self.sessions
            .read()
            .expect("session map poisoned")
            .get(token)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(token.to_string()))
    }
}

impl SessionStore for MemorySessionStore {
    fn create(&self, record: &SessionRecord) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().expect("session map poisoned");
        if sessions.contains_key(&record.token) {
            return Err(StoreError::Duplicate(record.token.to_string()));
        }
        sessions.insert(
            record.token.clone(),
            Arc::new(Mutex::new(record.clone())),
        );
        self.links
            .write()
            .expect("link map poisoned")
            .insert(record.join_link.clone(), record.token.clone());
        Ok(())
    }

    fn get(&self, token: &SessionToken) -> Result<SessionRecord, StoreError> {
        let slot = self.slot(token)?;
        let record = slot.lock().expect("session row poisoned");
        Ok(record.clone())
    }

    fn get_by_link(&self, link: &str) -> Result<SessionRecord, StoreError> {
        let resolved = self
            .links
            .read()
            .expect("link map poisoned")
            .get(link)
            .cloned();
        match resolved {
            Some(token) => self.get(&token),
            // A bare token is accepted wherever a link is.
            None => match SessionToken::parse(link) {
                Some(token) => self.get(&token),
                None => Err(StoreError::NotFound(link.to_string())),
            },
        }
    }

    fn list(&self, filter: &SessionFilter) -> Result<Vec<SessionRecord>, StoreError> {
        let sessions = self.sessions.read().expect("session map poisoned");
        let mut out: Vec<SessionRecord> = sessions
            .values()
            .map(|slot| slot.lock().expect("session row poisoned").clone())
            .filter(|r| filter.matches(r.status, r.assignee.as_ref()))
            .collect();
        out.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.token.cmp(&b.token))
        });
        Ok(out)
    }

    fn update_conditional(
        &self,
        token: &SessionToken,
        update: ConditionalUpdate<'_>,
    ) -> Result<SessionRecord, StoreError> {
        let slot = self.slot(token)?;
        let mut record = slot.lock().expect("session row poisoned");
        // Work on a copy so a refused update leaves the row untouched.
        let mut working = record.clone();
        update(&mut working)?;
        *record = working.clone();
        Ok(working)
    }

    fn session_count(&self) -> Result<u64, StoreError> {
        Ok(self.sessions.read().expect("session map poisoned").len() as u64)
    }
}

/// Test helper: a record with the given token string and defaults everywhere
/// else, created at `created_secs`.
pub fn test_record(token: &SessionToken, created_secs: u64) -> SessionRecord {
    SessionRecord::new(
        token.clone(),
        vouch_types::ContactInfo::new("test requester"),
        None,
        format!("http://localhost:3005/join/{token}"),
        Timestamp::new(created_secs + 24 * 3600),
        Timestamp::new(created_secs),
    )
}
