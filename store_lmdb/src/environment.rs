//! LMDB environment and the [`SessionStore`] implementation over it.
//!
//! [`SessionStore`]: vouch_store::SessionStore

use std::path::Path;
use std::sync::Arc;

use heed::types::{Bytes, Str};
use heed::{Database, Env, EnvOpenOptions};

use vouch_store::{
    ConditionalUpdate, SessionFilter, SessionRecord, SessionStore, StoreError,
};
use vouch_types::SessionToken;

use crate::LmdbError;

/// Default map size: 256 MiB is generous for session rows.
pub const DEFAULT_MAP_SIZE: usize = 256 * 1024 * 1024;

/// LMDB-backed session store.
pub struct LmdbSessionStore {
    env: Arc<Env>,
    /// token bytes → bincode-encoded [`SessionRecord`].
    sessions_db: Database<Bytes, Bytes>,
    /// join link → token string.
    links_db: Database<Str, Str>,
}

impl LmdbSessionStore {
    /// Open or create the store at `path`.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path).map_err(|e| LmdbError::Io(e.to_string()))?;

        // Safety: one environment per path per process; the daemon opens the
        // data directory exactly once at startup.
        let env = unsafe {
            EnvOpenOptions::new()
                .max_dbs(2)
                .map_size(map_size)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let sessions_db = env.create_database(&mut wtxn, Some("sessions"))?;
        let links_db = env.create_database(&mut wtxn, Some("links"))?;
        wtxn.commit()?;

        Ok(Self {
            env: Arc::new(env),
            sessions_db,
            links_db,
        })
    }

    fn read_record(
        &self,
        rtxn: &heed::RoTxn<'_>,
        token: &SessionToken,
    ) -> Result<SessionRecord, StoreError> {
        let bytes = self
            .sessions_db
            .get(rtxn, token.as_str().as_bytes())
            .map_err(LmdbError::from)?
            .ok_or_else(|| StoreError::NotFound(token.to_string()))?;
        bincode::deserialize(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
    }
}

impl SessionStore for LmdbSessionStore {
    fn create(&self, record: &SessionRecord) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let key = record.token.as_str().as_bytes();

        let existing = self
            .sessions_db
            .get(&wtxn, key)
            .map_err(LmdbError::from)?;
        if existing.is_some() {
            return Err(StoreError::Duplicate(record.token.to_string()));
        }

        let bytes = bincode::serialize(record).map_err(LmdbError::from)?;
        self.sessions_db
            .put(&mut wtxn, key, &bytes)
            .map_err(LmdbError::from)?;
        self.links_db
            .put(&mut wtxn, &record.join_link, record.token.as_str())
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get(&self, token: &SessionToken) -> Result<SessionRecord, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        self.read_record(&rtxn, token)
    }

    fn get_by_link(&self, link: &str) -> Result<SessionRecord, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let token_str = self
            .links_db
            .get(&rtxn, link)
            .map_err(LmdbError::from)?
            .map(str::to_owned);
        let token = match token_str {
            Some(s) => SessionToken::parse(&s)
                .ok_or_else(|| StoreError::Serialization(format!("bad token in link index: {s}")))?,
            // A bare token is accepted wherever a link is.
            None => SessionToken::parse(link)
                .ok_or_else(|| StoreError::NotFound(link.to_string()))?,
        };
        self.read_record(&rtxn, &token)
    }

    fn list(&self, filter: &SessionFilter) -> Result<Vec<SessionRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let iter = self.sessions_db.iter(&rtxn).map_err(LmdbError::from)?;

        let mut out = Vec::new();
        for entry in iter {
            let (_key, bytes) = entry.map_err(LmdbError::from)?;
            let record: SessionRecord = bincode::deserialize(bytes)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            if filter.matches(record.status, record.assignee.as_ref()) {
                out.push(record);
            }
        }
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
        // The write transaction holds LMDB's writer slot for the whole
        // read-check-mutate-write, which is what makes the operation a true
        // compare-and-set under concurrent submission.
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let key = token.as_str().as_bytes();

        let bytes = self
            .sessions_db
            .get(&wtxn, key)
            .map_err(LmdbError::from)?
            .ok_or_else(|| StoreError::NotFound(token.to_string()))?;
        let mut record: SessionRecord = bincode::deserialize(bytes)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        update(&mut record)?;

        let encoded = bincode::serialize(&record).map_err(LmdbError::from)?;
        self.sessions_db
            .put(&mut wtxn, key, &encoded)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(record)
    }

    fn session_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let count = self.sessions_db.len(&rtxn).map_err(LmdbError::from)?;
        Ok(count)
    }
}
