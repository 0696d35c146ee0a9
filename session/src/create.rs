//! Session creation: token, join link, link expiry, initial assignment.

use std::sync::Arc;

use vouch_store::{SessionRecord, SessionStore};
use vouch_types::{ContactInfo, SessionToken, StaffRole, Timestamp};

use crate::error::SessionError;
use crate::identity::StaffIdentity;
use crate::metrics::CoordMetrics;

/// Default join-link lifetime: 24 hours.
pub const DEFAULT_LINK_TTL_SECS: u64 = 24 * 3600;

pub struct SessionFactory {
    store: Arc<dyn SessionStore>,
    metrics: Arc<CoordMetrics>,
    /// Public base URL the join link is built from.
    base_url: String,
    link_ttl_secs: u64,
}

impl SessionFactory {
    pub fn new(
        store: Arc<dyn SessionStore>,
        metrics: Arc<CoordMetrics>,
        base_url: impl Into<String>,
        link_ttl_secs: u64,
    ) -> Self {
        Self {
            store,
            metrics,
            base_url: base_url.into(),
            link_ttl_secs,
        }
    }

    /// Create a fresh `not_started` session.
    ///
    /// An agent-created session is assigned to its creator; an admin-created
    /// session starts unclaimed, open for any agent to claim.
    pub fn create(
        &self,
        contact: ContactInfo,
        creator: &StaffIdentity,
        now: Timestamp,
    ) -> Result<SessionRecord, SessionError> {
        if contact.name.trim().is_empty() {
            return Err(SessionError::Validation(
                "requester name is required".into(),
            ));
        }

        let token = SessionToken::generate();
        let join_link = format!(
            "{}/join/{}",
            self.base_url.trim_end_matches('/'),
            token
        );
        let assignee = match creator.role {
            StaffRole::Agent => Some(creator.id.clone()),
            StaffRole::Admin => None,
        };
        let record = SessionRecord::new(
            token,
            contact,
            assignee,
            join_link,
            now.plus_secs(self.link_ttl_secs),
            now,
        );
        self.store.create(&record)?;
        self.metrics.sessions_created.inc();
        tracing::info!(token = %record.token, "session created");
        Ok(record)
    }
}
