//! The claim arbiter.
//!
//! Two staff list views can show the same open session; only the first
//! compare-and-set commits. The loser receives a structured
//! [`SessionError::AlreadyClaimed`] and is expected to re-fetch, not retry.

use std::sync::Arc;

use vouch_store::{SessionFilter, SessionRecord, SessionStore};
use vouch_types::{SessionStatus, SessionToken, StaffRole};

use crate::error::SessionError;
use crate::identity::StaffIdentity;
use crate::metrics::CoordMetrics;

pub struct ClaimArbiter {
    store: Arc<dyn SessionStore>,
    metrics: Arc<CoordMetrics>,
}

impl ClaimArbiter {
    pub fn new(store: Arc<dyn SessionStore>, metrics: Arc<CoordMetrics>) -> Self {
        Self { store, metrics }
    }

    /// Bind the session to `staff`, iff it is unclaimed (or already theirs)
    /// and not terminal. One CAS; no retry loop.
    pub fn claim(
        &self,
        token: &SessionToken,
        staff: &StaffIdentity,
    ) -> Result<SessionRecord, SessionError> {
        let result = self
            .store
            .compare_and_set_assignee(token, None, &staff.id, None);
        match result {
            Ok(record) => {
                self.metrics.claims_won.inc();
                tracing::info!(token = %token, staff = %staff.id, "session claimed");
                Ok(record)
            }
            Err(e) => {
                let mapped = SessionError::from(e);
                if matches!(mapped, SessionError::AlreadyClaimed { .. }) {
                    self.metrics.claims_lost.inc();
                    tracing::debug!(token = %token, staff = %staff.id, "claim lost the race");
                }
                Err(mapped)
            }
        }
    }

    /// The read-side visibility policy: agents see unassigned-or-own
    /// sessions in non-terminal statuses; admins see everything.
    pub fn list_for(
        &self,
        identity: &StaffIdentity,
        status: Option<SessionStatus>,
    ) -> Result<Vec<SessionRecord>, SessionError> {
        let filter = visibility_filter(identity, status);
        Ok(self.store.list(&filter)?)
    }
}

/// Build the [`SessionFilter`] for one staff identity.
pub fn visibility_filter(
    identity: &StaffIdentity,
    status: Option<SessionStatus>,
) -> SessionFilter {
    match identity.role {
        StaffRole::Admin => SessionFilter {
            statuses: status.map(|s| vec![s]),
            visible_to: None,
        },
        StaffRole::Agent => {
            let statuses = match status {
                // Terminal statuses are invisible to agents even when asked for.
                Some(s) if s.is_terminal() => vec![],
                Some(s) => vec![s],
                None => SessionStatus::NON_TERMINAL.to_vec(),
            };
            SessionFilter {
                statuses: Some(statuses),
                visible_to: Some(identity.id.clone()),
            }
        }
    }
}
