//! Abstract session storage for the vouch coordinator.
//!
//! Every storage backend (LMDB, in-memory for testing) implements the
//! [`SessionStore`] trait. The rest of the codebase depends only on the
//! trait.
//!
//! The central primitive is [`SessionStore::update_conditional`]: a
//! read-check-mutate-write executed atomically per token, so that
//! concurrent writers racing on the same session resolve to exactly one
//! winner. Both the claim compare-and-set and every lifecycle transition
//! are expressed through it; nothing else in the system writes session
//! fields directly.

pub mod error;
pub mod filter;
pub mod memory;
pub mod record;

pub use error::StoreError;
pub use filter::SessionFilter;
pub use memory::MemorySessionStore;
pub use record::{SessionArtifacts, SessionRecord};

use vouch_types::{SessionStatus, SessionToken, StaffId};

/// A conditional mutation run atomically against one session row.
///
/// The closure may inspect the current record and either mutate it in place
/// (returning `Ok`) or refuse with a typed [`StoreError`], in which case the
/// record is left untouched.
pub type ConditionalUpdate<'a> = &'a dyn Fn(&mut SessionRecord) -> Result<(), StoreError>;

/// Durable storage of session records, keyed by token.
///
/// All mutations are atomic single-row operations; implementations must
/// serialize conflicting [`update_conditional`](Self::update_conditional)
/// calls on the same token.
pub trait SessionStore: Send + Sync {
    /// Insert a new record. Fails with [`StoreError::Duplicate`] if the
    /// token is already present.
    fn create(&self, record: &SessionRecord) -> Result<(), StoreError>;

    /// Fetch a record by token.
    fn get(&self, token: &SessionToken) -> Result<SessionRecord, StoreError>;

    /// Resolve a join link (or a bare token string) to its record.
    fn get_by_link(&self, link: &str) -> Result<SessionRecord, StoreError>;

    /// List records matching `filter`, newest first.
    fn list(&self, filter: &SessionFilter) -> Result<Vec<SessionRecord>, StoreError>;

    /// Atomically check-and-mutate one record, returning the updated record.
    ///
    /// The closure's error is returned verbatim; the record is persisted
    /// only when the closure succeeds.
    fn update_conditional(
        &self,
        token: &SessionToken,
        update: ConditionalUpdate<'_>,
    ) -> Result<SessionRecord, StoreError>;

    /// Number of stored sessions.
    fn session_count(&self) -> Result<u64, StoreError>;

    /// The claim compare-and-set: bind `new_assignee` iff the current
    /// assignee matches `expected` (or already is `new_assignee`) and the
    /// session is not in a terminal status.
    ///
    /// Under simultaneous submission exactly one caller wins; losers get
    /// [`StoreError::AssigneeConflict`] carrying the current holder.
    fn compare_and_set_assignee(
        &self,
        token: &SessionToken,
        expected: Option<&StaffId>,
        new_assignee: &StaffId,
        new_status: Option<SessionStatus>,
    ) -> Result<SessionRecord, StoreError> {
        let new_assignee = new_assignee.clone();
        self.update_conditional(token, &|record| {
            if record.status.is_terminal() {
                return Err(StoreError::StatusConflict {
                    actual: record.status,
                });
            }
            let matches = match (&record.assignee, expected) {
                (current, Some(exp)) => current.as_ref() == Some(exp),
                (None, None) => true,
                (Some(current), None) => *current == new_assignee,
            };
            if !matches {
                return Err(StoreError::AssigneeConflict {
                    current: record.assignee.clone(),
                });
            }
            record.assignee = Some(new_assignee.clone());
            if let Some(status) = new_status {
                record.status = status;
            }
            Ok(())
        })
    }
}
