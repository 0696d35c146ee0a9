//! The session state machine.
//!
//! All status mutation in the system flows through [`LifecycleEngine::apply`]
//! so that the HTTP handlers and the real-time disconnect path share one
//! legality table and one set of side effects. Each application is a single
//! conditional update against the store: the `From` set is re-checked against
//! the persisted status inside the store's atomic section, so two staff
//! members issuing conflicting transitions from an outdated view resolve to
//! one winner and one [`SessionError::StaleState`].

use std::sync::Arc;

use vouch_store::{SessionRecord, SessionStore, StoreError};
use vouch_types::{SessionStatus, SessionToken, StaffRole, Timestamp};

use crate::error::SessionError;
use crate::identity::Actor;
use crate::metrics::CoordMetrics;

/// Why a session is being expired.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExpiryCause {
    /// The signaling room emptied out.
    RoomEmptied,
    /// The requester explicitly ended the call.
    RequesterEnded,
}

impl ExpiryCause {
    fn note(&self) -> &'static str {
        match self {
            ExpiryCause::RoomEmptied => "session expired: all participants disconnected",
            ExpiryCause::RequesterEnded => "call ended by requester, session expired",
        }
    }
}

/// A requested status transition, with its trigger-specific inputs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transition {
    /// First room join: `not_started → pending`.
    FirstJoin,
    /// Staff explicitly starts the verification.
    Start,
    /// Staff marks the session review-ready.
    MarkReview { note: Option<String> },
    /// Staff approves the verification.
    Approve,
    /// Staff rejects the verification; a non-empty reason is required.
    Reject { reason: String },
    /// Side exit driven by the reaper or the requester.
    Expire { cause: ExpiryCause },
    /// Side exit driven by staff or admin.
    Cancel,
}

impl Transition {
    /// The target status.
    pub fn to(&self) -> SessionStatus {
        match self {
            Transition::FirstJoin => SessionStatus::Pending,
            Transition::Start => SessionStatus::InProgress,
            Transition::MarkReview { .. } => SessionStatus::PendingReview,
            Transition::Approve => SessionStatus::Completed,
            Transition::Reject { .. } => SessionStatus::Rejected,
            Transition::Expire { .. } => SessionStatus::Expired,
            Transition::Cancel => SessionStatus::Cancelled,
        }
    }

    /// The legal `From` set. Any other current status is rejected.
    pub fn allowed_from(&self) -> &'static [SessionStatus] {
        match self {
            Transition::FirstJoin => &[SessionStatus::NotStarted],
            Transition::Start => &[SessionStatus::Pending, SessionStatus::InProgress],
            Transition::MarkReview { .. } => &SessionStatus::NON_TERMINAL,
            Transition::Approve | Transition::Reject { .. } => {
                &[SessionStatus::InProgress, SessionStatus::PendingReview]
            }
            Transition::Expire { .. } | Transition::Cancel => &SessionStatus::NON_TERMINAL,
        }
    }

    /// Whether this transition may only be issued by staff.
    fn staff_only(&self) -> bool {
        matches!(
            self,
            Transition::Start
                | Transition::MarkReview { .. }
                | Transition::Approve
                | Transition::Reject { .. }
                | Transition::Cancel
        )
    }
}

/// Applies transitions from the table above against the store.
pub struct LifecycleEngine {
    store: Arc<dyn SessionStore>,
    metrics: Arc<CoordMetrics>,
}

impl LifecycleEngine {
    pub fn new(store: Arc<dyn SessionStore>, metrics: Arc<CoordMetrics>) -> Self {
        Self { store, metrics }
    }

    /// Validate, authorize, and atomically apply `transition`.
    ///
    /// Illegal transitions are rejected, not silently ignored:
    /// a `From` mismatch yields [`SessionError::StaleState`] (or
    /// [`SessionError::Closed`] when the session is terminal), and the
    /// persisted record is left unchanged.
    pub fn apply(
        &self,
        token: &SessionToken,
        transition: &Transition,
        actor: &Actor,
        now: Timestamp,
    ) -> Result<SessionRecord, SessionError> {
        if let Transition::Reject { reason } = transition {
            if reason.trim().is_empty() {
                return Err(SessionError::Validation(
                    "a rejection reason is required".into(),
                ));
            }
        }
        if transition.staff_only() && actor.staff().is_none() {
            return Err(SessionError::Unauthorized(format!(
                "transition to {} requires a staff identity",
                transition.to()
            )));
        }

        let record = self.store.update_conditional(token, &|record| {
            if !transition.allowed_from().contains(&record.status) {
                return Err(StoreError::StatusConflict {
                    actual: record.status,
                });
            }
            apply_side_effects(record, transition, actor, now)?;
            record.status = transition.to();
            Ok(())
        })?;

        self.metrics.transitions_applied.inc();
        tracing::info!(
            token = %token,
            status = %record.status,
            "session transition applied"
        );
        Ok(record)
    }
}

/// Mutate `record` per the transition's side-effect column. Runs inside the
/// store's atomic section; any error aborts the whole update.
fn apply_side_effects(
    record: &mut SessionRecord,
    transition: &Transition,
    actor: &Actor,
    now: Timestamp,
) -> Result<(), StoreError> {
    match transition {
        Transition::FirstJoin => {}
        Transition::Start => {
            // Binding the assignee is part of the same atomic update, so a
            // second staff member starting from a stale list view loses here
            // rather than silently taking over the call.
            if let Some(staff) = actor.staff() {
                if staff.role == StaffRole::Agent {
                    match &record.assignee {
                        None => record.assignee = Some(staff.id.clone()),
                        Some(holder) if *holder == staff.id => {}
                        Some(holder) => {
                            return Err(StoreError::AssigneeConflict {
                                current: Some(holder.clone()),
                            });
                        }
                    }
                }
            }
            if record.started_at.is_none() {
                record.started_at = Some(now);
            }
        }
        Transition::MarkReview { note } => match note {
            Some(text) => record.append_note(text),
            None => record.append_note("evidence captured, awaiting review"),
        },
        Transition::Approve => {
            record.completed_at = Some(now);
        }
        Transition::Reject { reason } => {
            record.completed_at = Some(now);
            record.append_note(reason);
        }
        Transition::Expire { cause } => {
            record.completed_at = Some(now);
            record.append_note(cause.note());
        }
        Transition::Cancel => {
            record.completed_at = Some(now);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::StaffIdentity;
    use vouch_store::memory::{test_record, MemorySessionStore};

    fn engine() -> (Arc<MemorySessionStore>, LifecycleEngine) {
        let store = Arc::new(MemorySessionStore::new());
        let engine = LifecycleEngine::new(store.clone(), Arc::new(CoordMetrics::new()));
        (store, engine)
    }

    fn seeded(store: &MemorySessionStore) -> SessionToken {
        let token = SessionToken::generate();
        store.create(&test_record(&token, 100)).unwrap();
        token
    }

    #[test]
    fn first_join_moves_not_started_to_pending() {
        let (store, engine) = engine();
        let token = seeded(&store);
        let record = engine
            .apply(&token, &Transition::FirstJoin, &Actor::System, Timestamp::new(110))
            .unwrap();
        assert_eq!(record.status, SessionStatus::Pending);
    }

    #[test]
    fn first_join_twice_is_stale_not_closed() {
        let (store, engine) = engine();
        let token = seeded(&store);
        engine
            .apply(&token, &Transition::FirstJoin, &Actor::System, Timestamp::new(110))
            .unwrap();
        let err = engine
            .apply(&token, &Transition::FirstJoin, &Actor::System, Timestamp::new(111))
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::StaleState {
                actual: SessionStatus::Pending
            }
        ));
    }

    #[test]
    fn start_sets_started_at_once_and_binds_assignee() {
        let (store, engine) = engine();
        let token = seeded(&store);
        let alice = Actor::Staff(StaffIdentity::agent("alice"));
        engine
            .apply(&token, &Transition::FirstJoin, &Actor::System, Timestamp::new(110))
            .unwrap();

        let record = engine
            .apply(&token, &Transition::Start, &alice, Timestamp::new(120))
            .unwrap();
        assert_eq!(record.status, SessionStatus::InProgress);
        assert_eq!(record.started_at, Some(Timestamp::new(120)));
        assert_eq!(record.assignee.as_ref().unwrap().as_str(), "alice");

        // Re-start by the same agent: legal, started_at unchanged.
        let record = engine
            .apply(&token, &Transition::Start, &alice, Timestamp::new(130))
            .unwrap();
        assert_eq!(record.started_at, Some(Timestamp::new(120)));
    }

    #[test]
    fn start_by_second_agent_is_already_claimed() {
        let (store, engine) = engine();
        let token = seeded(&store);
        engine
            .apply(&token, &Transition::FirstJoin, &Actor::System, Timestamp::new(110))
            .unwrap();
        engine
            .apply(
                &token,
                &Transition::Start,
                &Actor::Staff(StaffIdentity::agent("alice")),
                Timestamp::new(120),
            )
            .unwrap();

        let err = engine
            .apply(
                &token,
                &Transition::Start,
                &Actor::Staff(StaffIdentity::agent("bob")),
                Timestamp::new(121),
            )
            .unwrap_err();
        assert!(matches!(err, SessionError::AlreadyClaimed { .. }));
        assert_eq!(
            store.get(&token).unwrap().assignee.unwrap().as_str(),
            "alice"
        );
    }

    #[test]
    fn reject_requires_a_reason() {
        let (store, engine) = engine();
        let token = seeded(&store);
        let staff = Actor::Staff(StaffIdentity::agent("alice"));
        engine
            .apply(&token, &Transition::FirstJoin, &Actor::System, Timestamp::new(110))
            .unwrap();
        engine
            .apply(&token, &Transition::Start, &staff, Timestamp::new(120))
            .unwrap();

        let err = engine
            .apply(
                &token,
                &Transition::Reject { reason: "  ".into() },
                &staff,
                Timestamp::new(130),
            )
            .unwrap_err();
        assert!(matches!(err, SessionError::Validation(_)));
        assert_eq!(store.get(&token).unwrap().status, SessionStatus::InProgress);

        let record = engine
            .apply(
                &token,
                &Transition::Reject {
                    reason: "document mismatch".into(),
                },
                &staff,
                Timestamp::new(131),
            )
            .unwrap();
        assert_eq!(record.status, SessionStatus::Rejected);
        assert_eq!(record.completed_at, Some(Timestamp::new(131)));
        assert!(record.notes.contains("document mismatch"));
    }

    #[test]
    fn staff_only_transitions_refuse_other_actors() {
        let (store, engine) = engine();
        let token = seeded(&store);
        for transition in [
            Transition::Start,
            Transition::MarkReview { note: None },
            Transition::Approve,
            Transition::Reject {
                reason: "bad".into(),
            },
            Transition::Cancel,
        ] {
            let err = engine
                .apply(&token, &transition, &Actor::Requester, Timestamp::new(110))
                .unwrap_err();
            assert!(matches!(err, SessionError::Unauthorized(_)), "{transition:?}");
        }
        assert_eq!(store.get(&token).unwrap().status, SessionStatus::NotStarted);
    }

    #[test]
    fn transitions_from_terminal_states_are_closed() {
        let (store, engine) = engine();
        let token = seeded(&store);
        let staff = Actor::Staff(StaffIdentity::agent("alice"));
        engine
            .apply(
                &token,
                &Transition::Expire {
                    cause: ExpiryCause::RoomEmptied,
                },
                &Actor::System,
                Timestamp::new(110),
            )
            .unwrap();

        for transition in [
            Transition::FirstJoin,
            Transition::Start,
            Transition::MarkReview { note: None },
            Transition::Approve,
            Transition::Reject {
                reason: "bad".into(),
            },
            Transition::Cancel,
            Transition::Expire {
                cause: ExpiryCause::RequesterEnded,
            },
        ] {
            let actor = if transition.staff_only() {
                staff.clone()
            } else {
                Actor::System
            };
            let err = engine
                .apply(&token, &transition, &actor, Timestamp::new(120))
                .unwrap_err();
            assert!(
                matches!(
                    err,
                    SessionError::Closed {
                        status: SessionStatus::Expired
                    }
                ),
                "{transition:?}"
            );
        }
        let record = store.get(&token).unwrap();
        assert_eq!(record.status, SessionStatus::Expired);
        assert_eq!(record.completed_at, Some(Timestamp::new(110)));
    }

    #[test]
    fn mark_review_appends_default_note_only_when_missing() {
        let (store, engine) = engine();
        let staff = Actor::Staff(StaffIdentity::agent("alice"));

        let token = seeded(&store);
        let record = engine
            .apply(
                &token,
                &Transition::MarkReview { note: None },
                &staff,
                Timestamp::new(110),
            )
            .unwrap();
        assert_eq!(record.notes, "evidence captured, awaiting review");

        let token2 = seeded(&store);
        let record = engine
            .apply(
                &token2,
                &Transition::MarkReview {
                    note: Some("both documents captured".into()),
                },
                &staff,
                Timestamp::new(110),
            )
            .unwrap();
        assert_eq!(record.notes, "both documents captured");
    }

    #[test]
    fn expire_appends_cause_note() {
        let (store, engine) = engine();
        let token = seeded(&store);
        let record = engine
            .apply(
                &token,
                &Transition::Expire {
                    cause: ExpiryCause::RequesterEnded,
                },
                &Actor::Requester,
                Timestamp::new(110),
            )
            .unwrap();
        assert_eq!(record.status, SessionStatus::Expired);
        assert!(record.notes.contains("call ended by requester"));
    }
}
