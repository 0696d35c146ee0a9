//! The persisted session record.

use serde::{Deserialize, Serialize};
use vouch_types::{ContactInfo, SessionStatus, SessionToken, StaffId, Timestamp};

/// Opaque collaborator output attached to a session. The lifecycle engine
/// never branches on any of these fields.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionArtifacts {
    /// Fields the document-extraction service pulled from captured IDs.
    #[serde(default)]
    pub extracted_fields: Option<serde_json::Value>,
    /// Face-similarity score reported by the comparison service.
    #[serde(default)]
    pub similarity_score: Option<f64>,
    /// Object-store locators for call recordings.
    #[serde(default)]
    pub recordings: Vec<String>,
}

/// One verification session: the single source of truth for its status.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Opaque client-facing identifier; also the room name.
    pub token: SessionToken,
    pub status: SessionStatus,
    /// `None` means unclaimed/open.
    pub assignee: Option<StaffId>,
    /// Requester details captured at creation; immutable afterwards.
    pub contact: ContactInfo,
    /// Link handed to the requester; derived from the token.
    pub join_link: String,
    /// The link is unusable past this instant, independent of `status`.
    pub link_expires_at: Timestamp,
    /// Free-text annotations appended by transition side effects.
    pub notes: String,
    pub created_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    #[serde(default)]
    pub artifacts: SessionArtifacts,
}

impl SessionRecord {
    /// A freshly created session in `NotStarted`, with no annotations.
    pub fn new(
        token: SessionToken,
        contact: ContactInfo,
        assignee: Option<StaffId>,
        join_link: String,
        link_expires_at: Timestamp,
        created_at: Timestamp,
    ) -> Self {
        Self {
            token,
            status: SessionStatus::NotStarted,
            assignee,
            contact,
            join_link,
            link_expires_at,
            notes: String::new(),
            created_at,
            started_at: None,
            completed_at: None,
            artifacts: SessionArtifacts::default(),
        }
    }

    /// Append a note, space-separated from whatever is already there.
    pub fn append_note(&mut self, note: &str) {
        if note.is_empty() {
            return;
        }
        if !self.notes.is_empty() {
            self.notes.push(' ');
        }
        self.notes.push_str(note);
    }
}
