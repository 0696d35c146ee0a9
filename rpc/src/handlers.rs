//! Request handlers and their wire types.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use vouch_session::external::spawn_join_link_notification;
use vouch_session::{Actor, SessionError, Transition};
use vouch_store::SessionRecord;
use vouch_types::{ContactInfo, SessionStatus, SessionToken, Timestamp};

use crate::error::RpcError;
use crate::identity::staff_identity;
use crate::state::RpcState;

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreateSessionRequest {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Whether to send the join link to the requester (default true).
    #[serde(default = "default_true")]
    pub notify: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub session: SessionRecord,
}

#[derive(Serialize)]
pub struct SessionListResponse {
    pub sessions: Vec<SessionRecord>,
    pub count: usize,
}

#[derive(Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Deserialize)]
pub struct AttachArtifactsRequest {
    #[serde(default)]
    pub extracted_fields: Option<serde_json::Value>,
    #[serde(default)]
    pub similarity_score: Option<f64>,
    #[serde(default)]
    pub recording_locator: Option<String>,
}

#[derive(Serialize)]
pub struct EndSessionResponse {
    pub session: SessionRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Serialize)]
pub struct RecordingInfo {
    pub locator: String,
    /// Pre-signed retrieval URL when an object store is configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Serialize)]
pub struct RecordingListResponse {
    pub recordings: Vec<RecordingInfo>,
}

// ── Handlers ─────────────────────────────────────────────────────────────

fn parse_token(raw: &str) -> Result<SessionToken, RpcError> {
    SessionToken::parse(raw).ok_or_else(|| RpcError::NotFound(raw.to_string()))
}

pub async fn create_session(
    State(state): State<Arc<RpcState>>,
    headers: HeaderMap,
    Json(req): Json<CreateSessionRequest>,
) -> Result<impl IntoResponse, RpcError> {
    let identity = staff_identity(&headers)?;

    let mut contact = ContactInfo::new(req.name);
    contact.phone = req.phone;
    contact.email = req.email;

    let record = state
        .factory
        .create(contact.clone(), &identity, Timestamp::now())?;

    if req.notify {
        if let Some(notifier) = &state.notifier {
            spawn_join_link_notification(
                notifier.clone(),
                contact,
                record.join_link.clone(),
                state.metrics.clone(),
            );
        }
    }

    Ok((StatusCode::CREATED, Json(SessionResponse { session: record })))
}

pub async fn list_sessions(
    State(state): State<Arc<RpcState>>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<SessionListResponse>, RpcError> {
    let identity = staff_identity(&headers)?;
    let status = match query.status.as_deref() {
        Some(raw) => Some(
            SessionStatus::parse(raw)
                .ok_or_else(|| RpcError::InvalidRequest(format!("unknown status: {raw}")))?,
        ),
        None => None,
    };
    let sessions = state.arbiter.list_for(&identity, status)?;
    let count = sessions.len();
    Ok(Json(SessionListResponse { sessions, count }))
}

pub async fn get_session(
    State(state): State<Arc<RpcState>>,
    headers: HeaderMap,
    Path(token): Path<String>,
) -> Result<Json<SessionResponse>, RpcError> {
    let identity = staff_identity(&headers)?;
    let token = parse_token(&token)?;
    let record = state.store.get(&token)?;

    // Agents only see live sessions; admins see everything.
    if !identity.is_admin() && record.status.is_terminal() {
        return Err(RpcError::Closed);
    }
    Ok(Json(SessionResponse { session: record }))
}

/// Requester-side lookup: unauthenticated, gated by link validity instead.
pub async fn get_session_by_link(
    State(state): State<Arc<RpcState>>,
    Path(link): Path<String>,
) -> Result<Json<SessionResponse>, RpcError> {
    let record = state.store.get_by_link(&link)?;

    if record.link_expires_at.is_past(Timestamp::now()) {
        return Err(RpcError::Closed);
    }
    if record.status.is_terminal() {
        return Err(RpcError::Closed);
    }
    Ok(Json(SessionResponse { session: record }))
}

pub async fn claim_session(
    State(state): State<Arc<RpcState>>,
    headers: HeaderMap,
    Path(token): Path<String>,
) -> Result<Json<SessionResponse>, RpcError> {
    let identity = staff_identity(&headers)?;
    let token = parse_token(&token)?;
    let record = state.arbiter.claim(&token, &identity)?;
    Ok(Json(SessionResponse { session: record }))
}

pub async fn update_status(
    State(state): State<Arc<RpcState>>,
    headers: HeaderMap,
    Path(token): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<SessionResponse>, RpcError> {
    let identity = staff_identity(&headers)?;
    let token = parse_token(&token)?;

    let target = SessionStatus::parse(&req.status)
        .ok_or_else(|| RpcError::InvalidRequest(format!("unknown status: {}", req.status)))?;
    let transition = match target {
        SessionStatus::InProgress => Transition::Start,
        SessionStatus::PendingReview => Transition::MarkReview { note: req.note },
        SessionStatus::Completed => Transition::Approve,
        SessionStatus::Rejected => Transition::Reject {
            reason: req.note.unwrap_or_default(),
        },
        SessionStatus::Cancelled => Transition::Cancel,
        other => {
            return Err(RpcError::InvalidRequest(format!(
                "status {other} cannot be set directly"
            )));
        }
    };

    let record = state.engine.apply(
        &token,
        &transition,
        &Actor::Staff(identity),
        Timestamp::now(),
    )?;
    Ok(Json(SessionResponse { session: record }))
}

/// The requester hangs up. Idempotent: ending an already-closed session
/// reports success rather than an error.
pub async fn end_session(
    State(state): State<Arc<RpcState>>,
    Path(token): Path<String>,
) -> Result<Json<EndSessionResponse>, RpcError> {
    let token = parse_token(&token)?;
    let result = state.engine.apply(
        &token,
        &Transition::Expire {
            cause: vouch_session::ExpiryCause::RequesterEnded,
        },
        &Actor::Requester,
        Timestamp::now(),
    );
    match result {
        Ok(record) => Ok(Json(EndSessionResponse {
            session: record,
            message: None,
        })),
        Err(SessionError::Closed { .. }) => {
            let record = state.store.get(&token)?;
            Ok(Json(EndSessionResponse {
                session: record,
                message: Some("session already closed".into()),
            }))
        }
        Err(e) => Err(e.into()),
    }
}

/// Attach collaborator output. Opaque to the state machine; allowed in any
/// status because review happens after the call ends.
pub async fn attach_artifacts(
    State(state): State<Arc<RpcState>>,
    headers: HeaderMap,
    Path(token): Path<String>,
    Json(req): Json<AttachArtifactsRequest>,
) -> Result<Json<SessionResponse>, RpcError> {
    staff_identity(&headers)?;
    let token = parse_token(&token)?;

    let record = state.store.update_conditional(&token, &|record| {
        if let Some(fields) = &req.extracted_fields {
            record.artifacts.extracted_fields = Some(fields.clone());
        }
        if let Some(score) = req.similarity_score {
            record.artifacts.similarity_score = Some(score);
        }
        if let Some(locator) = &req.recording_locator {
            record.artifacts.recordings.push(locator.clone());
        }
        Ok(())
    })?;
    Ok(Json(SessionResponse { session: record }))
}

/// Signed retrieval URLs for the session's recordings.
pub async fn list_recordings(
    State(state): State<Arc<RpcState>>,
    headers: HeaderMap,
    Path(token): Path<String>,
) -> Result<Json<RecordingListResponse>, RpcError> {
    staff_identity(&headers)?;
    let token = parse_token(&token)?;
    let record = state.store.get(&token)?;

    let mut recordings = Vec::with_capacity(record.artifacts.recordings.len());
    for locator in &record.artifacts.recordings {
        let url = match &state.object_store {
            Some(object_store) => match object_store.signed_url(locator, 3600).await {
                Ok(url) => Some(url),
                Err(e) => {
                    tracing::warn!(token = %token, error = %e, "failed to sign recording url");
                    None
                }
            },
            None => None,
        };
        recordings.push(RecordingInfo {
            locator: locator.clone(),
            url,
        });
    }
    Ok(Json(RecordingListResponse { recordings }))
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

pub async fn metrics(State(state): State<Arc<RpcState>>) -> Result<impl IntoResponse, RpcError> {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let families = state.metrics.registry.gather();
    let mut buf = Vec::new();
    encoder
        .encode(&families, &mut buf)
        .map_err(|e| RpcError::Server(e.to_string()))?;
    Ok(([("content-type", "text/plain; version=0.0.4")], buf))
}
