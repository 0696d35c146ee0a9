//! RPC error types and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use vouch_session::SessionError;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("session not found: {0}")]
    NotFound(String),

    #[error("session state changed, re-fetch and retry: now {0}")]
    StaleState(String),

    #[error("session is already assigned to another staff member")]
    AlreadyClaimed,

    #[error("this session has expired or been closed")]
    Closed,

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("server error: {0}")]
    Server(String),
}

impl RpcError {
    fn status_code(&self) -> StatusCode {
        match self {
            RpcError::NotFound(_) => StatusCode::NOT_FOUND,
            // Expected race outcomes: structured conflicts, not failures.
            RpcError::StaleState(_) | RpcError::AlreadyClaimed => StatusCode::CONFLICT,
            RpcError::Closed => StatusCode::FORBIDDEN,
            RpcError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            RpcError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            RpcError::Store(_) | RpcError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            RpcError::NotFound(_) => "not_found",
            RpcError::StaleState(_) => "stale_state",
            RpcError::AlreadyClaimed => "already_claimed",
            RpcError::Closed => "closed",
            RpcError::Unauthorized(_) => "unauthorized",
            RpcError::InvalidRequest(_) => "invalid_request",
            RpcError::Store(_) | RpcError::Server(_) => "server_error",
        }
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({
            "error": self.to_string(),
            "code": self.code(),
        }));
        (self.status_code(), body).into_response()
    }
}

impl From<SessionError> for RpcError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::NotFound(token) => RpcError::NotFound(token),
            SessionError::StaleState { actual } => RpcError::StaleState(actual.to_string()),
            SessionError::AlreadyClaimed { .. } => RpcError::AlreadyClaimed,
            SessionError::Closed { .. } => RpcError::Closed,
            SessionError::Unauthorized(msg) => RpcError::Unauthorized(msg),
            SessionError::Validation(msg) => RpcError::InvalidRequest(msg),
            SessionError::Store(msg) => RpcError::Store(msg),
        }
    }
}

impl From<vouch_store::StoreError> for RpcError {
    fn from(e: vouch_store::StoreError) -> Self {
        RpcError::from(SessionError::from(e))
    }
}
