//! Axum-based HTTP server.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::error::RpcError;
use crate::handlers;
use crate::state::RpcState;

pub struct RpcServer {
    pub port: u16,
    pub state: Arc<RpcState>,
}

impl RpcServer {
    pub fn new(port: u16, state: Arc<RpcState>) -> Self {
        Self { port, state }
    }

    /// Build the full API router; also used by handler tests.
    pub fn router(state: Arc<RpcState>) -> Router {
        Router::new()
            .route("/health", get(handlers::health))
            .route("/metrics", get(handlers::metrics))
            .route(
                "/api/sessions",
                post(handlers::create_session).get(handlers::list_sessions),
            )
            .route("/api/sessions/:token", get(handlers::get_session))
            .route(
                "/api/sessions/by-link/:link",
                get(handlers::get_session_by_link),
            )
            .route("/api/sessions/:token/claim", post(handlers::claim_session))
            .route("/api/sessions/:token/status", post(handlers::update_status))
            .route("/api/sessions/:token/end", post(handlers::end_session))
            .route(
                "/api/sessions/:token/artifacts",
                post(handlers::attach_artifacts),
            )
            .route(
                "/api/sessions/:token/recordings",
                get(handlers::list_recordings),
            )
            .layer(CorsLayer::permissive())
            .with_state(state)
    }

    /// Start the HTTP server. Runs until shutdown.
    pub async fn start(&self) -> Result<(), RpcError> {
        let app = Self::router(self.state.clone());
        let addr = format!("0.0.0.0:{}", self.port);
        info!("rpc server listening on {}", addr);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| RpcError::Server(e.to_string()))?;
        axum::serve(listener, app)
            .await
            .map_err(|e| RpcError::Server(e.to_string()))?;
        Ok(())
    }
}
