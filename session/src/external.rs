//! Contracts for the external collaborators the coordinator depends on.
//!
//! The core never inspects document bytes, never parses extraction output,
//! and never branches on similarity scores; it persists locators and opaque
//! metadata and hands the rest to these interfaces.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use vouch_types::ContactInfo;

use crate::metrics::CoordMetrics;

#[derive(Debug, Error)]
pub enum ExternalError {
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),

    #[error("collaborator rejected the request: {0}")]
    Rejected(String),
}

/// Binary object storage (recordings, captured documents).
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store a blob, returning an opaque locator.
    async fn put(&self, bytes: &[u8]) -> Result<String, ExternalError>;

    /// Retrieve a blob by locator.
    async fn get(&self, locator: &str) -> Result<Vec<u8>, ExternalError>;

    /// A pre-signed retrieval URL valid for `ttl_secs`.
    async fn signed_url(&self, locator: &str, ttl_secs: u64) -> Result<String, ExternalError>;
}

/// Outbound delivery of the join link to the requester.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send_join_link(
        &self,
        contact: &ContactInfo,
        join_link: &str,
    ) -> Result<(), ExternalError>;
}

/// Deliver the join link as a detached task.
///
/// Fire-and-forget: the spawned task has its own failure channel (a log line
/// and a counter) and never blocks or fails the session operation that
/// triggered it.
pub fn spawn_join_link_notification(
    sender: Arc<dyn NotificationSender>,
    contact: ContactInfo,
    join_link: String,
    metrics: Arc<CoordMetrics>,
) {
    tokio::spawn(async move {
        if let Err(e) = sender.send_join_link(&contact, &join_link).await {
            metrics.notify_failures.inc();
            tracing::warn!(error = %e, "join-link notification failed");
        }
    });
}
