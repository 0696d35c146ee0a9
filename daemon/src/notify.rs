//! Fallback join-link delivery.
//!
//! The real text-message gateway is an external collaborator wired in by
//! deployment. When none is configured, links are logged so operators can
//! hand them out manually.

use async_trait::async_trait;

use vouch_session::{ExternalError, NotificationSender};
use vouch_types::ContactInfo;

pub struct LogOnlyNotifier;

#[async_trait]
impl NotificationSender for LogOnlyNotifier {
    async fn send_join_link(
        &self,
        contact: &ContactInfo,
        join_link: &str,
    ) -> Result<(), ExternalError> {
        tracing::info!(
            requester = %contact.name,
            link = join_link,
            "no notification gateway configured, join link logged"
        );
        Ok(())
    }
}
