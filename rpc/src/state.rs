//! Shared state for the HTTP API.

use std::sync::Arc;

use vouch_session::{
    ClaimArbiter, CoordMetrics, LifecycleEngine, NotificationSender, ObjectStore, SessionFactory,
};
use vouch_store::SessionStore;

pub struct RpcState {
    pub store: Arc<dyn SessionStore>,
    pub factory: SessionFactory,
    pub engine: Arc<LifecycleEngine>,
    pub arbiter: ClaimArbiter,
    pub metrics: Arc<CoordMetrics>,
    /// Optional outbound join-link delivery; `None` disables notification.
    pub notifier: Option<Arc<dyn NotificationSender>>,
    /// Optional recording storage; `None` leaves locators unsigned.
    pub object_store: Option<Arc<dyn ObjectStore>>,
}

impl RpcState {
    pub fn new(
        store: Arc<dyn SessionStore>,
        engine: Arc<LifecycleEngine>,
        metrics: Arc<CoordMetrics>,
        base_url: impl Into<String>,
        link_ttl_secs: u64,
        notifier: Option<Arc<dyn NotificationSender>>,
        object_store: Option<Arc<dyn ObjectStore>>,
    ) -> Self {
        Self {
            factory: SessionFactory::new(
                store.clone(),
                metrics.clone(),
                base_url,
                link_ttl_secs,
            ),
            arbiter: ClaimArbiter::new(store.clone(), metrics.clone()),
            store,
            engine,
            metrics,
            notifier,
            object_store,
        }
    }
}
