//! Prometheus metrics for the coordinator.
//!
//! One [`CoordMetrics`] instance owns a dedicated [`Registry`] that the
//! HTTP `/metrics` endpoint encodes into the text exposition format.

use prometheus::{
    register_int_counter_with_registry, register_int_gauge_with_registry, IntCounter, IntGauge,
    Opts, Registry,
};

/// Central collection of coordinator metrics.
pub struct CoordMetrics {
    pub registry: Registry,

    /// Total sessions created.
    pub sessions_created: IntCounter,
    /// Claim compare-and-sets that committed.
    pub claims_won: IntCounter,
    /// Claim compare-and-sets that lost the race.
    pub claims_lost: IntCounter,
    /// Lifecycle transitions applied.
    pub transitions_applied: IntCounter,
    /// Sessions expired by the reaper or requester end-call.
    pub sessions_reaped: IntCounter,
    /// Signaling payloads forwarded.
    pub signals_relayed: IntCounter,
    /// Join attempts rejected at the real-time boundary.
    pub joins_rejected: IntCounter,
    /// Join-link notification deliveries that failed.
    pub notify_failures: IntCounter,

    /// Rooms currently open.
    pub rooms_open: IntGauge,
    /// Real-time connections currently tracked in rooms.
    pub connections_open: IntGauge,
}

impl CoordMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let sessions_created = register_int_counter_with_registry!(
            Opts::new("vouch_sessions_created_total", "Total sessions created"),
            registry
        )
        .expect("failed to register sessions_created counter");

        let claims_won = register_int_counter_with_registry!(
            Opts::new("vouch_claims_won_total", "Claims that committed"),
            registry
        )
        .expect("failed to register claims_won counter");

        let claims_lost = register_int_counter_with_registry!(
            Opts::new("vouch_claims_lost_total", "Claims that lost the race"),
            registry
        )
        .expect("failed to register claims_lost counter");

        let transitions_applied = register_int_counter_with_registry!(
            Opts::new(
                "vouch_transitions_applied_total",
                "Lifecycle transitions applied"
            ),
            registry
        )
        .expect("failed to register transitions_applied counter");

        let sessions_reaped = register_int_counter_with_registry!(
            Opts::new(
                "vouch_sessions_reaped_total",
                "Sessions expired on empty room or requester end-call"
            ),
            registry
        )
        .expect("failed to register sessions_reaped counter");

        let signals_relayed = register_int_counter_with_registry!(
            Opts::new(
                "vouch_signals_relayed_total",
                "Negotiation payloads forwarded between room members"
            ),
            registry
        )
        .expect("failed to register signals_relayed counter");

        let joins_rejected = register_int_counter_with_registry!(
            Opts::new(
                "vouch_joins_rejected_total",
                "Room joins rejected at the real-time boundary"
            ),
            registry
        )
        .expect("failed to register joins_rejected counter");

        let notify_failures = register_int_counter_with_registry!(
            Opts::new(
                "vouch_notify_failures_total",
                "Join-link notification deliveries that failed"
            ),
            registry
        )
        .expect("failed to register notify_failures counter");

        let rooms_open = register_int_gauge_with_registry!(
            Opts::new("vouch_rooms_open", "Rooms currently open"),
            registry
        )
        .expect("failed to register rooms_open gauge");

        let connections_open = register_int_gauge_with_registry!(
            Opts::new(
                "vouch_connections_open",
                "Real-time connections currently in rooms"
            ),
            registry
        )
        .expect("failed to register connections_open gauge");

        Self {
            registry,
            sessions_created,
            claims_won,
            claims_lost,
            transitions_applied,
            sessions_reaped,
            signals_relayed,
            joins_rejected,
            notify_failures,
            rooms_open,
            connections_open,
        }
    }
}

impl Default for CoordMetrics {
    fn default() -> Self {
        Self::new()
    }
}
