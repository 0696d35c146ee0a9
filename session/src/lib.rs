//! Session lifecycle and claim coordination.
//!
//! This crate owns every status mutation in the system: the
//! [`LifecycleEngine`] enforces the transition table (both the HTTP
//! handlers and the signaling disconnect path call into it), and the
//! [`ClaimArbiter`] resolves the staff claim race with a single
//! compare-and-set against the store.

pub mod claim;
pub mod create;
pub mod error;
pub mod external;
pub mod identity;
pub mod lifecycle;
pub mod metrics;

pub use claim::ClaimArbiter;
pub use create::SessionFactory;
pub use error::SessionError;
pub use external::{ExternalError, NotificationSender, ObjectStore};
pub use identity::{Actor, StaffIdentity};
pub use lifecycle::{ExpiryCause, LifecycleEngine, Transition};
pub use metrics::CoordMetrics;
