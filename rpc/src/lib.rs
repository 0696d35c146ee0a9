//! HTTP API for the vouch coordinator.
//!
//! Exposes session creation, listing, lookup (by token or join link), the
//! claim operation, status transitions, the requester end-of-call endpoint,
//! artifact attachment, and the health/metrics endpoints. Caller identity
//! arrives in trusted gateway headers; the coordinator does not revalidate
//! credentials.

pub mod error;
pub mod handlers;
pub mod identity;
pub mod server;
pub mod state;

pub use error::RpcError;
pub use server::RpcServer;
pub use state::RpcState;
