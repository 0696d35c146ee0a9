//! LMDB storage backend for the vouch coordinator.
//!
//! Implements [`vouch_store::SessionStore`] using the `heed` LMDB bindings: a `sessions`
//! database keyed by token with bincode-encoded records, and a `links`
//! database mapping join links back to tokens. Every mutation runs in a
//! single write transaction; LMDB's single-writer rule is what serializes
//! conflicting compare-and-set calls on the same token so that exactly one
//! wins.

pub mod environment;
pub mod error;

pub use environment::LmdbSessionStore;
pub use error::LmdbError;
