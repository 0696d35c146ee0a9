//! Caller identity from trusted gateway headers.
//!
//! The credential provider in front of this service authenticates staff and
//! forwards `(staff id, role)` in headers; the coordinator trusts them.

use axum::http::HeaderMap;

use vouch_session::StaffIdentity;
use vouch_types::{StaffId, StaffRole};

use crate::error::RpcError;

pub const STAFF_ID_HEADER: &str = "x-staff-id";
pub const STAFF_ROLE_HEADER: &str = "x-staff-role";

/// Extract the staff identity, failing with `Unauthorized` when the headers
/// are missing or malformed.
pub fn staff_identity(headers: &HeaderMap) -> Result<StaffIdentity, RpcError> {
    let id = headers
        .get(STAFF_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| RpcError::Unauthorized("missing staff identity".into()))?;
    let role = headers
        .get(STAFF_ROLE_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(StaffRole::parse)
        .ok_or_else(|| RpcError::Unauthorized("missing or unknown staff role".into()))?;
    Ok(StaffIdentity {
        id: StaffId::new(id),
        role,
    })
}
