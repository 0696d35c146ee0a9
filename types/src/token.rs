//! Session token type with `sess_` prefix.
//!
//! The token is the client-facing identifier of a verification session and
//! doubles as the signaling room name. It carries no embedded meaning.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of random bytes backing a token (rendered as 32 hex chars).
const TOKEN_BYTES: usize = 16;

/// An opaque, globally unique session identifier, always prefixed `sess_`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionToken(String);

impl SessionToken {
    /// The standard prefix for all session tokens.
    pub const PREFIX: &'static str = "sess_";

    /// Generate a fresh random token.
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(format!("{}{}", Self::PREFIX, hex::encode(bytes)))
    }

    /// Parse a token from its string form. Returns `None` if the string is
    /// not a well-formed token.
    pub fn parse(raw: &str) -> Option<Self> {
        let hex_part = raw.strip_prefix(Self::PREFIX)?;
        if hex_part.len() != TOKEN_BYTES * 2 {
            return None;
        }
        if !hex_part
            .bytes()
            .all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase())
        {
            return None;
        }
        Some(Self(raw.to_string()))
    }

    /// Return the raw token string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
