//! Identity validation.
//!
//! An identity is the username that addresses a chat participant. The
//! identity string is produced by the external session layer; the hub only
//! checks that it can be used as an addressing key without colliding with the
//! reserved routing names.

use crate::protocol::{BROADCAST_RECIPIENT, SYSTEM_SENDER};
use thiserror::Error;

/// Maximum identity length in bytes.
pub const MAX_IDENTITY_LEN: usize = 64;

/// Reasons an identity cannot be registered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidIdentity {
    #[error("identity cannot be empty")]
    Empty,

    #[error("identity exceeds {max} bytes (got {len})")]
    TooLong { len: usize, max: usize },

    #[error("identity '{0}' is reserved")]
    Reserved(String),

    #[error("identity contains control characters")]
    ControlCharacters,
}

/// Validate an identity before it is used as a registry key.
pub fn validate_identity(identity: &str) -> Result<(), InvalidIdentity> {
    if identity.trim().is_empty() {
        return Err(InvalidIdentity::Empty);
    }
    if identity.len() > MAX_IDENTITY_LEN {
        return Err(InvalidIdentity::TooLong {
            len: identity.len(),
            max: MAX_IDENTITY_LEN,
        });
    }
    if identity == BROADCAST_RECIPIENT || identity == SYSTEM_SENDER {
        return Err(InvalidIdentity::Reserved(identity.to_string()));
    }
    if identity.chars().any(char::is_control) {
        return Err(InvalidIdentity::ControlCharacters);
    }
    Ok(())
}
