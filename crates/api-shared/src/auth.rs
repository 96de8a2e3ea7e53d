//! Request authentication primitives.
//!
//! Every protected call carries a shared API key plus the identity of the staff member on
//! whose behalf it acts. Issuing and checking user credentials happens upstream; this layer
//! trusts the identity headers once the API key matches.

use subtle::ConstantTimeEq;

/// Header carrying the shared API key.
pub const API_KEY_HEADER: &str = "x-api-key";
/// Header carrying the caller's user id.
pub const USER_ID_HEADER: &str = "x-user-id";
/// Header carrying the caller's display name.
pub const USER_NAME_HEADER: &str = "x-user-name";
/// Header carrying the caller's role (`admin`, `charge_nurse`, `lab_staff`, `quality`).
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("missing API key")]
    MissingApiKey,
    #[error("invalid API key")]
    InvalidApiKey,
}

/// Validates the provided API key against the configured one.
///
/// Returns `Ok(())` if the key matches, or an error if it is missing or wrong.
pub fn validate_api_key(provided: Option<&str>, expected: &str) -> Result<(), AuthError> {
    let provided = provided.ok_or(AuthError::MissingApiKey)?;
    if constant_time_eq(provided, expected) {
        Ok(())
    } else {
        Err(AuthError::InvalidApiKey)
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
