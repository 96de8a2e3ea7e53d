//! Extraction of the authenticated caller from request headers.

use crate::error::{auth_error, lifecycle_error, ApiError};
use crate::AppState;
use api_shared::auth::{
    validate_api_key, API_KEY_HEADER, USER_ID_HEADER, USER_NAME_HEADER, USER_ROLE_HEADER,
};
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use wardlab_core::Caller;

/// The staff member a request acts for, after the API key has been checked.
pub struct AuthenticatedCaller(pub Caller);

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthenticatedCaller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let headers = &parts.headers;

        validate_api_key(header(headers, API_KEY_HEADER), state.cfg.api_key()).map_err(|e| {
            tracing::warn!("rejected {} {}: {}", parts.method, parts.uri.path(), e);
            auth_error(e)
        })?;

        let caller = Caller::new(
            header(headers, USER_ID_HEADER).unwrap_or_default(),
            header(headers, USER_NAME_HEADER).unwrap_or_default(),
            header(headers, USER_ROLE_HEADER).unwrap_or_default(),
        )
        .map_err(lifecycle_error)?;

        Ok(AuthenticatedCaller(caller))
    }
}
