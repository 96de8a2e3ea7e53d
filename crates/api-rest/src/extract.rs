//! Body, query and path extractors that reject with the JSON error body.
//!
//! axum's own extractors answer malformed input with a plain-text body. These wrappers
//! delegate to them and reshape the rejection so every error a client sees is an
//! [`api_shared::ErrorRes`].

use crate::error::{error_body, ApiError};
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::Json;

/// JSON request body.
pub struct ApiJson<T>(pub T);

/// URL query string.
pub struct ApiQuery<T>(pub T);

/// URL path parameters.
pub struct ApiPath<T>(pub T);

fn json_rejection(rejection: JsonRejection) -> ApiError {
    let message = rejection.body_text();
    tracing::warn!("rejected request body: {}", message);
    match rejection {
        JsonRejection::MissingJsonContentType(_) => error_body(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "unsupported_media_type",
            message,
        ),
        JsonRejection::JsonDataError(_) | JsonRejection::JsonSyntaxError(_) => {
            error_body(StatusCode::BAD_REQUEST, "validation_error", message)
        }
        other => error_body(other.status(), "invalid_body", message),
    }
}

#[axum::async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, ApiError> {
        Json::<T>::from_request(req, state)
            .await
            .map(|Json(value)| ApiJson(value))
            .map_err(json_rejection)
    }
}

#[axum::async_trait]
impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    Query<T>: FromRequestParts<S, Rejection = QueryRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, ApiError> {
        Query::<T>::from_request_parts(parts, state)
            .await
            .map(|Query(value)| ApiQuery(value))
            .map_err(|rejection: QueryRejection| {
                let message = rejection.body_text();
                tracing::warn!("rejected query {:?}: {}", parts.uri.query(), message);
                error_body(StatusCode::BAD_REQUEST, "validation_error", message)
            })
    }
}

#[axum::async_trait]
impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    Path<T>: FromRequestParts<S, Rejection = PathRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, ApiError> {
        Path::<T>::from_request_parts(parts, state)
            .await
            .map(|Path(value)| ApiPath(value))
            .map_err(|rejection: PathRejection| {
                let status = rejection.status();
                let message = rejection.body_text();
                if status.is_server_error() {
                    tracing::error!("path extraction failed: {}", message);
                    error_body(status, "internal_error", "internal error")
                } else {
                    error_body(StatusCode::BAD_REQUEST, "validation_error", message)
                }
            })
    }
}
