use api_shared::{AuthError, ErrorRes};
use axum::http::StatusCode;
use axum::Json;
use wardlab_core::LifecycleError;

/// Error half of every handler's result.
pub type ApiError = (StatusCode, Json<ErrorRes>);
pub type ApiResult<T> = Result<T, ApiError>;

pub(crate) fn error_body(status: StatusCode, error: &str, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorRes {
            error: error.into(),
            message: message.into(),
        }),
    )
}

/// Maps a core failure onto its HTTP status and error body.
///
/// Storage and directory failures are logged and reported without their detail.
pub fn lifecycle_error(err: LifecycleError) -> ApiError {
    let status = match &err {
        LifecycleError::Validation(_) => StatusCode::BAD_REQUEST,
        LifecycleError::NotFound(_) => StatusCode::NOT_FOUND,
        LifecycleError::InvalidTransition { .. } | LifecycleError::ConcurrencyConflict(_) => {
            StatusCode::CONFLICT
        }
        LifecycleError::Forbidden { .. } => StatusCode::FORBIDDEN,
        LifecycleError::Storage(_) | LifecycleError::Directory(_) => {
            tracing::error!("request failed: {}", err);
            return error_body(
                StatusCode::INTERNAL_SERVER_ERROR,
                err.kind(),
                "internal error",
            );
        }
    };
    error_body(status, err.kind(), err.to_string())
}

pub fn auth_error(err: AuthError) -> ApiError {
    error_body(StatusCode::UNAUTHORIZED, "unauthorized", err.to_string())
}
