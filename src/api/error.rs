use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{
    AppError,
    error::{BlogError, FieldErrors},
};

pub type ApiResult<T> = Result<T, ApiError>;

/// Failures of the JSON surface. Unlike the pages, nothing here redirects:
/// every failure is a status code and a body.
#[derive(Debug)]
pub enum ApiError {
    /// 401
    Unauthenticated,
    /// 403
    Forbidden,
    /// 404
    NotFound,
    /// 400 with a `field -> [messages]` body.
    Validation(FieldErrors),
    /// 500, logged.
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let detail = |status: StatusCode, detail: &str| {
            (status, Json(json!({ "detail": detail }))).into_response()
        };

        match self {
            ApiError::Unauthenticated => detail(
                StatusCode::UNAUTHORIZED,
                "Authentication credentials were not provided.",
            ),
            ApiError::Forbidden => detail(
                StatusCode::FORBIDDEN,
                "You do not have permission to perform this action.",
            ),
            ApiError::NotFound => detail(StatusCode::NOT_FOUND, "Not found."),
            ApiError::Validation(errors) => (StatusCode::BAD_REQUEST, Json(errors)).into_response(),
            ApiError::Internal(err) => {
                tracing::error!("{err}\n\n{}", err.backtrace());
                detail(StatusCode::INTERNAL_SERVER_ERROR, "A server error occurred.")
            }
        }
    }
}

impl From<BlogError> for ApiError {
    fn from(err: BlogError) -> Self {
        match err {
            BlogError::NotFound(_) => ApiError::NotFound,
            BlogError::Validation(errors) => ApiError::Validation(errors),
            BlogError::Forbidden(_) => ApiError::Forbidden,
            err => ApiError::Internal(err.into()),
        }
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        match err.0.downcast::<BlogError>() {
            Ok(err) => err.into(),
            Err(err) => ApiError::Internal(err),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(FieldErrors::single(FieldErrors::NON_FIELD, rejection.body_text()))
    }
}

/// Ids in API paths are numbers; anything else names nothing.
impl From<PathRejection> for ApiError {
    fn from(_: PathRejection) -> Self {
        ApiError::NotFound
    }
}
