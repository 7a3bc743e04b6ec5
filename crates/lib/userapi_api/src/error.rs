//! Application error types.
//!
//! Core errors are mapped to HTTP exactly once, here.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;
use userapi_core::accounts::AccountError;

use crate::response::failure;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation failed")]
    Validation(Vec<String>),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal server error")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(messages) => {
                failure(StatusCode::BAD_REQUEST, "Validation failed", Some(messages))
            }
            AppError::BadRequest(m) => failure::<()>(StatusCode::BAD_REQUEST, &m, None),
            AppError::NotFound(m) => failure::<()>(StatusCode::NOT_FOUND, &m, None),
            AppError::Conflict(m) => failure::<()>(StatusCode::CONFLICT, &m, None),
            AppError::Unauthorized(m) => failure::<()>(StatusCode::UNAUTHORIZED, &m, None),
            AppError::Forbidden(m) => failure::<()>(StatusCode::FORBIDDEN, &m, None),
            AppError::Internal(detail) => {
                error!(%detail, "internal error");
                failure::<()>(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error",
                    None,
                )
            }
        }
    }
}

impl From<AccountError> for AppError {
    fn from(e: AccountError) -> Self {
        let message = e.to_string();
        match e {
            AccountError::NotFound => AppError::NotFound(message),
            AccountError::EmailTaken | AccountError::UsernameTaken => AppError::Conflict(message),
            AccountError::InvalidCredentials | AccountError::InvalidToken => {
                AppError::Unauthorized(message)
            }
            AccountError::Inactive | AccountError::Forbidden(_) => AppError::Forbidden(message),
            AccountError::InvalidId => AppError::BadRequest(message),
            AccountError::Internal(detail) => AppError::Internal(detail),
        }
    }
}
