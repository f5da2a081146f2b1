use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use clubroster_storage::StorageError;

use crate::auth::AuthError;

/// Every handler failure funnels through this enum, so each condition maps
/// to exactly one status code and one envelope shape.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Unauthenticated(String),

    #[error("invalid email or password")]
    InvalidCredential,

    #[error("account is not active")]
    AccountInactive,

    #[error("forbidden")]
    Forbidden,

    #[error("not found")]
    NotFound,

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("internal server error")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated(_) | ApiError::InvalidCredential => StatusCode::UNAUTHORIZED,
            ApiError::AccountInactive | ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::DuplicateEmail
            | StorageError::DuplicateProfile
            | StorageError::DuplicateAttendance => ApiError::Conflict(e.to_string()),
            StorageError::MissingReference(_) => ApiError::BadRequest(e.to_string()),
            StorageError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::MissingHeader | AuthError::InvalidToken => {
                ApiError::Unauthenticated(e.to_string())
            }
            AuthError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // The detail behind a 500 goes to the log, never to the client.
        if let ApiError::Internal(ref detail) = self {
            tracing::error!(detail = %detail, "internal error");
        }
        let status = self.status_code();
        let body = serde_json::json!({
            "success": false,
            "error": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}
