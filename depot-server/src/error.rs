//! Registry errors as HTTP responses
//!
//! Every handler returns [`AppResult`]. [`AppError`] classifies failures with an
//! [`ErrorCode`] that maps to an HTTP status, and renders them in the shape
//! Cargo prints to its users, extended with a machine-readable code:
//!
//! ```json
//! {
//!   "errors": [{ "detail": "no crate named 'foo' found" }],
//!   "code": "not_found",
//!   "timestamp": "2026-03-14T09:30:00+00:00"
//! }
//! ```
//!
//! Internal errors never leak their cause to clients: the detail is replaced by
//! a generic message and the cause is logged instead.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use depot_core::validation::ValidationError;
use depot_core::RegistryError;
use serde::Serialize;

/// One entry of the `errors` array Cargo displays.
#[derive(Serialize, Debug)]
pub struct ErrorDetail {
    pub detail: String,
}

/// Standardized error response structure.
#[derive(Serialize, Debug)]
pub struct ApiErrorResponse {
    pub errors: Vec<ErrorDetail>,
    pub code: String,
    /// RFC 3339.
    pub timestamp: String,
}

/// The `code` field of an error body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    ValidationError,
    NotFound,
    /// The upload exceeds a configured size limit.
    UploadError,
    AuthError,
    /// Authenticated, but not an owner.
    Forbidden,
    Conflict,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "validation_error",
            ErrorCode::NotFound => "not_found",
            ErrorCode::UploadError => "upload_error",
            ErrorCode::AuthError => "auth_error",
            ErrorCode::Forbidden => "forbidden",
            ErrorCode::Conflict => "conflict",
            ErrorCode::InternalError => "internal_error",
        }
    }

    pub fn http_status(&self) -> StatusCode {
        match self {
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::UploadError => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorCode::AuthError => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Everything a handler can fail with.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Registry(#[from] depot_core::Error),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    UploadError(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("internal server error: {0}")]
    InternalError(String),
}

impl From<RegistryError> for AppError {
    fn from(err: RegistryError) -> Self {
        AppError::Registry(err.into())
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Registry(err.into())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::InternalError(format!("blocking task failed: {err}"))
    }
}

fn registry_code(err: &RegistryError) -> ErrorCode {
    match err {
        RegistryError::CrateNotFound { .. }
        | RegistryError::VersionNotFound { .. }
        | RegistryError::UserNotFound { .. } => ErrorCode::NotFound,
        RegistryError::CrateNotOwned { .. } => ErrorCode::Forbidden,
        RegistryError::InvalidToken | RegistryError::InvalidCredentials => ErrorCode::AuthError,
        RegistryError::AccountExists { .. } => ErrorCode::Conflict,
        RegistryError::VersionTooLow { .. }
        | RegistryError::LastOwner { .. }
        | RegistryError::MissingQueryParams { .. }
        | RegistryError::InvalidPayload { .. } => ErrorCode::ValidationError,
    }
}

impl AppError {
    /// Classification used for the status and the `code` field.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            AppError::Registry(depot_core::Error::Registry(err)) => registry_code(err),
            AppError::Registry(depot_core::Error::Validation(_)) => ErrorCode::ValidationError,
            AppError::Registry(_) => ErrorCode::InternalError,
            AppError::BadRequest(_) | AppError::Json(_) => ErrorCode::ValidationError,
            AppError::NotFound(_) => ErrorCode::NotFound,
            AppError::UploadError(_) => ErrorCode::UploadError,
            AppError::Unauthorized(_) => ErrorCode::AuthError,
            AppError::Database(_) | AppError::InternalError(_) => ErrorCode::InternalError,
        }
    }

    /// Message shown to the client.
    pub fn detail(&self) -> String {
        match self.error_code() {
            ErrorCode::InternalError => "internal server error".to_string(),
            _ => self.to_string(),
        }
    }

    /// Body sent to the client.
    pub fn to_error_response(&self) -> ApiErrorResponse {
        ApiErrorResponse {
            errors: vec![ErrorDetail {
                detail: self.detail(),
            }],
            code: self.error_code().as_str().to_string(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.error_code();
        let status = code.http_status();

        if code == ErrorCode::InternalError {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, status = %status, code = code.as_str(), "request rejected");
        }

        (status, axum::Json(self.to_error_response())).into_response()
    }
}

/// Result of a request handler.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use semver::Version;

    #[test]
    fn test_registry_errors_map_to_status() {
        let cases: Vec<(AppError, StatusCode)> = vec![
            (
                RegistryError::CrateNotFound {
                    name: "a".to_string(),
                }
                .into(),
                StatusCode::NOT_FOUND,
            ),
            (
                RegistryError::CrateNotOwned {
                    name: "a".to_string(),
                    author: "b".to_string(),
                }
                .into(),
                StatusCode::FORBIDDEN,
            ),
            (RegistryError::InvalidToken.into(), StatusCode::UNAUTHORIZED),
            (
                RegistryError::AccountExists {
                    email: "a@b".to_string(),
                }
                .into(),
                StatusCode::CONFLICT,
            ),
            (
                RegistryError::VersionTooLow {
                    krate: "a".to_string(),
                    hosted: Version::new(1, 0, 0),
                    published: Version::new(0, 1, 0),
                }
                .into(),
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::UploadError("too big".to_string()),
                StatusCode::PAYLOAD_TOO_LARGE,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(err.error_code().http_status(), status, "{err}");
        }
    }

    #[test]
    fn test_internal_errors_are_not_leaked() {
        let err = AppError::Registry(depot_core::Error::Command {
            command: "git push".to_string(),
            output: "fatal: secret remote".to_string(),
        });
        let response = err.to_error_response();
        assert_eq!(response.code, "internal_error");
        assert_eq!(response.errors[0].detail, "internal server error");
    }

    #[test]
    fn test_response_shape() {
        let err: AppError = RegistryError::MissingQueryParams {
            missing_params: &["q"],
        }
        .into();
        let value = serde_json::to_value(err.to_error_response()).unwrap();
        assert_eq!(
            value["errors"][0]["detail"],
            "missing query parameters: [\"q\"]"
        );
        assert_eq!(value["code"], "validation_error");
        assert!(value["timestamp"].is_string());
    }
}
