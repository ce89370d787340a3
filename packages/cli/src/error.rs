use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use parley_security::{CredentialError, TokenError};
use parley_storage::StorageError;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Main application error type that all handlers and middleware return
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation failed")]
    Validation(BTreeMap<String, String>),

    #[error("Resource not found")]
    NotFound,

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Edit conflict")]
    EditConflict,

    #[error("Rate limit exceeded")]
    RateLimitExceeded { retry_after: u64 },

    #[error("Malformed authorization header")]
    MalformedCredential,

    #[error("Invalid or expired credential")]
    InvalidCredentials,

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Account not activated")]
    NotActivated,

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),

    /// Wrap storage errors from the data layer
    #[error("Storage error")]
    Storage(StorageError),
}

/// Structured error response format for API consistency
#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

/// Error detail structure with machine-readable codes
#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
    request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<BTreeMap<String, String>>,
}

impl AppError {
    /// Convert AppError to appropriate HTTP status code and error code
    fn to_status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            AppError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            AppError::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::MethodNotAllowed => (StatusCode::METHOD_NOT_ALLOWED, "METHOD_NOT_ALLOWED"),
            AppError::EditConflict => (StatusCode::CONFLICT, "EDIT_CONFLICT"),
            AppError::RateLimitExceeded { .. } => {
                (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMIT_EXCEEDED")
            }
            AppError::MalformedCredential => (StatusCode::UNAUTHORIZED, "MALFORMED_CREDENTIAL"),
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS"),
            AppError::Unauthenticated => (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED"),
            AppError::NotActivated => (StatusCode::FORBIDDEN, "NOT_ACTIVATED"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            AppError::Storage(storage_error) => match storage_error {
                StorageError::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                StorageError::EditConflict => (StatusCode::CONFLICT, "EDIT_CONFLICT"),
                StorageError::DuplicateEmail => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR")
                }
                StorageError::Sqlx(_) | StorageError::InvalidData(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR")
                }
            },
        }
    }

    /// Get user-friendly error message (sanitized for external consumption)
    fn to_user_message(&self) -> String {
        match self {
            AppError::BadRequest(msg) => msg.clone(),
            AppError::Validation(_) => "The request failed validation".to_string(),
            AppError::NotFound => "The requested resource could not be found".to_string(),
            AppError::MethodNotAllowed => {
                "The method is not supported for this resource".to_string()
            }
            AppError::EditConflict => {
                "Unable to update the record due to an edit conflict, please try again"
                    .to_string()
            }
            AppError::RateLimitExceeded { .. } => {
                "Too many requests. Please try again later".to_string()
            }
            AppError::MalformedCredential => {
                "Authorization header must use the Bearer scheme".to_string()
            }
            AppError::InvalidCredentials => "Invalid authentication credentials".to_string(),
            AppError::Unauthenticated => {
                "You must be authenticated to access this resource".to_string()
            }
            AppError::NotActivated => {
                "Your user account must be activated to access this resource".to_string()
            }
            AppError::Internal(_) => "An internal server error occurred".to_string(),
            AppError::Storage(storage_error) => match storage_error {
                StorageError::NotFound => "The requested resource could not be found".to_string(),
                StorageError::EditConflict => {
                    "Unable to update the record due to an edit conflict, please try again"
                        .to_string()
                }
                StorageError::DuplicateEmail => "The request failed validation".to_string(),
                StorageError::Sqlx(_) | StorageError::InvalidData(_) => {
                    "An internal server error occurred".to_string()
                }
            },
        }
    }

    fn details(&self) -> Option<BTreeMap<String, String>> {
        match self {
            AppError::Validation(errors) => Some(errors.clone()),
            AppError::Storage(StorageError::DuplicateEmail) => Some(BTreeMap::from([(
                "email".to_string(),
                "a user with this email address already exists".to_string(),
            )])),
            _ => None,
        }
    }

    fn is_credential_failure(&self) -> bool {
        matches!(
            self,
            AppError::MalformedCredential | AppError::InvalidCredentials | AppError::Unauthenticated
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let request_id = Uuid::new_v4().to_string();
        let (status_code, error_code) = self.to_status_and_code();
        let user_message = self.to_user_message();

        // Log internal errors with full context but don't expose details
        match &self {
            AppError::Internal(err) => {
                error!(
                    request_id = %request_id,
                    error = %err,
                    "Internal server error occurred"
                );
            }
            AppError::Storage(storage_err) if status_code.is_server_error() => {
                error!(
                    request_id = %request_id,
                    storage_error = %storage_err,
                    "Storage system error"
                );
            }
            AppError::RateLimitExceeded { retry_after } => {
                warn!(
                    request_id = %request_id,
                    retry_after = %retry_after,
                    audit = true,
                    "Rate limit exceeded"
                );
            }
            AppError::MalformedCredential | AppError::InvalidCredentials => {
                warn!(
                    request_id = %request_id,
                    error_code = %error_code,
                    audit = true,
                    "Credential rejected"
                );
            }
            _ => {
                // Expected business logic errors
                info!(
                    request_id = %request_id,
                    error_code = %error_code,
                    error = %self,
                    "API error response"
                );
            }
        }

        let retry_after = match &self {
            AppError::RateLimitExceeded { retry_after } => Some(*retry_after),
            _ => None,
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: error_code,
                message: user_message,
                request_id,
                retry_after,
                details: self.details(),
            },
        };

        let mut response = (status_code, Json(error_response)).into_response();
        let headers = response.headers_mut();

        if let Some(retry_after) = retry_after {
            headers.insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
        }
        if self.is_credential_failure() {
            headers.insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }

        response
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        AppError::Storage(err)
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Invalid => AppError::InvalidCredentials,
            TokenError::Storage(storage_err) => AppError::Storage(storage_err),
            other => AppError::Internal(other.into()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::bad_request(rejection.body_text())
    }
}

impl From<CredentialError> for AppError {
    fn from(err: CredentialError) -> Self {
        AppError::Internal(err.into())
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, AppError>;

/// Helper functions for common error scenarios
impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn validation(errors: BTreeMap<String, String>) -> Self {
        Self::Validation(errors)
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        Self::Internal(err.into())
    }

    pub fn rate_limited(retry_after: u64) -> Self {
        Self::RateLimitExceeded { retry_after }
    }
}
