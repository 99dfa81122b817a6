use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use mongodb::error::{ErrorKind, WriteFailure};
use thiserror::Error;
use validator::ValidationErrors;

/// Server error code for a unique index violation
const DUPLICATE_KEY_CODE: i32 = 11000;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    #[error("User with ID {0} not found")]
    NotFound(String),

    #[error("User with email {0} already exists")]
    EmailConflict(String),

    /// Raw unique-index violation reported by the store
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Database error: {0}")]
    Database(String),
}

pub type UserResult<T> = Result<T, UserError>;

/// Convert UserError to AppError for standardized error responses
impl From<UserError> for AppError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::Validation(errors) => AppError::ValidationError(errors),
            err @ UserError::InvalidId(_) => AppError::InvalidId(err.to_string()),
            err @ UserError::NotFound(_) => AppError::NotFound(err.to_string()),
            err @ UserError::EmailConflict(_) => AppError::Conflict(err.to_string()),
            // The service rewrites these with the offending email; one that
            // slips through is still a conflict.
            UserError::DuplicateKey(_) => {
                AppError::Conflict("User with this email already exists".to_string())
            }
            UserError::Database(detail) => AppError::Database(detail),
        }
    }
}

impl IntoResponse for UserError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

/// Whether a driver error is a unique index violation.
pub fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == DUPLICATE_KEY_CODE,
        ErrorKind::Command(e) => e.code == DUPLICATE_KEY_CODE,
        _ => false,
    }
}

impl From<mongodb::error::Error> for UserError {
    fn from(err: mongodb::error::Error) -> Self {
        if is_duplicate_key(&err) {
            UserError::DuplicateKey(err.to_string())
        } else {
            UserError::Database(err.to_string())
        }
    }
}
