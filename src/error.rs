//! Error types for the circulation server

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Machine-readable error kinds, serialized by name in every error body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    NotAuthorized = 2,
    DbFailure = 3,
    SubjectNotFound = 4,
    ResourceNotFound = 5,
    BadValue = 6,
    Duplicate = 7,
    AlreadyHeld = 8,
    NotHeld = 9,
    CapacityExceeded = 10,
    CapacityBelowHolders = 11,
    StorageUnavailable = 12,
}

/// Failures reported by a persistence adapter
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Record {0} already exists")]
    Duplicate(String),

    #[error("Record {0} was modified concurrently")]
    VersionConflict(String),

    #[error("Record {0} disappeared during update")]
    Missing(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Whether repeating the operation against fresh state may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::VersionConflict(_) | StoreError::Unavailable(_) => true,
            StoreError::Database(e) => matches!(
                e,
                sqlx::Error::PoolTimedOut | sqlx::Error::Io(_)
            ),
            _ => false,
        }
    }
}

/// Outcome of a rejected ledger transition
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Book {0} not found")]
    ResourceNotFound(String),

    #[error("User {0} not found")]
    SubjectNotFound(i32),

    #[error("User {user_id} already holds book {isbn}")]
    AlreadyHeld { isbn: String, user_id: i32 },

    #[error("User {user_id} does not hold book {isbn}")]
    NotHeld { isbn: String, user_id: i32 },

    #[error("Book {isbn} is not available (all {capacity} copies are held)")]
    CapacityExceeded { isbn: String, capacity: u32 },

    #[error("Cannot resize book {isbn} to {requested}: {holders} copies are currently held")]
    CapacityBelowHolders {
        isbn: String,
        requested: u32,
        holders: usize,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LedgerError {
    pub fn is_transient(&self) -> bool {
        matches!(self, LedgerError::Store(e) if e.is_transient())
    }
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

fn store_status(e: &StoreError) -> (StatusCode, ErrorCode, String) {
    match e {
        StoreError::Duplicate(_) => (StatusCode::CONFLICT, ErrorCode::Duplicate, e.to_string()),
        _ if e.is_transient() => {
            tracing::error!("Store unavailable: {:?}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorCode::StorageUnavailable,
                "Storage temporarily unavailable, please retry".to_string(),
            )
        }
        _ => {
            tracing::error!("Database error: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::DbFailure,
                "Database error".to_string(),
            )
        }
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, ErrorCode, String) {
        match self {
            AppError::Authentication(msg) => {
                (StatusCode::UNAUTHORIZED, ErrorCode::NotAuthorized, msg.clone())
            }
            AppError::Authorization(msg) => {
                (StatusCode::FORBIDDEN, ErrorCode::NotAuthorized, msg.clone())
            }
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone())
            }
            AppError::Conflict(msg) => (StatusCode::CONFLICT, ErrorCode::Duplicate, msg.clone()),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Failure,
                    "Internal server error".to_string(),
                )
            }
            AppError::Store(e) => store_status(e),
            AppError::Ledger(e) => {
                let msg = e.to_string();
                match e {
                    LedgerError::ResourceNotFound(_) => {
                        (StatusCode::NOT_FOUND, ErrorCode::ResourceNotFound, msg)
                    }
                    LedgerError::SubjectNotFound(_) => {
                        (StatusCode::NOT_FOUND, ErrorCode::SubjectNotFound, msg)
                    }
                    LedgerError::AlreadyHeld { .. } => {
                        (StatusCode::CONFLICT, ErrorCode::AlreadyHeld, msg)
                    }
                    LedgerError::NotHeld { .. } => (StatusCode::CONFLICT, ErrorCode::NotHeld, msg),
                    LedgerError::CapacityExceeded { .. } => {
                        (StatusCode::CONFLICT, ErrorCode::CapacityExceeded, msg)
                    }
                    LedgerError::CapacityBelowHolders { .. } => {
                        (StatusCode::CONFLICT, ErrorCode::CapacityBelowHolders, msg)
                    }
                    LedgerError::Store(e) => store_status(e),
                }
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
