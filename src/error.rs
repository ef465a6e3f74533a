//! Error types for the listing engine, its stores and the HTTP layer

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use uuid::Uuid;

use crate::models::ApiResponse;

/// Persistence failures
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(Uuid),

    /// The row changed since it was read.
    #[error("listing {id} was modified concurrently (expected version {expected})")]
    VersionConflict { id: Uuid, expected: i64 },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Business-rule failures reported to the caller
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    InvalidOperation(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl TransactionError {
    pub fn listing_not_found(id: Uuid) -> Self {
        TransactionError::NotFound(format!("Listing {id} not found"))
    }
}

impl From<validator::ValidationErrors> for TransactionError {
    fn from(errors: validator::ValidationErrors) -> Self {
        TransactionError::Validation(format!("Validation error: {errors}"))
    }
}

/// Error returned by HTTP handlers
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Transaction(#[from] TransactionError),

    #[error("Missing or invalid caller identity: {0}")]
    Unauthenticated(String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::Transaction(errors.into())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Transaction(err) => match err {
                TransactionError::NotFound(_) => StatusCode::NOT_FOUND,
                TransactionError::Unauthorized(_) => StatusCode::FORBIDDEN,
                TransactionError::InvalidOperation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                TransactionError::Validation(_) => StatusCode::BAD_REQUEST,
                TransactionError::Conflict(_) => StatusCode::CONFLICT,
                TransactionError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
                TransactionError::Store(StoreError::VersionConflict { .. }) => StatusCode::CONFLICT,
                TransactionError::Store(StoreError::Database(_)) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(ApiResponse::<()>::failure(message))).into_response()
    }
}
