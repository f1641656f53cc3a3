//! Stockline API — error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use stockline_core::error::InventoryError;
use thiserror::Error;

/// Startup and runtime errors for the API server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Database connection or pool error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failed.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// The cache could not be reached at startup.
    #[error("cache error: {0}")]
    Cache(String),

    /// The message broker could not be reached, or the consumer could not
    /// be started.
    #[error("channel error: {0}")]
    Channel(String),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
}

/// HTTP-layer wrapper around `InventoryError` that implements
/// `IntoResponse`.
#[derive(Debug)]
pub struct ApiError(pub InventoryError);

impl From<InventoryError> for ApiError {
    fn from(err: InventoryError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self.0 {
            InventoryError::NotFound(_) => (StatusCode::NOT_FOUND, "product_not_found"),
            InventoryError::InsufficientStock { .. } => {
                (StatusCode::BAD_REQUEST, "insufficient_stock")
            }
            InventoryError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            InventoryError::Persistence(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "persistence_error")
            }
            InventoryError::Cache(_) => (StatusCode::INTERNAL_SERVER_ERROR, "cache_error"),
            InventoryError::Channel(_) => (StatusCode::BAD_GATEWAY, "channel_error"),
        };

        let body = ErrorBody {
            error: error_code,
            message: self.0.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
