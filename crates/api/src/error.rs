use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use linksters_core::error::CoreError;
use linksters_notify::BridgeError;
use serde_json::json;

/// Application-level error type for services and HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds store, bridge and cache
/// variants. Implements [`IntoResponse`] to produce consistent JSON error
/// responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `linksters_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A store operation overran its deadline and was abandoned.
    #[error("Store operation timed out after {0:?}")]
    StoreTimeout(Duration),

    /// A notification bridge call failed.
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    /// The mutation committed but the read cache could not be rebuilt.
    #[error("Cache refresh failed: {0}")]
    CacheRefresh(String),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for service and handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn not_found(entity: &'static str, id: linksters_core::types::DbId) -> Self {
        AppError::Core(CoreError::NotFound { entity, id })
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Core(CoreError::Validation(msg.into()))
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        AppError::Core(CoreError::Conflict(msg.into()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal error occurred".to_string(),
                    )
                }
            },

            // --- Store errors ---
            AppError::Database(err) => classify_sqlx_error(err),
            AppError::StoreTimeout(after) => {
                tracing::error!(after = ?after, "Store operation timed out");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "STORE_TIMEOUT",
                    "The database did not respond in time".to_string(),
                )
            }

            // --- Notification bridge ---
            AppError::Bridge(err) => {
                tracing::error!(error = %err, "Notification bridge error");
                (
                    StatusCode::BAD_GATEWAY,
                    "BRIDGE_ERROR",
                    format!("Notification service error during {}", err.operation()),
                )
            }

            // --- Cache ---
            AppError::CacheRefresh(msg) => {
                tracing::error!(error = %msg, "Cache refresh failed");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "CACHE_REFRESH_FAILED",
                    "The change was saved but the read cache could not be rebuilt".to_string(),
                )
            }

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Unique and foreign-key violations map to 409.
/// - Pool exhaustion maps to 503.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => (
            StatusCode::CONFLICT,
            "CONFLICT",
            "Duplicate value violates a unique constraint".to_string(),
        ),
        sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => (
            StatusCode::CONFLICT,
            "CONFLICT",
            "The record is still referenced by other records".to_string(),
        ),
        sqlx::Error::PoolTimedOut => {
            tracing::error!("Database pool exhausted");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "STORE_TIMEOUT",
                "The database did not respond in time".to_string(),
            )
        }
        other => {
            tracing::error!(error = %other, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
    }
}
