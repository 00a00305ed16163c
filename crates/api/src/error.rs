use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use canopy_core::bulk::RowError;
use canopy_core::error::CoreError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses
/// in the `{ "success": false, "message": ... }` envelope.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `canopy_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A missing resource with a human-readable message (e.g. a bulk
    /// selection that matched nothing).
    #[error("Not found: {0}")]
    NotFound(String),

    /// A batch request where one or more rows failed validation.
    ///
    /// Carries the exhaustive per-row error list so the caller can fix
    /// every bad row in one resubmission.
    #[error("Batch validation failed: {message}")]
    BatchValidation {
        message: String,
        errors: Vec<RowError>,
    },

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Shorthand for a batch validation failure.
    pub fn batch_validation(message: impl Into<String>, errors: Vec<RowError>) -> Self {
        AppError::BatchValidation {
            message: message.into(),
            errors,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, errors, detail) = match self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    format!("{entity} with id {id} not found"),
                    None,
                    None,
                ),
                CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, msg, None, None),
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, msg, None, None),
                CoreError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg, None, None),
                CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg, None, None),
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    internal_error(msg)
                }
            },

            // --- Database errors ---
            AppError::Database(err) => classify_sqlx_error(err),

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None, None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None, None),
            AppError::BatchValidation { message, errors } => {
                (StatusCode::BAD_REQUEST, message, Some(errors), None)
            }
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal_error(msg)
            }
        };

        let mut body = json!({
            "success": false,
            "message": message,
        });
        if let Some(errors) = errors {
            body["errors"] = json!(errors);
        }
        if let Some(detail) = detail {
            body["error"] = json!(detail);
        }

        (status, axum::Json(body)).into_response()
    }
}

/// Build the 500 response tuple, exposing the failure detail only in debug
/// builds (production builds return the generic message alone).
fn internal_error(
    detail: String,
) -> (StatusCode, String, Option<Vec<RowError>>, Option<String>) {
    let detail = if cfg!(debug_assertions) {
        Some(detail)
    } else {
        None
    };
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "An internal error occurred".to_string(),
        None,
        detail,
    )
}

/// Classify a sqlx error into a response tuple.
///
/// - `RowNotFound` maps to 404.
/// - Unique constraint violations (constraint name starting with `uq_`) map to 409.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(
    err: sqlx::Error,
) -> (StatusCode, String, Option<Vec<RowError>>, Option<String>) {
    match &err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "Resource not found".to_string(),
            None,
            None,
        ),
        sqlx::Error::Database(db_err) => {
            // PostgreSQL unique constraint violation: error code 23505
            if db_err.code().as_deref() == Some("23505") {
                let constraint = db_err.constraint().unwrap_or("unknown");
                if constraint.starts_with("uq_") {
                    return (
                        StatusCode::CONFLICT,
                        format!("Duplicate value violates unique constraint: {constraint}"),
                        None,
                        None,
                    );
                }
            }
            tracing::error!(error = %db_err, "Database error");
            internal_error(db_err.to_string())
        }
        other => {
            tracing::error!(error = %other, "Database error");
            internal_error(other.to_string())
        }
    }
}
