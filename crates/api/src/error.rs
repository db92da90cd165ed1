//! Application-level error type for HTTP handlers.
//!
//! Wraps [`CoreError`] and [`GenerationError`] for domain errors and adds
//! HTTP-specific variants. Implements [`IntoResponse`] to produce
//! consistent JSON error responses with stable machine-readable codes, so
//! the presentation layer can distinguish "you've hit your limit" (429)
//! from "try again" (502) from "change your input" (422).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use ladle_core::error::CoreError;
use ladle_pipeline::GenerationError;

/// Application-level error type for HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `ladle-core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A pipeline failure from a generation run.
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A missing resource identified by something other than a numeric id
    /// (e.g. a recipe slug).
    #[error("Not found: {0}")]
    NotFound(String),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Quota denials carry extra fields, so they build their own body.
        if let AppError::Generation(GenerationError::QuotaExceeded { message, retry_at }) = &self {
            let body = json!({
                "error": message,
                "code": "QUOTA_EXCEEDED",
                "remaining": 0,
                "retry_at": retry_at,
            });
            return (StatusCode::TOO_MANY_REQUESTS, axum::Json(body)).into_response();
        }

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
                CoreError::Unauthorized(msg) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
                }
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

            // --- Pipeline errors ---
            AppError::Generation(gen) => match gen {
                GenerationError::QuotaExceeded { .. } => unreachable!("handled above"),
                GenerationError::Inference(e) => {
                    tracing::error!(error = %e, "Inference failure surfaced to client");
                    (
                        StatusCode::BAD_GATEWAY,
                        "GENERATION_UNAVAILABLE",
                        "Failed to generate recipe. Please try again.".to_string(),
                    )
                }
                GenerationError::AttemptTimedOut(_) => (
                    StatusCode::BAD_GATEWAY,
                    "GENERATION_UNAVAILABLE",
                    "Failed to generate recipe. Please try again.".to_string(),
                ),
                GenerationError::InvalidOutput(reason) => {
                    tracing::warn!(reason = %reason, "Model output rejected");
                    (
                        StatusCode::UNPROCESSABLE_ENTITY,
                        "INVALID_MODEL_OUTPUT",
                        "The generated recipe was unusable. Try adjusting your ingredients."
                            .to_string(),
                    )
                }
                GenerationError::Persistence(e) => {
                    tracing::error!(error = %e, "Persistence failure in pipeline");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal error occurred".to_string(),
                    )
                }
            },

            // --- Database errors ---
            AppError::Database(err) => classify_sqlx_error(err),

            // --- HTTP-specific errors ---
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
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
/// - Unique constraint violations (constraint name starting with `uq_`) map to 409.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        sqlx::Error::Database(db_err) => {
            // PostgreSQL unique constraint violation: error code 23505
            if db_err.code().as_deref() == Some("23505") {
                let constraint = db_err.constraint().unwrap_or("unknown");
                if constraint.starts_with("uq_") {
                    return (
                        StatusCode::CONFLICT,
                        "CONFLICT",
                        format!("Duplicate value violates unique constraint: {constraint}"),
                    );
                }
            }
            tracing::error!(error = %db_err, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
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

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use ladle_core::validate::ValidationFailure;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body should collect")
            .to_bytes();
        serde_json::from_slice(&bytes).expect("body should be JSON")
    }

    #[tokio::test]
    async fn quota_exceeded_maps_to_429_with_remaining_zero() {
        let err = AppError::Generation(GenerationError::QuotaExceeded {
            message: "You have reached your daily limit".to_string(),
            retry_at: chrono::Utc::now(),
        });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let body = body_json(response).await;
        assert_eq!(body["code"], "QUOTA_EXCEEDED");
        assert_eq!(body["remaining"], 0);
        assert!(body["retry_at"].is_string());
    }

    #[tokio::test]
    async fn invalid_output_maps_to_422() {
        let err = AppError::Generation(GenerationError::InvalidOutput(
            ValidationFailure::MissingField("instructions"),
        ));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = body_json(response).await;
        assert_eq!(body["code"], "INVALID_MODEL_OUTPUT");
    }

    #[tokio::test]
    async fn transient_inference_failure_maps_to_502() {
        let err = AppError::Generation(GenerationError::AttemptTimedOut(120));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let body = body_json(response).await;
        assert_eq!(body["code"], "GENERATION_UNAVAILABLE");
    }

    #[tokio::test]
    async fn core_not_found_maps_to_404() {
        let err = AppError::Core(CoreError::NotFound {
            entity: "Recipe",
            id: 12,
        });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn bad_request_maps_to_400() {
        let response = AppError::BadRequest("servings out of range".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
