//! Handler for image-based ingredient detection.
//!
//! Route: `POST /ingredients/detect` (multipart, field `image`).

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use ladle_inference::InferenceError;
use ladle_pipeline::GenerationError;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Multipart field carrying the photo.
const IMAGE_FIELD: &str = "image";

/// POST /api/v1/ingredients/detect
///
/// Accepts an uploaded photo, scales it down, and asks the vision model
/// for ingredient detections. An empty detection list is a 422 so clients
/// can prompt the user for a clearer photo.
pub async fn detect_ingredients(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Response> {
    let mut image: Option<axum::body::Bytes> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        if field.name() == Some(IMAGE_FIELD) {
            image = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("failed to read image: {e}")))?,
            );
        }
    }
    let image = image.ok_or_else(|| {
        AppError::BadRequest(format!("multipart field \"{IMAGE_FIELD}\" is required"))
    })?;

    let detections = state
        .inference
        .detect_ingredients(&image)
        .await
        .map_err(|e| match e {
            // A bad upload is the client's problem, not the provider's.
            InferenceError::Image(msg) => {
                AppError::BadRequest(format!("Failed to process image: {msg}"))
            }
            other => AppError::Generation(GenerationError::Inference(other)),
        })?;

    if detections.is_empty() {
        let body = serde_json::json!({
            "error": "No ingredients detected. Please try a clearer photo or add ingredients manually.",
            "ingredients": [],
        });
        return Ok((StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response());
    }

    Ok(Json(DataResponse {
        data: serde_json::json!({
            "ingredients": detections,
            "message": "Ingredients detected successfully!",
        }),
    })
    .into_response())
}
