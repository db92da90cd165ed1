//! Handlers for the generation pipeline.
//!
//! Routes:
//! - `POST /recipes/generate`       — synchronous generation (blocks on the
//!   provider round trip)
//! - `POST /recipes/generate-async` — enqueue a background generation job
//! - `GET  /recipes/quota`          — remaining daily allowance
//! - `GET  /jobs/{id}`              — queued job status

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use validator::Validate;

use ladle_core::request::{GenerationOptions, GenerationRequest};
use ladle_core::types::DbId;
use ladle_db::models::generation_job::SubmitGenerationJob;
use ladle_db::repositories::GenerationJobRepo;
use ladle_pipeline::quota_gate::QuotaCheck;
use ladle_pipeline::GenerationError;

use crate::error::{AppError, AppResult};
use crate::extract::RequesterContext;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body shared by the synchronous and queued endpoints.
#[derive(Debug, Deserialize, Validate)]
pub struct GenerateRecipeRequest {
    #[validate(length(min = 1, message = "at least one ingredient is required"))]
    pub ingredients: Vec<String>,
    pub cuisine: Option<String>,
    pub difficulty: Option<String>,
    #[serde(default)]
    pub dietary_restrictions: Vec<String>,
    pub time: Option<String>,
    #[validate(range(min = 1, max = 10, message = "servings must be between 1 and 10"))]
    pub servings: Option<i32>,
    /// Optional client-supplied id carried into the generation log.
    pub request_id: Option<String>,
}

impl GenerateRecipeRequest {
    fn into_generation_request(self, requester: RequesterContext) -> GenerationRequest {
        GenerationRequest {
            ingredients: self.ingredients,
            options: GenerationOptions {
                cuisine: self.cuisine,
                difficulty: self.difficulty,
                dietary_restrictions: self.dietary_restrictions,
                time: self.time,
                servings: self.servings,
            },
            requester: requester.0,
            request_id: self.request_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GenerateRecipeResponse {
    pub recipe: serde_json::Value,
    pub slug: String,
    /// Whether the result was served from the generation cache.
    pub from_cache: bool,
}

/// POST /api/v1/recipes/generate
///
/// Runs the full pipeline on the request thread: cache, quota gate,
/// inference, validation, persistence, audit log, notification.
pub async fn generate(
    State(state): State<AppState>,
    requester: RequesterContext,
    Json(input): Json<GenerateRecipeRequest>,
) -> AppResult<impl IntoResponse> {
    input
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let request = input.into_generation_request(requester);
    request.validate().map_err(AppError::Core)?;

    let outcome = state.orchestrator.run(&request).await?;

    Ok(Json(DataResponse {
        data: GenerateRecipeResponse {
            slug: outcome.recipe.slug.clone(),
            recipe: outcome.recipe.recipe,
            from_cache: outcome.from_cache,
        },
    }))
}

/// POST /api/v1/recipes/generate-async
///
/// Checks quota up-front (the queued task never re-checks) and enqueues a
/// generation job for the worker pool. Returns 202 with the job id.
pub async fn enqueue(
    State(state): State<AppState>,
    requester: RequesterContext,
    Json(input): Json<GenerateRecipeRequest>,
) -> AppResult<impl IntoResponse> {
    input
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let request = input.into_generation_request(requester);
    request.validate().map_err(AppError::Core)?;

    match state.orchestrator.quota().check(&request.requester).await {
        Ok(QuotaCheck::Allowed { .. }) => {}
        Ok(QuotaCheck::Denied { message, retry_at }) => {
            return Err(AppError::Generation(GenerationError::QuotaExceeded {
                message,
                retry_at,
            }));
        }
        Err(e) => return Err(AppError::Generation(GenerationError::Persistence(e))),
    }

    let submit = SubmitGenerationJob {
        user_id: request.requester.user_id(),
        ingredients: serde_json::json!(request.ingredients),
        options: serde_json::to_value(&request.options)
            .map_err(|e| AppError::InternalError(format!("options serialization failed: {e}")))?,
        request_id: request.request_id,
    };
    let job = GenerationJobRepo::submit(&state.pool, &submit).await?;

    tracing::info!(job_id = job.id, "Generation job enqueued");

    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: serde_json::json!({
                "job_id": job.id,
                "status": job.status,
            }),
        }),
    ))
}

/// GET /api/v1/jobs/{id}
///
/// Status of a queued generation job.
pub async fn job_status(
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let job = GenerationJobRepo::find_by_id(&state.pool, job_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))?;

    Ok(Json(DataResponse { data: job }))
}

/// GET /api/v1/recipes/quota
///
/// Remaining generations for the requester today (`-1` means unlimited).
pub async fn quota_status(
    State(state): State<AppState>,
    requester: RequesterContext,
) -> AppResult<impl IntoResponse> {
    let remaining = state
        .orchestrator
        .quota()
        .remaining(&requester.0)
        .await
        .map_err(|e| AppError::Generation(GenerationError::Persistence(e)))?;

    Ok(Json(DataResponse {
        data: serde_json::json!({ "remaining": remaining }),
    }))
}
