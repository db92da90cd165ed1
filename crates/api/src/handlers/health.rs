//! Liveness/readiness endpoint.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::error::AppResult;
use crate::state::AppState;

/// GET /health
///
/// Verifies database connectivity and reports the service as up.
pub async fn health(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    ladle_db::health_check(&state.pool).await?;
    Ok(Json(serde_json::json!({ "status": "ok" })))
}
