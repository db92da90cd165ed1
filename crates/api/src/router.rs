//! API route table.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{detect, generate, health, recipes};
use crate::state::AppState;

/// Routes mounted under `/api/v1`.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/recipes/generate", post(generate::generate))
        .route("/recipes/generate-async", post(generate::enqueue))
        .route("/recipes/quota", get(generate::quota_status))
        .route("/jobs/{id}", get(generate::job_status))
        .route("/ingredients/detect", post(detect::detect_ingredients))
        .route(
            "/recipes/{slug}",
            get(recipes::show).delete(recipes::destroy),
        )
        .route("/recipes/{slug}/save", post(recipes::save))
        .route("/recipes/{slug}/modify", post(recipes::modify))
}

/// Root-level health check (not under `/api/v1`).
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health::health))
}
