//! Recipe read, counter, modification, and deletion handlers.
//!
//! Routes:
//! - `GET    /recipes/{slug}`        — show a recipe, bumping its view count
//! - `POST   /recipes/{slug}/save`   — save to library (authenticated)
//! - `POST   /recipes/{slug}/modify` — premium AI modification (owner only)
//! - `DELETE /recipes/{slug}`        — soft delete (owner only)

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use validator::Validate;

use ladle_core::error::CoreError;
use ladle_core::quota;
use ladle_core::types::DbId;
use ladle_core::validate;
use ladle_db::models::recipe::{Recipe, UpdateRecipeContent};
use ladle_db::repositories::{RecipeRepo, UserRepo};
use ladle_pipeline::GenerationError;

use crate::error::{AppError, AppResult};
use crate::extract::{RequesterContext, USER_ID_HEADER};
use crate::response::DataResponse;
use crate::state::AppState;

/// Load a live recipe by slug or 404.
async fn load_recipe(state: &AppState, slug: &str) -> Result<Recipe, AppError> {
    RecipeRepo::find_by_slug(&state.pool, slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Recipe \"{slug}\" not found")))
}

/// GET /api/v1/recipes/{slug}
///
/// Returns the recipe and bumps its view counter. Works for guests, so
/// the optional viewer id is read straight from the trusted header.
pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    let recipe = load_recipe(&state, &slug).await?;

    // View counting is best-effort.
    if let Err(e) = RecipeRepo::increment_views(&state.pool, recipe.id).await {
        tracing::warn!(recipe_id = recipe.id, error = %e, "Failed to bump view counter");
    }

    let viewer_id: Option<DbId> = headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse().ok());
    let is_owner = viewer_id.is_some() && viewer_id == recipe.user_id;

    Ok(Json(DataResponse {
        data: serde_json::json!({
            "recipe": recipe,
            "is_owner": is_owner,
        }),
    }))
}

/// POST /api/v1/recipes/{slug}/save
///
/// Bumps the save counter. Owners get a friendly no-op.
pub async fn save(
    State(state): State<AppState>,
    requester: RequesterContext,
    Path(slug): Path<String>,
) -> AppResult<impl IntoResponse> {
    let user_id = requester.require_user("Please sign in to save recipes.")?;
    let recipe = load_recipe(&state, &slug).await?;

    if recipe.user_id == Some(user_id) {
        return Ok(Json(DataResponse {
            data: serde_json::json!({
                "message": "Recipe is already in your library.",
                "saved": false,
            }),
        }));
    }

    RecipeRepo::increment_saves(&state.pool, recipe.id).await?;

    Ok(Json(DataResponse {
        data: serde_json::json!({
            "message": "Recipe saved successfully!",
            "saved": true,
        }),
    }))
}

/// Request body for recipe modification.
#[derive(Debug, Deserialize, Validate)]
pub struct ModifyRecipeRequest {
    #[validate(length(min = 1, max = 500, message = "modification must be 1-500 characters"))]
    pub modification: String,
}

/// POST /api/v1/recipes/{slug}/modify
///
/// Premium-gated AI modification. The model's answer passes through the
/// same structural validator as fresh generations before anything is
/// written.
pub async fn modify(
    State(state): State<AppState>,
    requester: RequesterContext,
    Path(slug): Path<String>,
    Json(input): Json<ModifyRecipeRequest>,
) -> AppResult<impl IntoResponse> {
    input
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let user_id = requester.require_user("Please sign in to modify recipes.")?;
    let user = UserRepo::find_by_id(&state.pool, user_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Unauthorized("Unknown account".to_string())))?;

    if !quota::is_premium(&user.tier, user.premium_until, chrono::Utc::now()) {
        return Err(AppError::Core(CoreError::Forbidden(
            "Premium feature. Upgrade to modify recipes.".to_string(),
        )));
    }

    let recipe = load_recipe(&state, &slug).await?;
    if recipe.user_id != Some(user_id) {
        return Err(AppError::Core(CoreError::Forbidden(
            "You can only modify your own recipes.".to_string(),
        )));
    }

    let original = serde_json::json!({
        "title": recipe.title,
        "description": recipe.description,
        "ingredients": recipe.ingredients,
        "instructions": recipe.instructions,
        "nutritional_estimate": recipe.nutritional_info,
    });

    let modified = state
        .inference
        .modify(&original, &input.modification)
        .await
        .map_err(|e| AppError::Generation(GenerationError::Inference(e)))?;

    // The modified payload re-enters through the structural validator;
    // the provider is never trusted twice.
    let draft = validate::validate(&modified)
        .map_err(|reason| AppError::Generation(GenerationError::InvalidOutput(reason)))?;

    let mut metadata = recipe
        .ai_metadata
        .clone()
        .and_then(|v| v.as_object().cloned())
        .unwrap_or_default();
    metadata.insert("modified".to_string(), serde_json::json!(true));
    metadata.insert(
        "modification_request".to_string(),
        serde_json::json!(input.modification),
    );
    metadata.insert(
        "modified_at".to_string(),
        serde_json::json!(chrono::Utc::now()),
    );

    let update = UpdateRecipeContent {
        title: draft.title,
        description: draft.description,
        ingredients: serde_json::Value::Array(draft.ingredients),
        instructions: serde_json::Value::Array(
            draft
                .instructions
                .into_iter()
                .map(serde_json::Value::String)
                .collect(),
        ),
        nutritional_info: draft.nutritional_estimate.map(serde_json::Value::Object),
        ai_metadata: serde_json::Value::Object(metadata),
    };
    let updated = RecipeRepo::update_content(&state.pool, recipe.id, &update).await?;

    Ok(Json(DataResponse {
        data: serde_json::json!({
            "message": "Recipe modified successfully!",
            "recipe": updated,
        }),
    }))
}

/// DELETE /api/v1/recipes/{slug}
///
/// Owner-only soft delete, the only way a recipe ever disappears.
pub async fn destroy(
    State(state): State<AppState>,
    requester: RequesterContext,
    Path(slug): Path<String>,
) -> AppResult<impl IntoResponse> {
    let user_id = requester.require_user("Please sign in to delete recipes.")?;
    let recipe = load_recipe(&state, &slug).await?;

    if recipe.user_id != Some(user_id) {
        return Err(AppError::Core(CoreError::Forbidden(
            "You can only delete your own recipes.".to_string(),
        )));
    }

    RecipeRepo::soft_delete(&state.pool, recipe.id).await?;

    Ok(Json(DataResponse {
        data: serde_json::json!({ "deleted": true }),
    }))
}
