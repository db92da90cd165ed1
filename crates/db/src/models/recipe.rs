//! Recipe entity models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use ladle_core::types::{DbId, Timestamp};

/// A row from the `recipes` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Recipe {
    pub id: DbId,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub user_id: Option<DbId>,
    pub cuisine: Option<String>,
    pub difficulty: String,
    pub prep_time: Option<i32>,
    pub cook_time: Option<i32>,
    pub servings: i32,
    pub ingredients: serde_json::Value,
    pub instructions: serde_json::Value,
    pub nutritional_info: Option<serde_json::Value>,
    pub ai_metadata: Option<serde_json::Value>,
    pub is_public: bool,
    pub is_featured: bool,
    pub views: i32,
    pub saves: i32,
    pub deleted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Input for persisting a freshly generated recipe.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRecipe {
    pub title: String,
    pub slug: String,
    pub description: String,
    pub user_id: Option<DbId>,
    pub cuisine: Option<String>,
    pub difficulty: String,
    pub prep_time: Option<i32>,
    pub cook_time: Option<i32>,
    pub servings: i32,
    pub ingredients: serde_json::Value,
    pub instructions: serde_json::Value,
    pub nutritional_info: Option<serde_json::Value>,
    pub ai_metadata: serde_json::Value,
    pub is_public: bool,
}

/// Input for replacing a recipe's content after a premium modification.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateRecipeContent {
    pub title: String,
    pub description: String,
    pub ingredients: serde_json::Value,
    pub instructions: serde_json::Value,
    pub nutritional_info: Option<serde_json::Value>,
    pub ai_metadata: serde_json::Value,
}
