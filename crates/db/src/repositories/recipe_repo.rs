//! Repository for the `recipes` table.
//!
//! Recipes are created only by a successful pipeline run. Soft-deleted rows
//! (`deleted_at IS NOT NULL`) are invisible to every read path.

use sqlx::PgPool;

use ladle_core::types::DbId;

use crate::models::recipe::{CreateRecipe, Recipe, UpdateRecipeContent};

/// Column list for `recipes` queries.
const COLUMNS: &str = "\
    id, title, slug, description, user_id, cuisine, difficulty, \
    prep_time, cook_time, servings, ingredients, instructions, \
    nutritional_info, ai_metadata, is_public, is_featured, \
    views, saves, deleted_at, created_at, updated_at";

/// Provides CRUD operations for recipes.
pub struct RecipeRepo;

impl RecipeRepo {
    /// Insert a new recipe, returning the created row.
    ///
    /// This is a single atomic insert: a failed generation never leaves a
    /// partial recipe behind.
    pub async fn create(pool: &PgPool, input: &CreateRecipe) -> Result<Recipe, sqlx::Error> {
        let query = format!(
            "INSERT INTO recipes \
                 (title, slug, description, user_id, cuisine, difficulty, \
                  prep_time, cook_time, servings, ingredients, instructions, \
                  nutritional_info, ai_metadata, is_public) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Recipe>(&query)
            .bind(&input.title)
            .bind(&input.slug)
            .bind(&input.description)
            .bind(input.user_id)
            .bind(&input.cuisine)
            .bind(&input.difficulty)
            .bind(input.prep_time)
            .bind(input.cook_time)
            .bind(input.servings)
            .bind(&input.ingredients)
            .bind(&input.instructions)
            .bind(&input.nutritional_info)
            .bind(&input.ai_metadata)
            .bind(input.is_public)
            .fetch_one(pool)
            .await
    }

    /// Find a recipe by primary key, excluding soft-deleted rows.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Recipe>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM recipes WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Recipe>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a recipe by slug, excluding soft-deleted rows.
    pub async fn find_by_slug(pool: &PgPool, slug: &str) -> Result<Option<Recipe>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM recipes WHERE slug = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Recipe>(&query)
            .bind(slug)
            .fetch_optional(pool)
            .await
    }

    /// Increment the view counter.
    pub async fn increment_views(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE recipes SET views = views + 1 WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Increment the save counter.
    pub async fn increment_saves(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE recipes SET saves = saves + 1 WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Replace a recipe's content after a premium modification.
    pub async fn update_content(
        pool: &PgPool,
        id: DbId,
        input: &UpdateRecipeContent,
    ) -> Result<Recipe, sqlx::Error> {
        let query = format!(
            "UPDATE recipes \
             SET title = $2, description = $3, ingredients = $4, instructions = $5, \
                 nutritional_info = $6, ai_metadata = $7, updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Recipe>(&query)
            .bind(id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(&input.ingredients)
            .bind(&input.instructions)
            .bind(&input.nutritional_info)
            .bind(&input.ai_metadata)
            .fetch_one(pool)
            .await
    }

    /// Soft-delete a recipe. Returns `true` if a live row was marked.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE recipes SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL")
                .bind(id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}
