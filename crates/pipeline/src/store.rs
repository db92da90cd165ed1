//! Storage seams and their Postgres adapters.
//!
//! The pipeline needs exactly three things from persistence: create a
//! recipe, append/count generation-log entries, and read user accounts.
//! Each is an async trait with a thin adapter over the `ladle-db`
//! repositories; tests swap in in-memory fakes.

use async_trait::async_trait;
use serde::Serialize;

use ladle_core::types::{DbId, Timestamp};
use ladle_core::validate::RecipeDraft;
use ladle_db::models::generation_log::NewGenerationLog;
use ladle_db::models::recipe::CreateRecipe;
use ladle_db::repositories::{GenerationLogRepo, RecipeRepo, UserRepo};
use ladle_db::DbPool;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Storage failure surfaced to the pipeline.
///
/// Deliberately stringly-typed at this boundary: the pipeline treats every
/// persistence failure as fatal for the attempt, so the only thing it needs
/// is a message for the log entry and the caller.
#[derive(Debug, thiserror::Error)]
#[error("storage error: {0}")]
pub struct StoreError(pub String);

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Recipes
// ---------------------------------------------------------------------------

/// Input for persisting a validated recipe.
#[derive(Debug, Clone)]
pub struct NewRecipe {
    pub draft: RecipeDraft,
    pub slug: String,
    pub owner: Option<DbId>,
    /// Generation metadata stored alongside the recipe (model id, tags,
    /// request id).
    pub metadata: serde_json::Value,
}

/// The persisted recipe as the pipeline and its cache see it.
#[derive(Debug, Clone, Serialize)]
pub struct RecipeRecord {
    pub id: DbId,
    pub slug: String,
    pub title: String,
    /// The full recipe row, serialized for API responses and the cache.
    pub recipe: serde_json::Value,
}

/// Creates recipe rows.
#[async_trait]
pub trait RecipeStore: Send + Sync {
    /// Single atomic insert: a failed generation never leaves a partial
    /// recipe behind.
    async fn create(&self, input: NewRecipe) -> Result<RecipeRecord, StoreError>;
}

// ---------------------------------------------------------------------------
// Generation log
// ---------------------------------------------------------------------------

/// Appends and counts generation-log entries.
#[async_trait]
pub trait GenerationLogStore: Send + Sync {
    /// Append-only insert; entries are never updated.
    async fn append(&self, entry: NewGenerationLog) -> Result<(), StoreError>;

    /// A user's successful generations on the given calendar day, which
    /// is the authoritative quota count.
    async fn count_success_on(
        &self,
        user_id: DbId,
        day: chrono::NaiveDate,
    ) -> Result<i64, StoreError>;
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// The slice of an account the quota gate needs.
#[derive(Debug, Clone)]
pub struct UserAccount {
    pub id: DbId,
    pub tier: String,
    pub premium_until: Option<Timestamp>,
}

/// Reads user accounts and bumps the informational daily counter.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find(&self, id: DbId) -> Result<Option<UserAccount>, StoreError>;

    /// Best-effort; the generation log remains authoritative.
    async fn increment_daily_counter(&self, id: DbId) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// Postgres adapters
// ---------------------------------------------------------------------------

/// [`RecipeStore`] over the `recipes` table.
pub struct PgRecipeStore {
    pool: DbPool,
}

impl PgRecipeStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecipeStore for PgRecipeStore {
    async fn create(&self, input: NewRecipe) -> Result<RecipeRecord, StoreError> {
        let draft = input.draft;
        let create = CreateRecipe {
            title: draft.title.clone(),
            slug: input.slug,
            description: draft.description,
            user_id: input.owner,
            cuisine: Some(draft.cuisine),
            difficulty: draft.difficulty,
            prep_time: Some(draft.prep_time),
            cook_time: Some(draft.cook_time),
            servings: draft.servings,
            ingredients: serde_json::Value::Array(draft.ingredients),
            instructions: serde_json::Value::Array(
                draft
                    .instructions
                    .into_iter()
                    .map(serde_json::Value::String)
                    .collect(),
            ),
            nutritional_info: draft.nutritional_estimate.map(serde_json::Value::Object),
            ai_metadata: input.metadata,
            is_public: true,
        };
        let row = RecipeRepo::create(&self.pool, &create).await?;
        let recipe = serde_json::to_value(&row)
            .map_err(|e| StoreError(format!("recipe serialization failed: {e}")))?;
        Ok(RecipeRecord {
            id: row.id,
            slug: row.slug,
            title: row.title,
            recipe,
        })
    }
}

/// [`GenerationLogStore`] over the `generation_logs` table.
pub struct PgGenerationLogStore {
    pool: DbPool,
}

impl PgGenerationLogStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GenerationLogStore for PgGenerationLogStore {
    async fn append(&self, entry: NewGenerationLog) -> Result<(), StoreError> {
        GenerationLogRepo::append(&self.pool, &entry).await?;
        Ok(())
    }

    async fn count_success_on(
        &self,
        user_id: DbId,
        day: chrono::NaiveDate,
    ) -> Result<i64, StoreError> {
        Ok(GenerationLogRepo::count_success_on(&self.pool, user_id, day).await?)
    }
}

/// [`UserStore`] over the `users` table.
pub struct PgUserStore {
    pool: DbPool,
}

impl PgUserStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find(&self, id: DbId) -> Result<Option<UserAccount>, StoreError> {
        let user = UserRepo::find_by_id(&self.pool, id).await?;
        Ok(user.map(|u| UserAccount {
            id: u.id,
            tier: u.tier,
            premium_until: u.premium_until,
        }))
    }

    async fn increment_daily_counter(&self, id: DbId) -> Result<(), StoreError> {
        UserRepo::increment_daily_counter(&self.pool, id).await?;
        Ok(())
    }
}
