//! Repository for the `users` table.
//!
//! Read-mostly: account creation and authentication are an external
//! service's concern. The pipeline reads tier/expiry for quota decisions
//! and bumps the best-effort daily counter.

use sqlx::PgPool;

use ladle_core::types::DbId;

use crate::models::user::User;

/// Column list for `users` queries.
const COLUMNS: &str = "id, name, email, tier, premium_until, \
    daily_generation_counter, created_at, updated_at";

/// Provides read operations for user accounts.
pub struct UserRepo;

impl UserRepo {
    /// Find a user by primary key.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Best-effort bump of the user's daily generation counter.
    ///
    /// The counter is informational (shown on the dashboard); the
    /// generation log is the authoritative quota source.
    pub async fn increment_daily_counter(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users \
             SET daily_generation_counter = daily_generation_counter + 1, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }
}
