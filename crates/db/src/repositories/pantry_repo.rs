//! Repository for the `user_pantries` table.
//!
//! Pantry item CRUD lives in the account service; only the expiring-items
//! sweep reads through this repo.

use chrono::NaiveDate;
use sqlx::PgPool;

use crate::models::pantry::ExpiringPantryItem;

/// Provides read operations for the expiring-items sweep.
pub struct PantryRepo;

impl PantryRepo {
    /// Items expiring within `[today, today + window_days]` whose owner has
    /// a contact address.
    pub async fn find_expiring(
        pool: &PgPool,
        today: NaiveDate,
        window_days: i64,
    ) -> Result<Vec<ExpiringPantryItem>, sqlx::Error> {
        let until = today + chrono::Duration::days(window_days);
        sqlx::query_as::<_, ExpiringPantryItem>(
            "SELECT p.id, p.user_id, p.ingredient_name, p.expiry_date, u.email \
             FROM user_pantries p \
             JOIN users u ON u.id = p.user_id \
             WHERE p.expiry_date IS NOT NULL \
               AND p.expiry_date BETWEEN $1 AND $2 \
               AND u.email IS NOT NULL \
             ORDER BY p.expiry_date ASC",
        )
        .bind(today)
        .bind(until)
        .fetch_all(pool)
        .await
    }
}
