//! Repository for the `generation_logs` table.
//!
//! Pure inserts only; entries are never updated or deleted (bulk retention
//! is an operational concern outside this crate).

use chrono::NaiveDate;
use sqlx::PgPool;

use ladle_core::types::DbId;

use crate::models::generation_log::{GenerationLogEntry, NewGenerationLog, STATUS_SUCCESS};

/// Column list for `generation_logs` queries.
const COLUMNS: &str = "id, user_id, inputs, model_used, tokens_consumed, \
    response_time, status, error_message, cost_estimate, created_at";

/// Provides append and count operations for the generation audit log.
pub struct GenerationLogRepo;

impl GenerationLogRepo {
    /// Append one log entry, returning the created row.
    pub async fn append(
        pool: &PgPool,
        input: &NewGenerationLog,
    ) -> Result<GenerationLogEntry, sqlx::Error> {
        let query = format!(
            "INSERT INTO generation_logs \
                 (user_id, inputs, model_used, tokens_consumed, response_time, \
                  status, error_message, cost_estimate) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GenerationLogEntry>(&query)
            .bind(input.user_id)
            .bind(&input.inputs)
            .bind(&input.model_used)
            .bind(input.tokens_consumed)
            .bind(input.response_time)
            .bind(&input.status)
            .bind(&input.error_message)
            .bind(input.cost_estimate)
            .fetch_one(pool)
            .await
    }

    /// Count a user's successful generations on the given calendar day.
    ///
    /// This is the authoritative quota count for authenticated users.
    pub async fn count_success_on(
        pool: &PgPool,
        user_id: DbId,
        day: NaiveDate,
    ) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM generation_logs \
             WHERE user_id = $1 AND status = $2 AND created_at::date = $3",
        )
        .bind(user_id)
        .bind(STATUS_SUCCESS)
        .bind(day)
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }

    /// List a user's most recent entries, newest first.
    pub async fn list_recent_for_user(
        pool: &PgPool,
        user_id: DbId,
        limit: i64,
    ) -> Result<Vec<GenerationLogEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM generation_logs \
             WHERE user_id = $1 \
             ORDER BY created_at DESC \
             LIMIT $2"
        );
        sqlx::query_as::<_, GenerationLogEntry>(&query)
            .bind(user_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
