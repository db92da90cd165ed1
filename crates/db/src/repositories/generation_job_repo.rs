//! Repository for the `generation_jobs` table.

use sqlx::PgPool;

use ladle_core::types::DbId;

use crate::models::generation_job::{job_status, GenerationJob, SubmitGenerationJob};

/// Column list for `generation_jobs` queries.
const COLUMNS: &str = "\
    id, user_id, ingredients, options, request_id, status, attempts, \
    last_error, recipe_id, submitted_at, claimed_at, completed_at, \
    created_at, updated_at";

/// Provides queue operations for background generation jobs.
pub struct GenerationJobRepo;

impl GenerationJobRepo {
    /// Enqueue a new pending job. Returns immediately with the job row.
    pub async fn submit(
        pool: &PgPool,
        input: &SubmitGenerationJob,
    ) -> Result<GenerationJob, sqlx::Error> {
        let query = format!(
            "INSERT INTO generation_jobs (user_id, ingredients, options, request_id, status) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GenerationJob>(&query)
            .bind(input.user_id)
            .bind(&input.ingredients)
            .bind(&input.options)
            .bind(&input.request_id)
            .bind(job_status::PENDING)
            .fetch_one(pool)
            .await
    }

    /// Atomically claim the oldest unclaimed pending job.
    ///
    /// Uses `SELECT FOR UPDATE SKIP LOCKED` so that multiple workers never
    /// double-claim the same job.
    pub async fn claim_next(pool: &PgPool) -> Result<Option<GenerationJob>, sqlx::Error> {
        let query = format!(
            "UPDATE generation_jobs \
             SET status = $1, claimed_at = NOW(), updated_at = NOW() \
             WHERE id = ( \
                 SELECT id FROM generation_jobs \
                 WHERE status = $2 AND claimed_at IS NULL \
                 ORDER BY submitted_at ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GenerationJob>(&query)
            .bind(job_status::RUNNING)
            .bind(job_status::PENDING)
            .fetch_optional(pool)
            .await
    }

    /// Mark a job as completed with the recipe it produced and the number
    /// of attempts it took.
    pub async fn complete(
        pool: &PgPool,
        job_id: DbId,
        recipe_id: DbId,
        attempts: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE generation_jobs \
             SET status = $2, recipe_id = $3, attempts = $4, \
                 completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(job_id)
        .bind(job_status::COMPLETED)
        .bind(recipe_id)
        .bind(attempts)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Mark a job as permanently failed after retry exhaustion.
    pub async fn fail(
        pool: &PgPool,
        job_id: DbId,
        error: &str,
        attempts: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE generation_jobs \
             SET status = $2, last_error = $3, attempts = $4, \
                 completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(job_id)
        .bind(job_status::FAILED)
        .bind(error)
        .bind(attempts)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Find a job by its ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<GenerationJob>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM generation_jobs WHERE id = $1");
        sqlx::query_as::<_, GenerationJob>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
