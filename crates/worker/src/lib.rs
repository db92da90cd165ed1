//! Queue worker for background generation jobs.
//!
//! Each worker claims one pending job at a time (`FOR UPDATE SKIP LOCKED`
//! keeps concurrent workers off each other's jobs), rebuilds the original
//! generation request, and runs it through the pipeline's bounded-retry
//! path. Job rows record the outcome and the attempt count.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use ladle_core::request::{GenerationOptions, GenerationRequest, Requester};
use ladle_db::models::generation_job::GenerationJob;
use ladle_db::repositories::GenerationJobRepo;
use ladle_db::DbPool;
use ladle_pipeline::{Orchestrator, RetryPolicy};

/// Interval between queue polls when no job is pending.
const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Pause after a queue error before polling again.
const ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Rebuild a [`GenerationRequest`] from a persisted job row.
///
/// Guest jobs re-enter without their original IP (it is never persisted),
/// and quota was settled at enqueue time, so the queued path never consults
/// the gate again.
pub fn request_from_job(job: &GenerationJob) -> Result<GenerationRequest, serde_json::Error> {
    let ingredients: Vec<String> = serde_json::from_value(job.ingredients.clone())?;
    let options: GenerationOptions = serde_json::from_value(job.options.clone())?;
    let requester = match job.user_id {
        Some(id) => Requester::User { id },
        None => Requester::Guest {
            ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        },
    };
    Ok(GenerationRequest {
        ingredients,
        options,
        requester,
        request_id: job.request_id.clone(),
    })
}

/// Claim-and-execute loop. Runs until cancelled.
pub async fn run_worker_loop(
    pool: DbPool,
    orchestrator: Arc<Orchestrator>,
    policy: RetryPolicy,
    cancel: CancellationToken,
) {
    tracing::info!("Worker loop started");
    loop {
        if cancel.is_cancelled() {
            break;
        }
        match GenerationJobRepo::claim_next(&pool).await {
            Ok(Some(job)) => process_job(&pool, &orchestrator, &policy, job).await,
            Ok(None) => {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(POLL_INTERVAL) => {}
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to poll job queue");
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(ERROR_BACKOFF) => {}
                }
            }
        }
    }
    tracing::info!("Worker loop stopped");
}

/// Execute one claimed job and record its outcome.
async fn process_job(
    pool: &DbPool,
    orchestrator: &Orchestrator,
    policy: &RetryPolicy,
    job: GenerationJob,
) {
    tracing::info!(job_id = job.id, user_id = ?job.user_id, "Processing generation job");

    let request = match request_from_job(&job) {
        Ok(request) => request,
        Err(e) => {
            tracing::error!(job_id = job.id, error = %e, "Corrupt job payload");
            if let Err(e) =
                GenerationJobRepo::fail(pool, job.id, &format!("corrupt job payload: {e}"), 0).await
            {
                tracing::error!(job_id = job.id, error = %e, "Failed to mark job failed");
            }
            return;
        }
    };

    let (attempts, result) = orchestrator.run_queued(&request, policy).await;

    match result {
        Ok(outcome) => {
            tracing::info!(
                job_id = job.id,
                recipe_id = outcome.recipe.id,
                attempts,
                from_cache = outcome.from_cache,
                "Generation job completed",
            );
            if let Err(e) =
                GenerationJobRepo::complete(pool, job.id, outcome.recipe.id, attempts as i32).await
            {
                tracing::error!(job_id = job.id, error = %e, "Failed to mark job completed");
            }
        }
        Err(error) => {
            tracing::error!(job_id = job.id, attempts, error = %error, "Generation job failed");
            if let Err(e) =
                GenerationJobRepo::fail(pool, job.id, &error.to_string(), attempts as i32).await
            {
                tracing::error!(job_id = job.id, error = %e, "Failed to mark job failed");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn job_row(
        user_id: Option<i64>,
        ingredients: serde_json::Value,
        options: serde_json::Value,
    ) -> GenerationJob {
        let now = Utc::now();
        GenerationJob {
            id: 1,
            user_id,
            ingredients,
            options,
            request_id: Some("req-9".to_string()),
            status: "pending".to_string(),
            attempts: 0,
            last_error: None,
            recipe_id: None,
            submitted_at: now,
            claimed_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn user_job_round_trips_into_a_request() {
        let job = job_row(
            Some(7),
            serde_json::json!(["egg", "milk"]),
            serde_json::json!({"cuisine": "Thai", "servings": 4, "dietary_restrictions": ["vegan"]}),
        );
        let request = request_from_job(&job).expect("payload should parse");

        assert_eq!(request.ingredients, vec!["egg", "milk"]);
        assert_eq!(request.options.cuisine.as_deref(), Some("Thai"));
        assert_eq!(request.options.servings, Some(4));
        assert_eq!(request.requester, Requester::User { id: 7 });
        assert_eq!(request.request_id.as_deref(), Some("req-9"));
    }

    #[test]
    fn guest_job_gets_a_placeholder_ip() {
        let job = job_row(None, serde_json::json!(["egg"]), serde_json::json!({}));
        let request = request_from_job(&job).expect("payload should parse");
        assert!(matches!(request.requester, Requester::Guest { .. }));
    }

    #[test]
    fn corrupt_ingredients_payload_is_rejected() {
        let job = job_row(None, serde_json::json!("not-a-list"), serde_json::json!({}));
        assert!(request_from_job(&job).is_err());
    }
}
