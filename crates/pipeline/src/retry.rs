//! Bounded retry for queued generation tasks.
//!
//! The queued path wraps [`Orchestrator::execute_attempt`] in an explicit
//! policy descriptor: at most 3 attempts, a 120-second wall-clock ceiling
//! per attempt, linear backoff between attempts. Only transport-class
//! failures (including the attempt timeout) are retried; a validation
//! failure is deterministic for the same input and terminates the task
//! immediately. After exhaustion the permanent-failure hook fires and the
//! terminal error is returned for job bookkeeping.

use std::time::Duration;

use ladle_core::request::GenerationRequest;

use crate::error::GenerationError;
use crate::orchestrator::{GenerationOutcome, Orchestrator};

/// Retry descriptor for one queued task.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Wall-clock ceiling per attempt.
    pub attempt_timeout: Duration,
    /// Base delay between attempts; attempt N waits `N * backoff`.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            attempt_timeout: Duration::from_secs(120),
            backoff: Duration::from_secs(2),
        }
    }
}

impl Orchestrator {
    /// Run one queued task under the given retry policy.
    ///
    /// Returns the number of attempts made together with the final result.
    /// Quota is not checked here: the gate ran when the job was enqueued.
    pub async fn run_queued(
        &self,
        request: &GenerationRequest,
        policy: &RetryPolicy,
    ) -> (u32, Result<GenerationOutcome, GenerationError>) {
        let mut attempt = 0;
        loop {
            attempt += 1;

            let result = match tokio::time::timeout(
                policy.attempt_timeout,
                self.execute_attempt(request),
            )
            .await
            {
                Ok(result) => result,
                Err(_elapsed) => {
                    let secs = policy.attempt_timeout.as_secs();
                    // The cancelled attempt never reached its own log
                    // write, so record it here.
                    self.record_attempt_timeout(request, secs).await;
                    Err(GenerationError::AttemptTimedOut(secs))
                }
            };

            match result {
                Ok(outcome) => return (attempt, Ok(outcome)),
                Err(error) if error.is_transient() && attempt < policy.max_attempts => {
                    tracing::warn!(
                        attempt,
                        max_attempts = policy.max_attempts,
                        error = %error,
                        "Transient generation failure, retrying",
                    );
                    tokio::time::sleep(policy.backoff * attempt).await;
                }
                Err(error) => {
                    tracing::error!(
                        attempt,
                        error = %error,
                        "Generation task failed permanently",
                    );
                    self.publish_permanent_failure(request, &error);
                    return (attempt, Err(error));
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
