//! Queued generation job models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use ladle_core::types::{DbId, Timestamp};

/// Lifecycle states for a queued generation job.
pub mod job_status {
    /// Submitted, waiting for a worker.
    pub const PENDING: &str = "pending";
    /// Claimed by a worker and executing.
    pub const RUNNING: &str = "running";
    /// Finished with a persisted recipe.
    pub const COMPLETED: &str = "completed";
    /// Failed permanently after retry exhaustion.
    pub const FAILED: &str = "failed";
}

/// A row from the `generation_jobs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GenerationJob {
    pub id: DbId,
    pub user_id: Option<DbId>,
    pub ingredients: serde_json::Value,
    pub options: serde_json::Value,
    pub request_id: Option<String>,
    pub status: String,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub recipe_id: Option<DbId>,
    pub submitted_at: Timestamp,
    pub claimed_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Input for enqueuing a generation job.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitGenerationJob {
    pub user_id: Option<DbId>,
    pub ingredients: serde_json::Value,
    pub options: serde_json::Value,
    pub request_id: Option<String>,
}
