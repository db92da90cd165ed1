//! Generation log entry models.
//!
//! The `generation_logs` table is append-only: one row per pipeline
//! attempt, success or failure, never updated afterwards. It doubles as the
//! authoritative source for authenticated users' daily quota counts.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use ladle_core::types::{DbId, Timestamp};

/// Status recorded for a successful attempt.
pub const STATUS_SUCCESS: &str = "success";
/// Status recorded for a failed attempt.
pub const STATUS_FAILED: &str = "failed";

/// A row from the `generation_logs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GenerationLogEntry {
    pub id: DbId,
    pub user_id: Option<DbId>,
    pub inputs: serde_json::Value,
    pub model_used: String,
    pub tokens_consumed: Option<i32>,
    pub response_time: Option<f64>,
    pub status: String,
    pub error_message: Option<String>,
    pub cost_estimate: Option<f64>,
    pub created_at: Timestamp,
}

/// Input for appending a log entry.
#[derive(Debug, Clone, Deserialize)]
pub struct NewGenerationLog {
    pub user_id: Option<DbId>,
    pub inputs: serde_json::Value,
    pub model_used: String,
    pub tokens_consumed: Option<i32>,
    /// Wall-clock seconds spent on the attempt.
    pub response_time: Option<f64>,
    pub status: String,
    pub error_message: Option<String>,
    pub cost_estimate: Option<f64>,
}
