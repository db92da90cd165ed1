//! Typed failure taxonomy for the generation pipeline.

use ladle_core::types::Timestamp;
use ladle_core::validate::ValidationFailure;
use ladle_inference::InferenceError;

use crate::store::StoreError;

/// Everything that can go wrong in one generation run.
///
/// Callers branch on the variant, not on message text: quota denials are
/// "you've hit your limit" (never retried), inference failures are "try
/// again" (retried in queued mode), invalid output is "change your input"
/// (never retried, since the same input would reproduce it), and persistence
/// failures are fatal.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The requester's daily limit is spent.
    #[error("{message}")]
    QuotaExceeded {
        message: String,
        /// When the daily window rolls over.
        retry_at: Timestamp,
    },

    /// The provider call failed in transit (network, timeout, non-JSON).
    #[error(transparent)]
    Inference(#[from] InferenceError),

    /// A queued attempt exceeded its wall-clock ceiling.
    #[error("Generation attempt timed out after {0} seconds")]
    AttemptTimedOut(u64),

    /// The model responded, but the payload failed structural validation.
    #[error("Model output failed validation: {0}")]
    InvalidOutput(ValidationFailure),

    /// The recipe or log row could not be written.
    #[error("Persistence failed: {0}")]
    Persistence(#[from] StoreError),
}

impl GenerationError {
    /// Transport-class failures are worth retrying; everything else is
    /// deterministic for the same input or must surface immediately.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            GenerationError::Inference(_) | GenerationError::AttemptTimedOut(_),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inference_failures_are_transient() {
        let err = GenerationError::Inference(InferenceError::Api {
            status: 503,
            body: "upstream unavailable".to_string(),
        });
        assert!(err.is_transient());
        assert!(GenerationError::AttemptTimedOut(120).is_transient());
    }

    #[test]
    fn validation_and_quota_failures_are_terminal() {
        let invalid = GenerationError::InvalidOutput(ValidationFailure::MissingField("title"));
        assert!(!invalid.is_transient());

        let quota = GenerationError::QuotaExceeded {
            message: "limit reached".to_string(),
            retry_at: chrono::Utc::now(),
        };
        assert!(!quota.is_transient());
    }
}
