//! The inference seam.
//!
//! The orchestrator never talks to the provider client directly; it goes
//! through [`RecipeGenerator`], so tests can substitute a scripted double
//! and assert on call counts (cache hits must never reach the provider).

use async_trait::async_trait;

use ladle_core::request::NormalizedOptions;
use ladle_inference::{InferenceClient, InferenceError};

/// Produces raw recipe payloads from ingredients and constraints.
#[async_trait]
pub trait RecipeGenerator: Send + Sync {
    /// Identifier recorded in generation logs and recipe metadata.
    fn model_id(&self) -> &str;

    /// One single-shot generation call. No retry at this layer.
    async fn generate(
        &self,
        ingredients: &[String],
        options: &NormalizedOptions,
    ) -> Result<serde_json::Value, InferenceError>;
}

#[async_trait]
impl RecipeGenerator for InferenceClient {
    fn model_id(&self) -> &str {
        InferenceClient::model_id(self)
    }

    async fn generate(
        &self,
        ingredients: &[String],
        options: &NormalizedOptions,
    ) -> Result<serde_json::Value, InferenceError> {
        InferenceClient::generate(self, ingredients, options).await
    }
}
