//! HTTP client for the OpenAI-compatible chat-completions API.
//!
//! [`InferenceClient`] wraps the provider behind three typed operations:
//! recipe generation, image ingredient detection, and recipe modification.
//! Each is a single remote call with no built-in retry; transport failures,
//! non-2xx responses, and non-JSON completions all surface as
//! [`InferenceError`] and never escape as raw reqwest errors.

use serde::{Deserialize, Serialize};

use ladle_core::request::NormalizedOptions;

use crate::image_prep;
use crate::prompt;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Default provider endpoint (OpenAI-compatible).
const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Default text-generation model.
const DEFAULT_CHAT_MODEL: &str = "llama-3.3-70b-versatile";

/// Default vision model for ingredient detection.
const DEFAULT_VISION_MODEL: &str = "llama-3.2-11b-vision-preview";

/// Model identifier recorded on generation-log rows.
const MODEL_ID: &str = "groq-llama-3.3-70b";

/// Provider configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct InferenceConfig {
    /// Base URL of the chat-completions API.
    pub base_url: String,
    /// Bearer token for the provider.
    pub api_key: String,
    /// Model used for text generation and modification.
    pub chat_model: String,
    /// Model used for image ingredient detection.
    pub vision_model: String,
}

impl InferenceConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `INFERENCE_API_KEY` is not set, signalling that
    /// the provider is not configured.
    ///
    /// | Variable                | Required | Default                        |
    /// |-------------------------|----------|--------------------------------|
    /// | `INFERENCE_API_KEY`     | yes      | —                              |
    /// | `INFERENCE_BASE_URL`    | no       | Groq's OpenAI-compatible URL   |
    /// | `INFERENCE_CHAT_MODEL`  | no       | `llama-3.3-70b-versatile`      |
    /// | `INFERENCE_VISION_MODEL`| no       | `llama-3.2-11b-vision-preview` |
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("INFERENCE_API_KEY").ok()?;
        Some(Self {
            base_url: std::env::var("INFERENCE_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            api_key,
            chat_model: std::env::var("INFERENCE_CHAT_MODEL")
                .unwrap_or_else(|_| DEFAULT_CHAT_MODEL.to_string()),
            vision_model: std::env::var("INFERENCE_VISION_MODEL")
                .unwrap_or_else(|_| DEFAULT_VISION_MODEL.to_string()),
        })
    }
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Errors from the provider boundary.
#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider returned a non-2xx status code.
    #[error("Inference API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The provider responded 2xx but the completion was not usable JSON.
    #[error("Malformed model response: {0}")]
    Malformed(String),

    /// The uploaded image could not be decoded or recompressed.
    #[error("Image processing failed: {0}")]
    Image(String),
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

/// One ingredient detected in an uploaded photo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectedIngredient {
    pub name: String,
    pub confidence: f64,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// HTTP client for the model provider.
pub struct InferenceClient {
    client: reqwest::Client,
    config: InferenceConfig,
}

impl InferenceClient {
    /// Create a new client for the given provider configuration.
    pub fn new(config: InferenceConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Create a client reusing an existing [`reqwest::Client`] (useful for
    /// connection pooling across services).
    pub fn with_client(client: reqwest::Client, config: InferenceConfig) -> Self {
        Self { client, config }
    }

    /// Identifier recorded in generation logs and recipe metadata.
    pub fn model_id(&self) -> &'static str {
        MODEL_ID
    }

    /// Request a recipe completion for the given ingredients and options.
    ///
    /// Returns the raw parsed JSON payload; structural validation is the
    /// caller's job.
    pub async fn generate(
        &self,
        ingredients: &[String],
        options: &NormalizedOptions,
    ) -> Result<serde_json::Value, InferenceError> {
        let body = serde_json::json!({
            "model": self.config.chat_model,
            "messages": [
                {"role": "system", "content": prompt::GENERATE_SYSTEM},
                {"role": "user", "content": prompt::recipe_prompt(ingredients, options)},
            ],
            "response_format": {"type": "json_object"},
        });
        self.completion_json(&body).await
    }

    /// Detect ingredients in an uploaded photo.
    ///
    /// The image is scaled down and recompressed before upload; the model's
    /// `ingredients` array is returned as-is (missing array ⇒ empty).
    pub async fn detect_ingredients(
        &self,
        image_bytes: &[u8],
    ) -> Result<Vec<DetectedIngredient>, InferenceError> {
        let data_url = image_prep::prepare_data_url(image_bytes)
            .map_err(|e| InferenceError::Image(e.to_string()))?;

        let body = serde_json::json!({
            "model": self.config.vision_model,
            "messages": [{
                "role": "user",
                "content": [
                    {"type": "text", "text": prompt::DETECT_INGREDIENTS},
                    {"type": "image_url", "image_url": {"url": data_url}},
                ],
            }],
            "response_format": {"type": "json_object"},
        });

        let payload = self.completion_json(&body).await?;
        let detections = payload
            .get("ingredients")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .map(|entry| DetectedIngredient {
                        name: entry
                            .get("name")
                            .and_then(|n| n.as_str())
                            .unwrap_or_default()
                            .to_string(),
                        confidence: entry
                            .get("confidence")
                            .and_then(|c| c.as_f64())
                            .unwrap_or(0.0),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(detections)
    }

    /// Ask the model to modify an existing recipe payload.
    pub async fn modify(
        &self,
        original: &serde_json::Value,
        modification_request: &str,
    ) -> Result<serde_json::Value, InferenceError> {
        let original_json = original.to_string();
        let body = serde_json::json!({
            "model": self.config.chat_model,
            "messages": [
                {"role": "system", "content": prompt::MODIFY_SYSTEM},
                {"role": "user", "content": prompt::modify_prompt(&original_json, modification_request)},
            ],
            "response_format": {"type": "json_object"},
        });
        self.completion_json(&body).await
    }

    // ---- private helpers ----

    /// POST a chat-completions request and parse the first choice's content
    /// as JSON.
    async fn completion_json(
        &self,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, InferenceError> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(body)
            .send()
            .await?;

        let completion: ChatCompletion = Self::parse_response(response).await?;
        let content = completion
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| InferenceError::Malformed("completion has no choices".to_string()))?;

        serde_json::from_str(content).map_err(|e| {
            InferenceError::Malformed(format!("completion content is not JSON: {e}"))
        })
    }

    /// Ensure the response has a success status code. Returns the response
    /// unchanged on success, or an [`InferenceError::Api`] containing the
    /// status and body text on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, InferenceError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(InferenceError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, InferenceError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_completion_deserializes_provider_shape() {
        let raw = serde_json::json!({
            "id": "cmpl-1",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "{\"title\":\"Stew\"}"}}
            ],
            "usage": {"total_tokens": 321}
        });
        let completion: ChatCompletion =
            serde_json::from_value(raw).expect("provider shape should deserialize");
        assert_eq!(completion.choices.len(), 1);
        assert_eq!(completion.choices[0].message.content, "{\"title\":\"Stew\"}");
    }

    #[test]
    fn detected_ingredient_round_trips() {
        let raw = serde_json::json!({"name": "tomato", "confidence": 0.92});
        let detected: DetectedIngredient =
            serde_json::from_value(raw).expect("detection should deserialize");
        assert_eq!(detected.name, "tomato");
        assert!((detected.confidence - 0.92).abs() < f64::EPSILON);
    }
}
