//! Adapter for the external model provider.
//!
//! Wraps an OpenAI-compatible chat-completions API behind typed calls:
//! recipe generation, image-based ingredient detection, and premium recipe
//! modification. Every operation is a single-shot remote call; retry, if
//! any, belongs to the pipeline.

pub mod client;
pub mod image_prep;
pub mod prompt;

pub use client::{DetectedIngredient, InferenceClient, InferenceConfig, InferenceError};
