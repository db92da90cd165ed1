use std::sync::Arc;

use ladle_events::EventBus;
use ladle_inference::InferenceClient;
use ladle_pipeline::Orchestrator;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: ladle_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// The generation pipeline (quota gate, cache, orchestration).
    pub orchestrator: Arc<Orchestrator>,
    /// Direct provider client for detection and modification calls.
    pub inference: Arc<InferenceClient>,
    /// Centralized event bus for publishing platform events.
    pub event_bus: Arc<EventBus>,
}
