//! The generation orchestrator.
//!
//! Drives one request through the pipeline: cache lookup → quota gate →
//! inference → validation → persistence → audit log → cache write →
//! notification. Every attempt, success or failure, leaves exactly one
//! generation-log entry; cache hits leave none.
//!
//! Cache-before-quota is deliberate: a hit costs no inference call, so it
//! neither consumes a quota slot nor writes a log entry, and it can never
//! create a second recipe row for the same normalized request.

use std::sync::Arc;
use std::time::Instant;

use chrono::Duration;

use ladle_core::cache_key;
use ladle_core::naming;
use ladle_core::request::GenerationRequest;
use ladle_core::validate;
use ladle_db::models::generation_log::{NewGenerationLog, STATUS_FAILED, STATUS_SUCCESS};
use ladle_events::{event_types, DomainEvent, EventBus};

use crate::cache::TtlStore;
use crate::clock::Clock;
use crate::error::GenerationError;
use crate::generator::RecipeGenerator;
use crate::quota_gate::{QuotaCheck, QuotaGate};
use crate::store::{GenerationLogStore, NewRecipe, RecipeRecord, RecipeStore, UserStore};

/// How long a generated result stays cached.
const CACHE_TTL_HOURS: i64 = 24;

/// Result of a successful pipeline run.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub recipe: RecipeRecord,
    /// Whether the result came from the cache instead of a fresh inference
    /// call.
    pub from_cache: bool,
}

/// Coordinates one generation request end to end.
pub struct Orchestrator {
    generator: Arc<dyn RecipeGenerator>,
    recipes: Arc<dyn RecipeStore>,
    log: Arc<dyn GenerationLogStore>,
    quota: QuotaGate,
    cache: TtlStore<RecipeRecord>,
    bus: Arc<EventBus>,
}

impl Orchestrator {
    pub fn new(
        generator: Arc<dyn RecipeGenerator>,
        recipes: Arc<dyn RecipeStore>,
        log: Arc<dyn GenerationLogStore>,
        users: Arc<dyn UserStore>,
        bus: Arc<EventBus>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let quota = QuotaGate::new(users, Arc::clone(&log), Arc::clone(&clock));
        let cache = TtlStore::new(clock);
        Self {
            generator,
            recipes,
            log,
            quota,
            cache,
            bus,
        }
    }

    /// The quota gate, for handlers that report remaining allowance.
    pub fn quota(&self) -> &QuotaGate {
        &self.quota
    }

    /// Synchronous entry point: cache, then quota, then one attempt.
    ///
    /// The request is assumed well-formed ([`GenerationRequest::validate`]
    /// is the caller's responsibility, where malformed input maps to a 4xx
    /// before the pipeline is involved).
    pub async fn run(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationOutcome, GenerationError> {
        let ingredients = request.trimmed_ingredients();
        let key = cache_key::derive_key(&ingredients, &request.options);

        if let Some(record) = self.cache.get(&key) {
            tracing::debug!(key = %key, "Generation served from cache");
            return Ok(GenerationOutcome {
                recipe: record,
                from_cache: true,
            });
        }

        match self.quota.check(&request.requester).await? {
            QuotaCheck::Allowed { remaining } => {
                tracing::debug!(remaining, "Quota check passed");
            }
            QuotaCheck::Denied { message, retry_at } => {
                return Err(GenerationError::QuotaExceeded { message, retry_at });
            }
        }

        self.execute(request, &ingredients, &key).await
    }

    /// One pipeline attempt with quota already settled: the queued path,
    /// where the gate ran at enqueue time.
    pub async fn execute_attempt(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationOutcome, GenerationError> {
        let ingredients = request.trimmed_ingredients();
        let key = cache_key::derive_key(&ingredients, &request.options);

        if let Some(record) = self.cache.get(&key) {
            return Ok(GenerationOutcome {
                recipe: record,
                from_cache: true,
            });
        }

        self.execute(request, &ingredients, &key).await
    }

    /// Inference → validation → persistence → log → cache → notify.
    async fn execute(
        &self,
        request: &GenerationRequest,
        ingredients: &[String],
        key: &str,
    ) -> Result<GenerationOutcome, GenerationError> {
        let options = request.options.normalized();

        let started = Instant::now();
        let result = self.generator.generate(ingredients, &options).await;
        let latency = started.elapsed().as_secs_f64();

        let payload = match result {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(error = %e, "Inference call failed");
                self.append_log(request, Some(latency), STATUS_FAILED, Some(e.to_string()))
                    .await;
                return Err(GenerationError::Inference(e));
            }
        };

        let draft = match validate::validate(&payload) {
            Ok(draft) => draft,
            Err(reason) => {
                tracing::warn!(reason = %reason, "Model output failed validation");
                self.append_log(
                    request,
                    Some(latency),
                    STATUS_FAILED,
                    Some(reason.to_string()),
                )
                .await;
                return Err(GenerationError::InvalidOutput(reason));
            }
        };

        let slug = naming::slug_with_suffix(&draft.title);
        let metadata = serde_json::json!({
            "model": self.generator.model_id(),
            "tags": &draft.tags,
            "request_id": &request.request_id,
        });
        let record = match self
            .recipes
            .create(NewRecipe {
                draft,
                slug,
                owner: request.requester.user_id(),
                metadata,
            })
            .await
        {
            Ok(record) => record,
            Err(e) => {
                self.append_log(request, Some(latency), STATUS_FAILED, Some(e.to_string()))
                    .await;
                return Err(GenerationError::Persistence(e));
            }
        };

        self.append_log(request, Some(latency), STATUS_SUCCESS, None).await;

        self.cache
            .insert(key, record.clone(), Duration::hours(CACHE_TTL_HOURS));

        // Best-effort notification: guests have no contact address, and a
        // publish can never fail the run.
        if let Some(user_id) = request.requester.user_id() {
            self.bus.publish(
                DomainEvent::new(event_types::RECIPE_GENERATED)
                    .with_actor(user_id)
                    .with_payload(serde_json::json!({
                        "recipe_id": record.id,
                        "title": record.title,
                        "slug": record.slug,
                    })),
            );
        }

        tracing::info!(
            recipe_id = record.id,
            slug = %record.slug,
            latency_secs = latency,
            "Recipe generated",
        );

        Ok(GenerationOutcome {
            recipe: record,
            from_cache: false,
        })
    }

    /// Record an attempt that timed out before the inference call returned.
    pub(crate) async fn record_attempt_timeout(&self, request: &GenerationRequest, secs: u64) {
        self.append_log(
            request,
            Some(secs as f64),
            STATUS_FAILED,
            Some(format!("attempt timed out after {secs} seconds")),
        )
        .await;
    }

    /// Fire the permanent-failure hook after retry exhaustion.
    pub(crate) fn publish_permanent_failure(
        &self,
        request: &GenerationRequest,
        error: &GenerationError,
    ) {
        let mut event = DomainEvent::new(event_types::GENERATION_FAILED)
            .with_payload(serde_json::json!({
                "error": error.to_string(),
                "request_id": &request.request_id,
            }));
        if let Some(user_id) = request.requester.user_id() {
            event = event.with_actor(user_id);
        }
        self.bus.publish(event);
    }

    /// Append a generation-log entry, logging (never propagating) write
    /// failures. Losing an entry under-counts quota slightly, which beats
    /// failing an otherwise-successful run or duplicating recipes on retry.
    async fn append_log(
        &self,
        request: &GenerationRequest,
        response_time: Option<f64>,
        status: &str,
        error_message: Option<String>,
    ) {
        let entry = NewGenerationLog {
            user_id: request.requester.user_id(),
            inputs: serde_json::json!({
                "ingredients": &request.ingredients,
                "options": &request.options,
                "request_id": &request.request_id,
            }),
            model_used: self.generator.model_id().to_string(),
            tokens_consumed: None,
            response_time,
            status: status.to_string(),
            error_message,
            cost_estimate: None,
        };
        if let Err(e) = self.log.append(entry).await {
            tracing::error!(error = %e, "Failed to append generation log entry");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::testing::{
        invalid_payload, MemoryLogStore, MemoryRecipeStore, MemoryUserStore, ScriptedGenerator,
    };
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};
    use ladle_core::request::{GenerationOptions, Requester};

    struct Fixture {
        generator: Arc<ScriptedGenerator>,
        recipes: Arc<MemoryRecipeStore>,
        log: Arc<MemoryLogStore>,
        users: Arc<MemoryUserStore>,
        bus: Arc<EventBus>,
        clock: ManualClock,
        orchestrator: Orchestrator,
    }

    fn fixture(generator: ScriptedGenerator) -> Fixture {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap());
        let generator = Arc::new(generator);
        let recipes = Arc::new(MemoryRecipeStore::default());
        let log = Arc::new(MemoryLogStore::new(Arc::new(clock.clone())));
        let users = Arc::new(MemoryUserStore::default());
        let bus = Arc::new(EventBus::default());
        let orchestrator = Orchestrator::new(
            Arc::clone(&generator) as Arc<dyn RecipeGenerator>,
            Arc::clone(&recipes) as Arc<dyn RecipeStore>,
            Arc::clone(&log) as Arc<dyn GenerationLogStore>,
            Arc::clone(&users) as Arc<dyn UserStore>,
            Arc::clone(&bus),
            Arc::new(clock.clone()),
        );
        Fixture {
            generator,
            recipes,
            log,
            users,
            bus,
            clock,
            orchestrator,
        }
    }

    fn guest_request(ingredients: &[&str]) -> GenerationRequest {
        GenerationRequest {
            ingredients: ingredients.iter().map(|i| i.to_string()).collect(),
            options: GenerationOptions::default(),
            requester: Requester::Guest {
                ip: "203.0.113.7".parse().unwrap(),
            },
            request_id: None,
        }
    }

    fn user_request(ingredients: &[&str], user_id: i64) -> GenerationRequest {
        GenerationRequest {
            ingredients: ingredients.iter().map(|i| i.to_string()).collect(),
            options: GenerationOptions::default(),
            requester: Requester::User { id: user_id },
            request_id: Some("req-123".to_string()),
        }
    }

    #[tokio::test]
    async fn success_persists_recipe_and_logs_once() {
        let f = fixture(ScriptedGenerator::always_valid());
        let outcome = f.orchestrator.run(&guest_request(&["egg", "milk"])).await.unwrap();

        assert!(!outcome.from_cache);
        assert_eq!(f.recipes.count(), 1);
        assert!(outcome.recipe.slug.starts_with("tomato-basil-pasta-"));

        let entries = f.log.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, "success");
        assert_eq!(entries[0].user_id, None);
        assert_eq!(entries[0].model_used, "test-model");
        assert!(entries[0].response_time.is_some());
        assert_eq!(entries[0].inputs["ingredients"][0], "egg");
    }

    #[tokio::test]
    async fn cache_hit_bypasses_inference_and_returns_identical_payload() {
        let f = fixture(ScriptedGenerator::always_valid());
        let first = f.orchestrator.run(&guest_request(&["egg", "milk"])).await.unwrap();
        // Same multiset, different order.
        let second = f.orchestrator.run(&guest_request(&["milk", "egg"])).await.unwrap();

        assert_eq!(f.generator.calls(), 1);
        assert!(!first.from_cache);
        assert!(second.from_cache);
        assert_eq!(first.recipe.recipe, second.recipe.recipe);
        assert_eq!(f.recipes.count(), 1);
    }

    #[tokio::test]
    async fn cache_hit_writes_no_log_entry_and_consumes_no_quota() {
        let f = fixture(ScriptedGenerator::always_valid());
        let request = guest_request(&["egg", "milk"]);

        f.orchestrator.run(&request).await.unwrap();
        for _ in 0..5 {
            let outcome = f.orchestrator.run(&request).await.unwrap();
            assert!(outcome.from_cache);
        }

        // One inference, one log entry, one reserved quota slot.
        assert_eq!(f.log.entries().len(), 1);
        assert_eq!(
            f.orchestrator.quota().remaining(&request.requester).await.unwrap(),
            ladle_core::quota::GUEST_DAILY_LIMIT - 1,
        );
    }

    #[tokio::test]
    async fn cache_expires_after_a_day() {
        let f = fixture(ScriptedGenerator::always_valid());
        let request = guest_request(&["egg", "milk"]);

        f.orchestrator.run(&request).await.unwrap();
        f.clock.advance(chrono::Duration::hours(25));

        let outcome = f.orchestrator.run(&request).await.unwrap();
        assert!(!outcome.from_cache);
        assert_eq!(f.generator.calls(), 2);
    }

    #[tokio::test]
    async fn quota_denial_stops_before_inference() {
        let f = fixture(ScriptedGenerator::always_valid());

        // Distinct ingredient sets so the cache never short-circuits.
        f.orchestrator.run(&guest_request(&["a"])).await.unwrap();
        f.orchestrator.run(&guest_request(&["b"])).await.unwrap();
        f.orchestrator.run(&guest_request(&["c"])).await.unwrap();

        let err = f.orchestrator.run(&guest_request(&["d"])).await.unwrap_err();
        assert_matches!(err, GenerationError::QuotaExceeded { .. });
        assert_eq!(f.generator.calls(), 3);
        assert_eq!(f.recipes.count(), 3);
    }

    #[tokio::test]
    async fn invalid_output_logs_failure_and_persists_nothing() {
        let f = fixture(ScriptedGenerator::with_script(vec![Ok(invalid_payload())]));

        let err = f.orchestrator.run(&guest_request(&["egg"])).await.unwrap_err();
        assert_matches!(err, GenerationError::InvalidOutput(_));

        assert_eq!(f.recipes.count(), 0);
        let entries = f.log.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, "failed");
        assert!(entries[0]
            .error_message
            .as_deref()
            .unwrap()
            .contains("instructions"));
    }

    #[tokio::test]
    async fn inference_failure_logs_failure() {
        let f = fixture(ScriptedGenerator::with_script(vec![Err(
            ScriptedGenerator::transient_error(),
        )]));

        let err = f.orchestrator.run(&guest_request(&["egg"])).await.unwrap_err();
        assert_matches!(err, GenerationError::Inference(_));

        let entries = f.log.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, "failed");
        assert_eq!(f.recipes.count(), 0);
    }

    #[tokio::test]
    async fn failed_attempts_do_not_consume_user_quota() {
        let f = fixture(ScriptedGenerator::with_script(vec![Err(
            ScriptedGenerator::transient_error(),
        )]));
        f.users.add_free_user(7);

        let _ = f.orchestrator.run(&user_request(&["egg"], 7)).await.unwrap_err();

        // The failed entry does not count toward the success-based quota.
        assert_eq!(
            f.orchestrator
                .quota()
                .remaining(&Requester::User { id: 7 })
                .await
                .unwrap(),
            ladle_core::quota::FREE_DAILY_LIMIT,
        );
    }

    #[tokio::test]
    async fn user_success_publishes_notification_event() {
        let f = fixture(ScriptedGenerator::always_valid());
        f.users.add_free_user(7);
        let mut rx = f.bus.subscribe();

        let outcome = f.orchestrator.run(&user_request(&["egg"], 7)).await.unwrap();

        let event = rx.recv().await.expect("event should be published");
        assert_eq!(event.event_type, "recipe.generated");
        assert_eq!(event.actor_user_id, Some(7));
        assert_eq!(event.payload["recipe_id"], outcome.recipe.id);
        assert_eq!(event.payload["slug"], outcome.recipe.slug.as_str());
    }

    #[tokio::test]
    async fn guest_success_publishes_no_event() {
        let f = fixture(ScriptedGenerator::always_valid());
        let mut rx = f.bus.subscribe();

        f.orchestrator.run(&guest_request(&["egg"])).await.unwrap();

        assert_matches!(
            rx.try_recv(),
            Err(tokio::sync::broadcast::error::TryRecvError::Empty)
        );
    }

    #[tokio::test]
    async fn request_id_is_carried_into_metadata_and_log() {
        let f = fixture(ScriptedGenerator::always_valid());
        f.users.add_free_user(7);

        let outcome = f.orchestrator.run(&user_request(&["egg"], 7)).await.unwrap();

        assert_eq!(outcome.recipe.recipe["ai_metadata"]["request_id"], "req-123");
        assert_eq!(f.log.entries()[0].inputs["request_id"], "req-123");
    }
}
