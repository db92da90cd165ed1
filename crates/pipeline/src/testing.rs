//! In-memory fakes for the pipeline seams, shared by this crate's tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::NaiveDate;

use ladle_core::request::NormalizedOptions;
use ladle_core::types::{DbId, Timestamp};
use ladle_db::models::generation_log::{NewGenerationLog, STATUS_SUCCESS};
use ladle_inference::InferenceError;

use crate::clock::Clock;
use crate::generator::RecipeGenerator;
use crate::store::{
    GenerationLogStore, NewRecipe, RecipeRecord, RecipeStore, StoreError, UserAccount, UserStore,
};

/// A complete, valid model payload.
pub(crate) fn sample_payload() -> serde_json::Value {
    serde_json::json!({
        "title": "Tomato Basil Pasta",
        "description": "A quick weeknight pasta.",
        "cuisine": "Italian",
        "difficulty": "easy",
        "prep_time": 10,
        "cook_time": 20,
        "servings": 2,
        "ingredients": [
            {"item": "pasta", "amount": "200", "unit": "g"},
            {"item": "tomato", "amount": "3", "unit": "pieces"}
        ],
        "instructions": ["Boil the pasta.", "Simmer the sauce.", "Combine."],
        "nutritional_estimate": {"calories": 520, "protein": 18, "carbs": 80, "fat": 12},
        "tags": ["pasta", "quick"]
    })
}

/// A payload that fails structural validation (no instructions).
pub(crate) fn invalid_payload() -> serde_json::Value {
    let mut payload = sample_payload();
    payload.as_object_mut().unwrap().remove("instructions");
    payload
}

// ---------------------------------------------------------------------------
// Generator doubles
// ---------------------------------------------------------------------------

/// A generator that replays a script of responses, counting calls.
/// When the script runs dry it returns [`sample_payload`].
pub(crate) struct ScriptedGenerator {
    calls: AtomicUsize,
    script: Mutex<VecDeque<Result<serde_json::Value, InferenceError>>>,
}

impl ScriptedGenerator {
    pub(crate) fn always_valid() -> Self {
        Self::with_script(Vec::new())
    }

    pub(crate) fn with_script(
        script: Vec<Result<serde_json::Value, InferenceError>>,
    ) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            script: Mutex::new(script.into()),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// A transient transport-class failure.
    pub(crate) fn transient_error() -> InferenceError {
        InferenceError::Api {
            status: 503,
            body: "upstream unavailable".to_string(),
        }
    }
}

#[async_trait]
impl RecipeGenerator for ScriptedGenerator {
    fn model_id(&self) -> &str {
        "test-model"
    }

    async fn generate(
        &self,
        _ingredients: &[String],
        _options: &NormalizedOptions,
    ) -> Result<serde_json::Value, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        next.unwrap_or_else(|| Ok(sample_payload()))
    }
}

/// A generator that never responds, for timeout tests.
pub(crate) struct HangingGenerator;

#[async_trait]
impl RecipeGenerator for HangingGenerator {
    fn model_id(&self) -> &str {
        "test-model"
    }

    async fn generate(
        &self,
        _ingredients: &[String],
        _options: &NormalizedOptions,
    ) -> Result<serde_json::Value, InferenceError> {
        tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
        Ok(sample_payload())
    }
}

// ---------------------------------------------------------------------------
// Storage fakes
// ---------------------------------------------------------------------------

/// [`RecipeStore`] backed by a vec.
#[derive(Default)]
pub(crate) struct MemoryRecipeStore {
    next_id: AtomicI64,
    created: Mutex<Vec<RecipeRecord>>,
}

impl MemoryRecipeStore {
    pub(crate) fn count(&self) -> usize {
        self.created
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl RecipeStore for MemoryRecipeStore {
    async fn create(&self, input: NewRecipe) -> Result<RecipeRecord, StoreError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let recipe = serde_json::json!({
            "id": id,
            "title": &input.draft.title,
            "slug": &input.slug,
            "user_id": input.owner,
            "ingredients": &input.draft.ingredients,
            "instructions": &input.draft.instructions,
            "ai_metadata": &input.metadata,
        });
        let record = RecipeRecord {
            id,
            slug: input.slug,
            title: input.draft.title,
            recipe,
        };
        self.created
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
        Ok(record)
    }
}

/// [`GenerationLogStore`] backed by a vec, stamping entries with the
/// injected clock's date.
pub(crate) struct MemoryLogStore {
    clock: Arc<dyn Clock>,
    entries: Mutex<Vec<(NaiveDate, NewGenerationLog)>>,
}

impl MemoryLogStore {
    pub(crate) fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            entries: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn entries(&self) -> Vec<NewGenerationLog> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, e)| e.clone())
            .collect()
    }

    /// Seed `n` success entries for a user, dated "today".
    pub(crate) async fn record_successes(&self, user_id: DbId, n: i64) {
        for _ in 0..n {
            self.append(NewGenerationLog {
                user_id: Some(user_id),
                inputs: serde_json::json!({}),
                model_used: "test-model".to_string(),
                tokens_consumed: None,
                response_time: Some(1.0),
                status: STATUS_SUCCESS.to_string(),
                error_message: None,
                cost_estimate: None,
            })
            .await
            .expect("memory append cannot fail");
        }
    }
}

#[async_trait]
impl GenerationLogStore for MemoryLogStore {
    async fn append(&self, entry: NewGenerationLog) -> Result<(), StoreError> {
        let day = self.clock.now().date_naive();
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((day, entry));
        Ok(())
    }

    async fn count_success_on(
        &self,
        user_id: DbId,
        day: NaiveDate,
    ) -> Result<i64, StoreError> {
        let count = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(d, e)| {
                *d == day && e.user_id == Some(user_id) && e.status == STATUS_SUCCESS
            })
            .count();
        Ok(count as i64)
    }
}

/// [`UserStore`] backed by a map.
#[derive(Default)]
pub(crate) struct MemoryUserStore {
    users: Mutex<HashMap<DbId, UserAccount>>,
}

impl MemoryUserStore {
    pub(crate) fn add_free_user(&self, id: DbId) {
        self.users
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                id,
                UserAccount {
                    id,
                    tier: "free".to_string(),
                    premium_until: None,
                },
            );
    }

    pub(crate) fn add_premium_user(&self, id: DbId, premium_until: Option<Timestamp>) {
        self.users
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                id,
                UserAccount {
                    id,
                    tier: "premium".to_string(),
                    premium_until,
                },
            );
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find(&self, id: DbId) -> Result<Option<UserAccount>, StoreError> {
        Ok(self
            .users
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned())
    }

    async fn increment_daily_counter(&self, _id: DbId) -> Result<(), StoreError> {
        Ok(())
    }
}
