//! Daily expiring-pantry sweep.
//!
//! Once a day, finds pantry items expiring within the next few days and
//! publishes an `pantry.ingredient_expiring` event per item. The notifier
//! turns those into emails. Each item is notified at most once per day;
//! per-item failures never stop the sweep.

use std::collections::HashSet;
use std::sync::Mutex;

use chrono::{NaiveDate, Utc};
use tokio_util::sync::CancellationToken;

use ladle_core::types::DbId;
use ladle_db::repositories::PantryRepo;
use ladle_db::DbPool;
use ladle_events::{event_types, DomainEvent, EventBus};

/// Days ahead to look for expiring items.
const EXPIRY_WINDOW_DAYS: i64 = 3;

/// How often the sweep runs.
const SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(24 * 60 * 60);

/// Background service that publishes expiring-item events.
pub struct PantrySweep {
    pool: DbPool,
    bus: std::sync::Arc<EventBus>,
    /// Items already announced today, so restarts within the interval and
    /// overlapping windows never double-notify.
    announced: Mutex<HashSet<(DbId, NaiveDate)>>,
}

impl PantrySweep {
    pub fn new(pool: DbPool, bus: std::sync::Arc<EventBus>) -> Self {
        Self {
            pool,
            bus,
            announced: Mutex::new(HashSet::new()),
        }
    }

    /// Run the sweep loop until cancelled. The first sweep fires
    /// immediately, then every 24 hours.
    pub async fn run(self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Pantry sweep shutting down");
                    break;
                }
                _ = interval.tick() => {
                    match self.sweep_once().await {
                        Ok(count) => tracing::info!(notified = count, "Pantry sweep completed"),
                        Err(e) => tracing::error!(error = %e, "Pantry sweep failed"),
                    }
                }
            }
        }
    }

    /// One pass: query expiring items and publish one event per
    /// not-yet-announced item. Returns the number of events published.
    async fn sweep_once(&self) -> Result<usize, sqlx::Error> {
        let today = Utc::now().date_naive();
        let items = PantryRepo::find_expiring(&self.pool, today, EXPIRY_WINDOW_DAYS).await?;

        let mut published = 0;
        for item in items {
            {
                let mut announced = self
                    .announced
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner);
                if !announced.insert((item.id, today)) {
                    continue;
                }
            }

            self.bus.publish(
                DomainEvent::new(event_types::INGREDIENT_EXPIRING)
                    .with_actor(item.user_id)
                    .with_payload(serde_json::json!({
                        "pantry_item_id": item.id,
                        "ingredient_name": item.ingredient_name,
                        "expiry_date": item.expiry_date,
                        "email": item.email,
                    })),
            );
            published += 1;
        }
        Ok(published)
    }
}
