use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ladle_events::{EmailConfig, EmailDelivery, EventBus, Notifier};
use ladle_inference::{InferenceClient, InferenceConfig};
use ladle_pipeline::clock::SystemClock;
use ladle_pipeline::generator::RecipeGenerator;
use ladle_pipeline::store::{PgGenerationLogStore, PgRecipeStore, PgUserStore};
use ladle_pipeline::{Orchestrator, RetryPolicy};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ladle_worker=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = ladle_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    ladle_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    let inference_config =
        InferenceConfig::from_env().expect("INFERENCE_API_KEY must be set");
    let inference = Arc::new(InferenceClient::new(inference_config));

    // The worker publishes recipe.generated / generation.failed events and
    // runs its own notifier so queued outcomes still reach users by email.
    let event_bus = Arc::new(EventBus::default());
    let email_delivery = EmailConfig::from_env().map(EmailDelivery::new);
    if email_delivery.is_none() {
        tracing::warn!("SMTP_HOST not set — email notifications disabled");
    }
    tokio::spawn(Notifier::new(pool.clone(), email_delivery).run(event_bus.subscribe()));

    let orchestrator = Arc::new(Orchestrator::new(
        inference as Arc<dyn RecipeGenerator>,
        Arc::new(PgRecipeStore::new(pool.clone())),
        Arc::new(PgGenerationLogStore::new(pool.clone())),
        Arc::new(PgUserStore::new(pool.clone())),
        event_bus,
        Arc::new(SystemClock),
    ));

    let cancel = tokio_util::sync::CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("Shutdown signal received");
        signal_cancel.cancel();
    });

    ladle_worker::run_worker_loop(pool, orchestrator, RetryPolicy::default(), cancel).await;
}
