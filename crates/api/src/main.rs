use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::header::{HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use axum::http::Method;
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ladle_api::background::pantry_sweep::PantrySweep;
use ladle_api::config::ServerConfig;
use ladle_api::{router, state::AppState};
use ladle_events::{EmailConfig, EmailDelivery, EventBus, Notifier};
use ladle_inference::{InferenceClient, InferenceConfig};
use ladle_pipeline::clock::SystemClock;
use ladle_pipeline::generator::RecipeGenerator;
use ladle_pipeline::store::{PgGenerationLogStore, PgRecipeStore, PgUserStore};
use ladle_pipeline::Orchestrator;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ladle_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = ladle_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    ladle_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    ladle_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Inference provider ---
    let inference_config =
        InferenceConfig::from_env().expect("INFERENCE_API_KEY must be set");
    let inference = Arc::new(InferenceClient::new(inference_config));
    tracing::info!("Inference client configured");

    // --- Event bus + notifier ---
    let event_bus = Arc::new(EventBus::default());

    let email_delivery = EmailConfig::from_env().map(EmailDelivery::new);
    if email_delivery.is_none() {
        tracing::warn!("SMTP_HOST not set — email notifications disabled");
    }
    let notifier = Notifier::new(pool.clone(), email_delivery);
    tokio::spawn(notifier.run(event_bus.subscribe()));

    // --- Generation pipeline ---
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::clone(&inference) as Arc<dyn RecipeGenerator>,
        Arc::new(PgRecipeStore::new(pool.clone())),
        Arc::new(PgGenerationLogStore::new(pool.clone())),
        Arc::new(PgUserStore::new(pool.clone())),
        Arc::clone(&event_bus),
        Arc::new(SystemClock),
    ));

    // --- Pantry sweep ---
    let sweep_cancel = tokio_util::sync::CancellationToken::new();
    let sweep = PantrySweep::new(pool.clone(), Arc::clone(&event_bus));
    tokio::spawn(sweep.run(sweep_cancel.clone()));

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        orchestrator,
        inference,
        event_bus,
    };

    // --- CORS ---
    let cors = build_cors_layer(&config);

    // --- Request ID header name ---
    let request_id_header = HeaderName::from_static("x-request-id");

    // --- Router ---
    let app = Router::new()
        .merge(router::health_routes())
        .nest("/api/v1", router::api_routes())
        // -- Middleware stack (applied bottom-up) --
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.request_timeout_secs,
        )))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(cors)
        .layer(DefaultBodyLimit::max(config.body_limit_bytes))
        .with_state(state);

    // --- Serve ---
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind listen address");
    tracing::info!(%addr, "Ladle API listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("Shutdown signal received");
        sweep_cancel.cancel();
    })
    .await
    .expect("Server error");
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
}
