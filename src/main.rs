//! Kickoff HQ entitlement service binary.

use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use kickoff_hq::adapters::http::{api_router, AppState};
use kickoff_hq::adapters::postgres::{
    PostgresCouponStore, PostgresProfileRepository, PostgresWebhookEventRepository,
};
use kickoff_hq::adapters::stripe::{StripeConfig, StripePaymentAdapter};
use kickoff_hq::config::AppConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("kickoff_hq={}", config.server.log_level))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        environment = ?config.server.environment,
        test_mode = config.billing.is_test_mode(),
        "Starting Kickoff HQ entitlement service"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .connect(&config.database.url)
        .await?;

    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    let stripe = StripePaymentAdapter::new(StripeConfig::new(
        config.billing.stripe_api_key.clone(),
        config.billing.stripe_webhook_secret.clone(),
    ));

    let state = AppState {
        coupons: Arc::new(PostgresCouponStore::new(pool.clone())),
        profiles: Arc::new(PostgresProfileRepository::new(pool.clone())),
        payment: Arc::new(stripe),
        webhook_events: Arc::new(PostgresWebhookEventRepository::new(pool)),
        plans: config.billing.plan_catalog(),
    };

    let cors = if config.server.cors_origins_list().is_empty() {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins = config
            .server
            .cors_origins_list()
            .iter()
            .filter_map(|o| o.parse::<axum::http::HeaderValue>().ok())
            .collect::<Vec<_>>();
        CorsLayer::new().allow_origin(origins)
    };

    let app = api_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(cors);

    let addr = config.server.socket_addr()?;
    tracing::info!(%addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
