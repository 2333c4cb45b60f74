use std::sync::Arc;

use role_relay::adapters::http::{build_router, WebhookAppState};
use role_relay::adapters::SqliteRoleJobStore;
use role_relay::application::IngestWebhookHandler;
use role_relay::config::AppConfig;
use role_relay::domain::webhook::StripeWebhookVerifier;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = AppConfig::load()?;
    init_tracing(&config);
    config.validate()?;

    let store = SqliteRoleJobStore::connect(&config.database).await?;
    store.ensure_schema().await?;
    tracing::info!(url = %config.database.url, "Role job store ready");

    let verifier = StripeWebhookVerifier::new(config.payment.webhook_secret())
        .with_tolerance_secs(config.payment.signature_tolerance_secs);
    if !verifier.has_secret() {
        tracing::warn!("No Stripe webhook secret configured; every delivery will be rejected");
    }

    let ingest = IngestWebhookHandler::new(Arc::new(verifier), Arc::new(store.clone()));
    let app = build_router(WebhookAppState::new(ingest), config.server.request_timeout());

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, live = config.payment.is_live_mode(), "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.close().await;
    tracing::info!("shut down");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.server.log_level.clone().into());

    let registry = tracing_subscriber::registry().with(filter);
    if config.is_production() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
