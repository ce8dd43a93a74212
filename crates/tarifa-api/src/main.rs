//! Tarifa API Binary
//!
//! Serves line-item pricing over HTTP

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tarifa_api::{router, ApiConfig, AppState, PricingMetrics};
use tarifa_engine::{BatchPricer, InMemoryCatalog, PricingEngine};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    info!("Starting Tarifa API v{}", tarifa_common::VERSION);

    let config = ApiConfig::load()?;
    info!("Loaded configuration: {:?}", config);

    let catalog = match &config.catalog_path {
        Some(path) => InMemoryCatalog::from_json_file(path)?,
        None => {
            info!("No catalog configured, starting with an empty catalog");
            InMemoryCatalog::new()
        }
    };

    let engine = PricingEngine::with_config(config.pricing.engine_config())?;
    info!(
        "Fallback margin: x{} + {}",
        engine.config().fallback_multiplier,
        engine.config().fallback_fee
    );

    let state = AppState {
        pricer: Arc::new(BatchPricer::new(engine, Arc::new(catalog))),
        metrics: Arc::new(PricingMetrics::new()?),
    };
    let app = router(state);

    let addr: SocketAddr = config.bind_addr().parse()?;
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Tarifa API listening on {}", addr);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
            return;
        }
        info!("Received shutdown signal");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Shutting down Tarifa API");
    Ok(())
}
