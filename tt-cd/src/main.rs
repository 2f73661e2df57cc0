//! tt-cd - Content Delivery service
//!
//! Ingests uploaded training content (SCORM packages, HTML bundles, raw
//! markup, video), annotates it with topic tags, and serves it to
//! recipients through per-recipient tracking links. Views, interactions,
//! and completions come back over the tracking API and roll up into
//! per-topic score aggregates.

use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tt_cd::config::DeliveryConfig;
use tt_cd::services::{run_publisher_bridge, AnnotationClient, SnsPublisher, TopicTagger};
use tt_cd::AppState;
use tt_common::events::EventBus;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Log build identification immediately, before any slow startup work
    info!(
        "Starting TrainTrack Content Delivery (tt-cd) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let config = DeliveryConfig::load()?;

    std::fs::create_dir_all(&config.content_root)?;
    info!("Content root: {}", config.content_root.display());
    info!("Database path: {}", config.database_path.display());

    let db_pool = tt_common::db::init_database(&config.database_path).await?;
    info!("✓ Connected to database");

    let event_bus = EventBus::new(100); // 100 event capacity

    // Bridge bus events to the notification topic. Without credentials the
    // publisher logs and drops; the bus itself keeps request handling alive.
    let publisher = SnsPublisher::new(config.event_bus.clone())?;
    let bridge_bus = event_bus.clone();
    tokio::spawn(async move {
        run_publisher_bridge(&bridge_bus, publisher).await;
    });

    let tagger: Arc<dyn TopicTagger> =
        Arc::new(AnnotationClient::new(config.annotation.clone())?);

    let bind_address = config.bind_address.clone();
    let state = AppState::new(db_pool, config, event_bus, tagger);
    let app = tt_cd::build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("Listening on http://{}", bind_address);
    info!("Health check: http://{}/health", bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
