//! tt-cd library interface for testing
//!
//! Exposes public APIs for integration testing

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod workflow;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tt_common::events::EventBus;

use crate::config::DeliveryConfig;
use crate::services::annotation_client::TopicTagger;
use crate::services::link_lifecycle::LinkLifecycle;
use crate::workflow::IngestPipeline;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Service configuration
    pub config: Arc<DeliveryConfig>,
    /// Event bus feeding the outbound notification publisher
    pub event_bus: EventBus,
    /// Tracking-link lifecycle service
    pub lifecycle: LinkLifecycle,
    /// Content ingestion pipeline
    pub pipeline: IngestPipeline,
    /// Topic annotation backend
    pub tagger: Arc<dyn TopicTagger>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        config: DeliveryConfig,
        event_bus: EventBus,
        tagger: Arc<dyn TopicTagger>,
    ) -> Self {
        let lifecycle = LinkLifecycle::new(db.clone(), event_bus.clone(), config.scoring.clone());
        let pipeline =
            IngestPipeline::new(db.clone(), config.content_root.clone(), tagger.clone());
        Self {
            db,
            config: Arc::new(config),
            event_bus,
            lifecycle,
            pipeline,
            tagger,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
///
/// Extracted package artifacts are served straight from the content root
/// under `/content/`; everything else goes through handlers.
pub fn build_router(state: AppState) -> Router {
    let content_dir = ServeDir::new(&state.config.content_root);

    Router::new()
        .merge(api::health_routes())
        .merge(api::content_routes())
        .merge(api::topic_routes())
        .merge(api::link_routes())
        .merge(api::launch_routes())
        .merge(api::tracking_routes())
        .merge(api::score_routes())
        .merge(api::asset_routes())
        .nest_service("/content", content_dir)
        .with_state(state)
}
