//! Tracking beacon handlers
//!
//! The injected observation script and the video player page POST here.
//! All three endpoints key on the public link token, never on row ids,
//! so a recipient can only ever report against links they were issued.

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// POST /api/track/view request
#[derive(Debug, Deserialize)]
pub struct TrackViewRequest {
    pub tracking_link_id: String,
}

/// POST /api/track/view response
#[derive(Debug, Serialize)]
pub struct TrackViewResponse {
    pub tracking_link_id: String,
    pub status: String,
    /// Whether this call stamped `viewed_at` (false on repeat views)
    pub first_view: bool,
}

/// POST /api/track/interaction request
#[derive(Debug, Deserialize)]
pub struct TrackInteractionRequest {
    pub tracking_link_id: String,
    pub topic: String,
    #[serde(default)]
    pub success: bool,
}

/// POST /api/track/interaction response
#[derive(Debug, Serialize)]
pub struct TrackInteractionResponse {
    pub tracking_link_id: String,
    pub topic: String,
    pub recorded: bool,
}

/// POST /api/track/completion request
#[derive(Debug, Deserialize)]
pub struct TrackCompletionRequest {
    pub tracking_link_id: String,
    #[serde(default)]
    pub score: i64,
    #[serde(default = "empty_interactions")]
    pub interactions: Value,
}

fn empty_interactions() -> Value {
    Value::Array(Vec::new())
}

/// POST /api/track/completion response
#[derive(Debug, Serialize)]
pub struct TrackCompletionResponse {
    pub tracking_link_id: String,
    pub status: String,
    pub score: i64,
    /// Whether the score met the pass threshold
    pub passed: bool,
    /// Topic aggregates credited with this attempt
    pub topics_updated: usize,
    pub interactions_recorded: usize,
}

/// POST /api/track/view
pub async fn track_view(
    State(state): State<AppState>,
    Json(request): Json<TrackViewRequest>,
) -> ApiResult<Json<TrackViewResponse>> {
    let first_view = state.lifecycle.record_view(&request.tracking_link_id).await?;

    Ok(Json(TrackViewResponse {
        tracking_link_id: request.tracking_link_id,
        status: "VIEWED".to_string(),
        first_view,
    }))
}

/// POST /api/track/interaction
pub async fn track_interaction(
    State(state): State<AppState>,
    Json(request): Json<TrackInteractionRequest>,
) -> ApiResult<Json<TrackInteractionResponse>> {
    if request.topic.trim().is_empty() {
        return Err(ApiError::BadRequest("topic must not be empty".to_string()));
    }

    state
        .lifecycle
        .record_interaction(&request.tracking_link_id, &request.topic, request.success)
        .await?;

    Ok(Json(TrackInteractionResponse {
        tracking_link_id: request.tracking_link_id,
        topic: request.topic,
        recorded: true,
    }))
}

/// POST /api/track/completion
pub async fn track_completion(
    State(state): State<AppState>,
    Json(request): Json<TrackCompletionRequest>,
) -> ApiResult<Json<TrackCompletionResponse>> {
    let interactions_recorded = request
        .interactions
        .as_array()
        .map(|list| list.len())
        .unwrap_or(0);

    let outcome = state
        .lifecycle
        .record_completion(
            &request.tracking_link_id,
            request.score,
            request.interactions,
        )
        .await?;

    Ok(Json(TrackCompletionResponse {
        tracking_link_id: request.tracking_link_id,
        status: "COMPLETED".to_string(),
        score: request.score,
        passed: outcome.passing,
        topics_updated: outcome.topics_updated,
        interactions_recorded,
    }))
}

/// Build tracking routes
pub fn tracking_routes() -> Router<AppState> {
    Router::new()
        .route("/api/track/view", post(track_view))
        .route("/api/track/interaction", post(track_interaction))
        .route("/api/track/completion", post(track_completion))
}
