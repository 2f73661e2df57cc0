//! Topic catalogue and free-text suggestion handlers

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::db::topics;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// GET /api/topics response
#[derive(Debug, Serialize)]
pub struct TopicCatalogueResponse {
    pub topics: Vec<topics::TopicCount>,
    pub total: usize,
}

/// POST /api/topics/suggest request
#[derive(Debug, Deserialize)]
pub struct SuggestTopicsRequest {
    /// Free text to derive topics from (title, description, notes)
    pub text: String,
}

/// POST /api/topics/suggest response
#[derive(Debug, Serialize)]
pub struct SuggestTopicsResponse {
    pub topics: Vec<String>,
}

/// GET /api/topics
pub async fn list_topics(
    State(state): State<AppState>,
) -> ApiResult<Json<TopicCatalogueResponse>> {
    let catalogue = topics::list_topics(&state.db).await?;

    Ok(Json(TopicCatalogueResponse {
        total: catalogue.len(),
        topics: catalogue,
    }))
}

/// POST /api/topics/suggest
///
/// Derives topics from free text through the same tagger the ingestion
/// pipeline uses. Shares the tagger's degrade policy: with the annotation
/// service unavailable the suggestion list is simply empty.
pub async fn suggest_topics(
    State(state): State<AppState>,
    Json(request): Json<SuggestTopicsRequest>,
) -> ApiResult<Json<SuggestTopicsResponse>> {
    if request.text.trim().is_empty() {
        return Err(ApiError::BadRequest("text must not be empty".to_string()));
    }

    let topics = state.tagger.extract_topics(&request.text).await;

    Ok(Json(SuggestTopicsResponse { topics }))
}

/// Build topic routes
pub fn topic_routes() -> Router<AppState> {
    Router::new()
        .route("/api/topics", get(list_topics))
        .route("/api/topics/suggest", post(suggest_topics))
}
