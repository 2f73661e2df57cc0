//! Content upload and catalogue API handlers
//!
//! POST /api/content registers a content item and runs the ingestion
//! pipeline synchronously; the response carries the resolved artifact path
//! and attributed topics. Upload transport (multipart parsing, temp file
//! staging) lives outside this service, so archive and video uploads arrive
//! as a staged file path and raw markup arrives inline.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::db::{content, topics};
use crate::error::{ApiError, ApiResult};
use crate::models::{ContentItem, UploadKind};
use crate::workflow::UploadSource;
use crate::AppState;

/// POST /api/content request
#[derive(Debug, Deserialize)]
pub struct UploadContentRequest {
    pub account_id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_content_type")]
    pub content_type: String,
    pub upload_type: UploadKind,
    /// Staged file path for archive and video uploads
    pub source_path: Option<String>,
    /// Inline markup for raw_html uploads
    pub html_content: Option<String>,
}

fn default_content_type() -> String {
    "training".to_string()
}

/// POST /api/content response
#[derive(Debug, Serialize)]
pub struct UploadContentResponse {
    pub content_id: i64,
    pub title: String,
    pub upload_type: UploadKind,
    /// Artifact path relative to the content root
    pub content_identifier: String,
    pub topics: Vec<String>,
}

/// GET /api/content/{id} response
#[derive(Debug, Serialize)]
pub struct ContentDetailResponse {
    pub content: ContentItem,
    pub topics: Vec<String>,
}

/// GET /api/content/{id}/topics response
#[derive(Debug, Serialize)]
pub struct ContentTopicsResponse {
    pub content_id: i64,
    pub topics: Vec<String>,
    pub total: usize,
}

/// POST /api/content
///
/// Register a content item and ingest it. The content row is created
/// first with a pending identifier; a pipeline failure leaves it that way
/// and surfaces as INGESTION_FAILED.
pub async fn upload_content(
    State(state): State<AppState>,
    Json(request): Json<UploadContentRequest>,
) -> ApiResult<Json<UploadContentResponse>> {
    if request.title.trim().is_empty() {
        return Err(ApiError::BadRequest("title must not be empty".to_string()));
    }

    let source = resolve_source(&request)?;

    let content_id = content::insert_content(
        &state.db,
        &content::NewContent {
            account_id: request.account_id,
            title: &request.title,
            description: &request.description,
            content_type: &request.content_type,
            upload_type: request.upload_type,
            content_identifier: "pending",
        },
    )
    .await?;

    let outcome = state
        .pipeline
        .ingest(content_id, request.upload_type, source)
        .await?;

    Ok(Json(UploadContentResponse {
        content_id,
        title: request.title,
        upload_type: request.upload_type,
        content_identifier: outcome.content_identifier,
        topics: outcome.topics,
    }))
}

fn resolve_source(request: &UploadContentRequest) -> Result<UploadSource, ApiError> {
    match request.upload_type {
        UploadKind::RawHtml => {
            let html = request
                .html_content
                .as_deref()
                .filter(|h| !h.trim().is_empty())
                .ok_or_else(|| {
                    ApiError::BadRequest("raw_html uploads require html_content".to_string())
                })?;
            Ok(UploadSource::Markup(html.to_string()))
        }
        kind => {
            let path = request
                .source_path
                .as_deref()
                .filter(|p| !p.trim().is_empty())
                .ok_or_else(|| {
                    ApiError::BadRequest(format!("{} uploads require source_path", kind))
                })?;
            let path = PathBuf::from(path);
            if !path.is_file() {
                return Err(ApiError::BadRequest(format!(
                    "source file does not exist: {}",
                    path.display()
                )));
            }
            Ok(UploadSource::File(path))
        }
    }
}

/// GET /api/content/{id}
pub async fn get_content_detail(
    State(state): State<AppState>,
    Path(content_id): Path<i64>,
) -> ApiResult<Json<ContentDetailResponse>> {
    let item = content::get_content(&state.db, content_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("content {} not found", content_id)))?;

    let topics = topics::topics_for_content(&state.db, content_id).await?;

    Ok(Json(ContentDetailResponse {
        content: item,
        topics,
    }))
}

/// GET /api/content/{id}/topics
pub async fn get_content_topics(
    State(state): State<AppState>,
    Path(content_id): Path<i64>,
) -> ApiResult<Json<ContentTopicsResponse>> {
    if content::get_content(&state.db, content_id).await?.is_none() {
        return Err(ApiError::NotFound(format!(
            "content {} not found",
            content_id
        )));
    }

    let topics = topics::topics_for_content(&state.db, content_id).await?;

    Ok(Json(ContentTopicsResponse {
        content_id,
        total: topics.len(),
        topics,
    }))
}

/// Build content routes
pub fn content_routes() -> Router<AppState> {
    Router::new()
        .route("/api/content", post(upload_content))
        .route("/api/content/:id", get(get_content_detail))
        .route("/api/content/:id/topics", get(get_content_topics))
}
