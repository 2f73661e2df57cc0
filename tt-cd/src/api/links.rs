//! Launch link creation handler

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use crate::db::{content, recipients};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// POST /api/links request
#[derive(Debug, Deserialize)]
pub struct CreateLinkRequest {
    pub recipient_id: i64,
    pub content_id: i64,
}

#[derive(Debug, Serialize)]
pub struct RecipientSummary {
    pub id: i64,
    pub email: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct ContentSummary {
    pub id: i64,
    pub title: String,
}

/// POST /api/links response
#[derive(Debug, Serialize)]
pub struct CreateLinkResponse {
    /// Row id of the tracking link
    pub tracking_link_id: i64,
    /// Public token carried in the launch URL
    pub unique_link_id: String,
    pub launch_url: String,
    pub recipient: RecipientSummary,
    pub content: ContentSummary,
}

/// POST /api/links
///
/// Issue a PENDING tracking link for a (recipient, content) pair and
/// return the launch URL to distribute.
pub async fn create_link(
    State(state): State<AppState>,
    Json(request): Json<CreateLinkRequest>,
) -> ApiResult<Json<CreateLinkResponse>> {
    let recipient = recipients::get_recipient(&state.db, request.recipient_id)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!("recipient {} not found", request.recipient_id))
        })?;
    let item = content::get_content(&state.db, request.content_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("content {} not found", request.content_id)))?;

    let link = state
        .lifecycle
        .create_link(request.recipient_id, request.content_id)
        .await?;

    let launch_url = state.config.launch_url(&link.unique_link_id);

    Ok(Json(CreateLinkResponse {
        tracking_link_id: link.id,
        unique_link_id: link.unique_link_id,
        launch_url,
        recipient: RecipientSummary {
            id: recipient.id,
            name: recipient.display_name(),
            email: recipient.email,
        },
        content: ContentSummary {
            id: item.id,
            title: item.title,
        },
    }))
}

/// Build link routes
pub fn link_routes() -> Router<AppState> {
    Router::new().route("/api/links", post(create_link))
}
