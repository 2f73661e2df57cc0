//! Launch page handler
//!
//! Resolves a public link token in one lookup and serves the content.
//! HTML artifacts go out with the session identifiers substituted into the
//! injected state object; video uploads get a generated player page whose
//! inline script fires the view beacon on load and a score-100 completion
//! from a button that unlocks when playback ends.

use axum::{
    extract::{Query, State},
    response::Html,
    routing::get,
    Router,
};
use serde::Deserialize;

use crate::db::links::{self, LaunchContext};
use crate::error::{ApiError, ApiResult};
use crate::models::UploadKind;
use crate::services::instrumentor;
use crate::AppState;

/// GET /launch query parameters
#[derive(Debug, Deserialize)]
pub struct LaunchParams {
    pub id: Option<String>,
}

const VIDEO_PLAYER_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>__TITLE__</title>
    <style>
        body { margin: 0; padding: 20px; font-family: Arial, sans-serif; background: #f5f5f5; }
        .container { max-width: 1200px; margin: 0 auto; background: white; padding: 20px; border-radius: 8px; }
        h1 { margin-top: 0; color: #333; }
        video { width: 100%; border-radius: 4px; }
        .completion-button { margin-top: 20px; padding: 12px 24px; background: #007bff; color: white; border: none; border-radius: 4px; font-size: 16px; cursor: pointer; }
        .completion-button:disabled { background: #ccc; cursor: not-allowed; }
    </style>
</head>
<body>
    <div class="container">
        <h1>__TITLE__</h1>
        <video id="contentVideo" controls>
            <source src="__VIDEO_URL__" type="video/mp4">
            Your browser does not support the video tag.
        </video>
        <button id="completeButton" class="completion-button" disabled>Mark as Complete</button>
    </div>

    <script>
        window.TRAINTRACK = {
            trackingLinkId: "__LINK_ID__",
            recipientId: __RECIPIENT_ID__,
            contentId: __CONTENT_ID__,
            apiBase: "/api",
            interactions: [],
            initialized: false
        };

        var video = document.getElementById('contentVideo');
        var completeButton = document.getElementById('completeButton');

        fetch(window.TRAINTRACK.apiBase + '/track/view', {
            method: 'POST',
            headers: { 'Content-Type': 'application/json' },
            body: JSON.stringify({ tracking_link_id: window.TRAINTRACK.trackingLinkId })
        });

        video.addEventListener('ended', function () {
            completeButton.disabled = false;
        });

        completeButton.addEventListener('click', function () {
            fetch(window.TRAINTRACK.apiBase + '/track/completion', {
                method: 'POST',
                headers: { 'Content-Type': 'application/json' },
                body: JSON.stringify({
                    tracking_link_id: window.TRAINTRACK.trackingLinkId,
                    score: 100,
                    interactions: []
                })
            }).then(function () {
                completeButton.disabled = true;
            }).catch(function (err) {
                console.error('Failed to record completion:', err);
            });
        });
    </script>
</body>
</html>
"#;

/// GET /launch?id={token}
pub async fn launch_content(
    State(state): State<AppState>,
    Query(params): Query<LaunchParams>,
) -> ApiResult<Html<String>> {
    let token = params
        .id
        .as_deref()
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("missing launch link id".to_string()))?;

    let context = links::get_launch_context(&state.db, token)
        .await?
        .ok_or_else(|| ApiError::NotFound("launch link not found".to_string()))?;

    if context.content_identifier == "pending" {
        return Err(ApiError::NotFound(format!(
            "content {} has no servable artifact yet",
            context.link.content_id
        )));
    }

    match context.upload_type {
        UploadKind::Video => Ok(Html(video_player_page(&state, &context))),
        _ => serve_artifact(&state, &context).await,
    }
}

async fn serve_artifact(state: &AppState, context: &LaunchContext) -> ApiResult<Html<String>> {
    let path = state.config.content_root.join(&context.content_identifier);
    let markup = tokio::fs::read_to_string(&path).await?;

    Ok(Html(instrumentor::bind_launch_identity(
        &markup,
        &context.link.unique_link_id,
        context.link.recipient_id,
    )))
}

fn video_player_page(state: &AppState, context: &LaunchContext) -> String {
    let video_url = format!(
        "{}/content/{}",
        state.config.base_url, context.content_identifier
    );

    VIDEO_PLAYER_TEMPLATE
        .replace("__TITLE__", &escape_html(&context.content_title))
        .replace("__VIDEO_URL__", &escape_html(&video_url))
        .replace("__LINK_ID__", &context.link.unique_link_id)
        .replace("__RECIPIENT_ID__", &context.link.recipient_id.to_string())
        .replace("__CONTENT_ID__", &context.link.content_id.to_string())
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Build launch routes
pub fn launch_routes() -> Router<AppState> {
    Router::new().route("/launch", get(launch_content))
}
