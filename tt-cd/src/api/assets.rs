//! Static asset handlers
//!
//! Embeds the tracking runtime at compile time so instrumented content can
//! load it from this service with no extra deployment step.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

use crate::AppState;

const TRACKING_JS: &str = include_str!("../../static/tracking.js");

/// GET /static/tracking.js
///
/// Serves the in-content tracking runtime referenced by every
/// instrumented document
pub async fn serve_tracking_js() -> Response {
    (
        StatusCode::OK,
        [
            ("content-type", "application/javascript"),
            ("cache-control", "no-cache, no-store, must-revalidate"),
        ],
        TRACKING_JS,
    )
        .into_response()
}

/// Build static asset routes
pub fn asset_routes() -> Router<AppState> {
    Router::new().route("/static/tracking.js", get(serve_tracking_js))
}
