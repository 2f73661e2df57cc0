//! Integration tests for the public launch page and content serving
//!
//! Covers link resolution, per-launch identity binding in HTML artifacts,
//! the generated video player page, and static serving of the tracking
//! runtime and extracted artifacts.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::json;
use tower::util::ServiceExt;

use tt_cd::config::{AnnotationConfig, DeliveryConfig, EventBusConfig, ScoringPolicy};
use tt_cd::services::PassthroughTagger;
use tt_cd::AppState;
use tt_common::events::EventBus;

async fn create_test_app() -> (axum::Router, sqlx::SqlitePool, tempfile::TempDir) {
    let pool = tt_common::db::init_memory_database()
        .await
        .expect("Failed to create in-memory database");
    let content_root = tempfile::tempdir().expect("Failed to create temp dir");

    let config = DeliveryConfig {
        bind_address: "127.0.0.1:0".to_string(),
        base_url: "http://localhost:5876".to_string(),
        database_path: ":memory:".into(),
        content_root: content_root.path().to_path_buf(),
        annotation: AnnotationConfig::default(),
        event_bus: EventBusConfig::default(),
        scoring: ScoringPolicy::default(),
    };

    let state = AppState::new(
        pool.clone(),
        config,
        EventBus::new(100),
        Arc::new(PassthroughTagger),
    );
    let app = tt_cd::build_router(state);

    (app, pool, content_root)
}

async fn seed_recipient(pool: &sqlx::SqlitePool) -> i64 {
    sqlx::query("INSERT INTO accounts (name, created_at) VALUES ('acme', '2026-01-01T00:00:00Z')")
        .execute(pool)
        .await
        .unwrap();
    sqlx::query(
        "INSERT INTO recipients (account_id, email, first_name, last_name, created_at)
         VALUES (1, 'pat@acme.test', 'Pat', 'Jones', '2026-01-01T00:00:00Z')",
    )
    .execute(pool)
    .await
    .unwrap()
    .last_insert_rowid()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn response_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

async fn response_text(response: axum::response::Response) -> String {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(body.to_vec()).unwrap()
}

async fn upload_content(app: &axum::Router, body: serde_json::Value) -> serde_json::Value {
    let response = app
        .clone()
        .oneshot(post_json("/api/content", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    response_json(response).await
}

async fn create_link(app: &axum::Router, recipient_id: i64, content_id: i64) -> String {
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/links",
            json!({ "recipient_id": recipient_id, "content_id": content_id }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    response_json(response).await["unique_link_id"]
        .as_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn test_launch_requires_link_id() {
    let (app, _pool, _content_root) = create_test_app().await;

    let response = app.clone().oneshot(get("/launch")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.oneshot(get("/launch?id=")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_launch_unknown_token_not_found() {
    let (app, _pool, _content_root) = create_test_app().await;

    let response = app
        .oneshot(get("/launch?id=00000000000000000000000000000000"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_launch_unresolved_content_not_found() {
    let (app, pool, _content_root) = create_test_app().await;
    let recipient_id = seed_recipient(&pool).await;

    // Content registered but never successfully ingested
    sqlx::query(
        "INSERT INTO content (account_id, title, upload_type, created_at, updated_at)
         VALUES (1, 'Pending Item', 'raw_html', '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
    )
    .execute(&pool)
    .await
    .unwrap();
    let token = create_link(&app, recipient_id, 1).await;

    let response = app
        .oneshot(get(&format!("/launch?id={}", token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_launch_binds_identity_into_html_artifact() {
    let (app, pool, _content_root) = create_test_app().await;
    let recipient_id = seed_recipient(&pool).await;

    upload_content(
        &app,
        json!({
            "account_id": 1,
            "title": "Security Basics",
            "upload_type": "raw_html",
            "html_content": "<html><body><h1>Lesson</h1></body></html>",
        }),
    )
    .await;
    let token = create_link(&app, recipient_id, 1).await;

    let response = app
        .oneshot(get(&format!("/launch?id={}", token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/html"));

    let body = response_text(response).await;
    assert!(body.contains("<h1>Lesson</h1>"));
    assert!(body.contains(&format!("trackingLinkId: \"{}\"", token)));
    assert!(body.contains(&format!("recipientId: \"{}\"", recipient_id)));
    assert!(!body.contains("__TT_LINK_ID__"));
    assert!(!body.contains("__TT_RECIPIENT_ID__"));
}

#[tokio::test]
async fn test_launch_video_player_page() {
    let (app, pool, _content_root) = create_test_app().await;
    let recipient_id = seed_recipient(&pool).await;
    let staging = tempfile::tempdir().unwrap();

    let video = staging.path().join("intro session.mp4");
    std::fs::write(&video, b"\x00\x00\x00\x18ftypmp42fake").unwrap();

    upload_content(
        &app,
        json!({
            "account_id": 1,
            "title": "Intro & <Basics>",
            "upload_type": "video",
            "source_path": video.to_str().unwrap(),
        }),
    )
    .await;
    let token = create_link(&app, recipient_id, 1).await;

    let response = app
        .oneshot(get(&format!("/launch?id={}", token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = response_text(response).await;
    // Title is escaped, filename sanitized, URL absolute
    assert!(body.contains("Intro &amp; &lt;Basics&gt;"));
    assert!(body.contains("http://localhost:5876/content/1/intro_session.mp4"));
    assert!(body.contains("Mark as Complete"));
    assert!(body.contains(&format!("trackingLinkId: \"{}\"", token)));
    assert!(body.contains("/track/completion"));
}

#[tokio::test]
async fn test_tracking_runtime_served() {
    let (app, _pool, _content_root) = create_test_app().await;

    let response = app.oneshot(get("/static/tracking.js")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/javascript"
    );

    let body = response_text(response).await;
    assert!(body.contains("window.TRAINTRACK"));
    assert!(body.contains("API_1484_11"));
    assert!(body.contains("RecordTest"));
}

#[tokio::test]
async fn test_extracted_artifacts_served_from_content_root() {
    let (app, pool, _content_root) = create_test_app().await;
    seed_recipient(&pool).await;

    upload_content(
        &app,
        json!({
            "account_id": 1,
            "title": "Security Basics",
            "upload_type": "raw_html",
            "html_content": "<html><body></body></html>",
        }),
    )
    .await;

    let response = app.oneshot(get("/content/1/launch.html")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
