//! HTTP API Integration Tests
//!
//! Drives the router in-process with `tower::ServiceExt::oneshot`.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use common::{Harness, Script, entry};
use dashboard_ticker::router;

fn app(h: &Harness) -> Router {
    router(h.app_state())
}

async fn call(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn health_reports_ok() {
    let h = Harness::new();
    let (status, body) = call(app(&h), "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["timestamp"].is_string());
    assert_eq!(body["viewers"]["connections"], 0);
}

#[tokio::test]
async fn readiness_follows_the_scheduler() {
    let h = Harness::new();
    let (status, _) = call(app(&h), "GET", "/readyz", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    h.service.scheduler().start().await;
    let (status, _) = call(app(&h), "GET", "/readyz", None).await;
    assert_eq!(status, StatusCode::OK);
    h.service.scheduler().stop();
}

// =============================================================================
// Dashboards
// =============================================================================

#[tokio::test]
async fn dashboard_lifecycle() {
    let h = Harness::new();

    let (status, created) = call(
        app(&h),
        "POST",
        "/api/dashboards",
        Some(json!({"id": "lobby", "name": "Lobby"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["id"], "lobby");

    let (status, body) = call(
        app(&h),
        "POST",
        "/api/dashboards",
        Some(json!({"id": "lobby"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Dashboard with this ID already exists");

    let (status, list) = call(app(&h), "GET", "/api/dashboards", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 2);

    let (status, updated) = call(
        app(&h),
        "PUT",
        "/api/dashboards/lobby",
        Some(json!({"description": "Front desk"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["description"], "Front desk");

    let (status, body) = call(app(&h), "DELETE", "/api/dashboards/lobby", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Dashboard deleted");

    let (status, _) = call(app(&h), "GET", "/api/dashboards/lobby", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_dashboard_ids_are_rejected() {
    let h = Harness::new();

    let (status, body) = call(
        app(&h),
        "POST",
        "/api/dashboards",
        Some(json!({"id": "no spaces"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = call(app(&h), "POST", "/api/dashboards", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn default_dashboard_cannot_be_deleted() {
    let h = Harness::new();
    let (status, body) = call(app(&h), "DELETE", "/api/dashboards/default", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Cannot delete default dashboard");
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let h = Harness::new();
    let request = Request::builder()
        .method("POST")
        .uri("/api/dashboards")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app(&h).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Feeds
// =============================================================================

#[tokio::test]
async fn creating_a_feed_refreshes_the_ticker() {
    let h = Harness::new();
    h.fetcher.script(
        "https://news.example.com/rss",
        Script::Entries(vec![entry("n1", "Headline", "2024-03-01T10:00:00Z")]),
    );

    let (status, feed) = call(
        app(&h),
        "POST",
        "/api/feeds",
        Some(json!({"name": "News", "url": "https://news.example.com/rss"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(feed["name"], "News");

    let (status, ticker) = call(app(&h), "GET", "/api/ticker", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ticker[0]["title"], "Headline");
    assert_eq!(ticker[0]["feedName"], "News");

    let id = feed["id"].as_str().unwrap();
    let (status, body) = call(app(&h), "DELETE", &format!("/api/feeds/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Feed deleted");

    let (_, ticker) = call(app(&h), "GET", "/api/ticker", None).await;
    assert_eq!(ticker, json!([]));
}

#[tokio::test]
async fn feed_validation_and_lookup_errors() {
    let h = Harness::new();

    let (status, _) = call(
        app(&h),
        "POST",
        "/api/feeds",
        Some(json!({"url": "not a url"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        app(&h),
        "POST",
        "/api/feeds?dashboard=ghost",
        Some(json!({"url": "https://news.example.com/rss"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = call(
        app(&h),
        "PUT",
        "/api/feeds/missing",
        Some(json!({"name": "x"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Feed not found");

    let (status, body) = call(app(&h), "GET", "/api/feeds?dashboard=ghost", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

// =============================================================================
// Content
// =============================================================================

#[tokio::test]
async fn content_crud() {
    let h = Harness::new();

    let (status, item) = call(
        app(&h),
        "POST",
        "/api/content",
        Some(json!({"url": "https://intranet.example.com/menu", "title": "Menu"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(item["type"], "webpage");

    let id = item["id"].as_str().unwrap().to_string();
    let (status, updated) = call(
        app(&h),
        "PUT",
        &format!("/api/content/{id}"),
        Some(json!({"title": "Lunch"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Lunch");

    let (_, list) = call(app(&h), "GET", "/api/content", None).await;
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, body) = call(app(&h), "DELETE", &format!("/api/content/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Content deleted");

    let (status, _) = call(app(&h), "DELETE", &format!("/api/content/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Configuration
// =============================================================================

#[tokio::test]
async fn config_update_merges_partial_fields() {
    let h = Harness::new();

    let (status, before) = call(app(&h), "GET", "/api/config", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, after) = call(
        app(&h),
        "POST",
        "/api/config",
        Some(json!({"maxTickerItems": 5, "tickerEnabled": false})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(after["maxTickerItems"], 5);
    assert_eq!(after["tickerEnabled"], false);
    assert_eq!(after["rotationInterval"], before["rotationInterval"]);
}

#[tokio::test]
async fn config_rejects_zero_intervals_and_unknown_dashboards() {
    let h = Harness::new();

    let (status, _) = call(
        app(&h),
        "POST",
        "/api/config",
        Some(json!({"tickerRefreshInterval": 0})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(app(&h), "GET", "/api/config?dashboard=ghost", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Dashboard not found");
}
