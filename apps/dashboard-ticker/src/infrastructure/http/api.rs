//! REST handlers for dashboards, feeds, content, configuration and the
//! ticker.
//!
//! Feed, content and configuration routes address a dashboard through the
//! `?dashboard=<id>` query parameter, defaulting to `default`.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};

use super::error::ApiResult;
use super::state::SharedState;
use crate::application::dto::{
    ContentUpdate, DashboardUpdate, FeedUpdate, NewContent, NewDashboard, NewFeed,
};
use crate::application::ports::TickerSource;
use crate::domain::dashboard::{
    ConfigUpdate, ContentItem, Dashboard, DashboardId, FeedSource, TickerConfig,
};
use crate::domain::ticker::TickerItem;

/// `?dashboard=<id>` selector.
#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    /// Target dashboard; missing or empty means `default`.
    pub dashboard: Option<String>,
}

impl DashboardQuery {
    /// Resolve the addressed dashboard.
    #[must_use]
    pub fn dashboard_id(&self) -> DashboardId {
        dashboard_or_default(self.dashboard.as_deref())
    }
}

/// Missing or blank ids address the `default` dashboard.
pub(super) fn dashboard_or_default(raw: Option<&str>) -> DashboardId {
    raw.map(str::trim)
        .filter(|id| !id.is_empty())
        .map_or_else(DashboardId::default_dashboard, DashboardId::new)
}

fn message(text: &str) -> Json<Value> {
    Json(json!({ "message": text }))
}

// =============================================================================
// Dashboards
// =============================================================================

pub(super) async fn list_dashboards(
    State(state): State<SharedState>,
) -> ApiResult<Json<Vec<Dashboard>>> {
    Ok(Json(state.repository.list_dashboards().await?))
}

pub(super) async fn create_dashboard(
    State(state): State<SharedState>,
    body: Result<Json<NewDashboard>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Dashboard>)> {
    let Json(request) = body?;
    let dashboard = state.repository.create_dashboard(request).await?;
    tracing::info!(dashboard = %dashboard.id, "Dashboard created");
    Ok((StatusCode::CREATED, Json(dashboard)))
}

pub(super) async fn get_dashboard(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Dashboard>> {
    let dashboard = state
        .repository
        .get_dashboard(&DashboardId::new(id))
        .await?;
    Ok(Json(dashboard))
}

pub(super) async fn update_dashboard(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    body: Result<Json<DashboardUpdate>, JsonRejection>,
) -> ApiResult<Json<Dashboard>> {
    let Json(update) = body?;
    let dashboard = state
        .repository
        .update_dashboard(&DashboardId::new(id), update)
        .await?;
    Ok(Json(dashboard))
}

pub(super) async fn delete_dashboard(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let dashboard = DashboardId::new(id);
    state.repository.delete_dashboard(&dashboard).await?;
    state.service.on_dashboard_deleted(&dashboard).await;
    Ok(message("Dashboard deleted"))
}

// =============================================================================
// Feeds
// =============================================================================

pub(super) async fn list_feeds(
    State(state): State<SharedState>,
    Query(query): Query<DashboardQuery>,
) -> ApiResult<Json<Vec<FeedSource>>> {
    let feeds = state
        .repository
        .list_feed_sources(&query.dashboard_id())
        .await?;
    Ok(Json(feeds))
}

pub(super) async fn create_feed(
    State(state): State<SharedState>,
    Query(query): Query<DashboardQuery>,
    body: Result<Json<NewFeed>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<FeedSource>)> {
    let Json(request) = body?;
    let dashboard = query.dashboard_id();
    let feed = state.repository.create_feed(&dashboard, request).await?;
    feeds_changed(&state, &dashboard).await;
    Ok((StatusCode::CREATED, Json(feed)))
}

pub(super) async fn update_feed(
    State(state): State<SharedState>,
    Query(query): Query<DashboardQuery>,
    Path(feed_id): Path<String>,
    body: Result<Json<FeedUpdate>, JsonRejection>,
) -> ApiResult<Json<FeedSource>> {
    let Json(update) = body?;
    let dashboard = query.dashboard_id();
    let feed = state
        .repository
        .update_feed(&dashboard, &feed_id, update)
        .await?;
    feeds_changed(&state, &dashboard).await;
    Ok(Json(feed))
}

pub(super) async fn delete_feed(
    State(state): State<SharedState>,
    Query(query): Query<DashboardQuery>,
    Path(feed_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let dashboard = query.dashboard_id();
    state.repository.delete_feed(&dashboard, &feed_id).await?;
    feeds_changed(&state, &dashboard).await;
    Ok(message("Feed deleted"))
}

/// The feed mutation already succeeded, so a failed refresh is only logged.
async fn feeds_changed(state: &SharedState, dashboard: &DashboardId) {
    if let Err(e) = state.service.on_feeds_changed(dashboard).await {
        tracing::error!(dashboard = %dashboard, error = %e, "Failed to refresh feeds");
    }
}

// =============================================================================
// Content
// =============================================================================

pub(super) async fn list_content(
    State(state): State<SharedState>,
    Query(query): Query<DashboardQuery>,
) -> ApiResult<Json<Vec<ContentItem>>> {
    let content = state.repository.get_content(&query.dashboard_id()).await?;
    Ok(Json(content))
}

pub(super) async fn create_content(
    State(state): State<SharedState>,
    Query(query): Query<DashboardQuery>,
    body: Result<Json<NewContent>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ContentItem>)> {
    let Json(request) = body?;
    let dashboard = query.dashboard_id();
    let item = state.repository.create_content(&dashboard, request).await?;
    content_changed(&state, &dashboard).await;
    Ok((StatusCode::CREATED, Json(item)))
}

pub(super) async fn update_content(
    State(state): State<SharedState>,
    Query(query): Query<DashboardQuery>,
    Path(content_id): Path<String>,
    body: Result<Json<ContentUpdate>, JsonRejection>,
) -> ApiResult<Json<ContentItem>> {
    let Json(update) = body?;
    let dashboard = query.dashboard_id();
    let item = state
        .repository
        .update_content(&dashboard, &content_id, update)
        .await?;
    content_changed(&state, &dashboard).await;
    Ok(Json(item))
}

pub(super) async fn delete_content(
    State(state): State<SharedState>,
    Query(query): Query<DashboardQuery>,
    Path(content_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let dashboard = query.dashboard_id();
    state
        .repository
        .delete_content(&dashboard, &content_id)
        .await?;
    content_changed(&state, &dashboard).await;
    Ok(message("Content deleted"))
}

async fn content_changed(state: &SharedState, dashboard: &DashboardId) {
    if let Err(e) = state.service.publish_content(dashboard).await {
        tracing::error!(dashboard = %dashboard, error = %e, "Failed to publish content");
    }
}

// =============================================================================
// Configuration
// =============================================================================

pub(super) async fn get_config(
    State(state): State<SharedState>,
    Query(query): Query<DashboardQuery>,
) -> ApiResult<Json<TickerConfig>> {
    let config = state.repository.get_config(&query.dashboard_id()).await?;
    Ok(Json(config))
}

pub(super) async fn update_config(
    State(state): State<SharedState>,
    Query(query): Query<DashboardQuery>,
    body: Result<Json<ConfigUpdate>, JsonRejection>,
) -> ApiResult<Json<TickerConfig>> {
    let Json(update) = body?;
    let dashboard = query.dashboard_id();
    let config = state.repository.update_config(&dashboard, update).await?;

    if let Err(e) = state
        .service
        .on_config_changed(&dashboard, &update, &config)
        .await
    {
        tracing::error!(dashboard = %dashboard, error = %e, "Failed to apply configuration");
    }

    Ok(Json(config))
}

// =============================================================================
// Ticker
// =============================================================================

pub(super) async fn get_ticker(
    State(state): State<SharedState>,
    Query(query): Query<DashboardQuery>,
) -> Json<Vec<TickerItem>> {
    Json(state.service.current_ticker_items(&query.dashboard_id()))
}
