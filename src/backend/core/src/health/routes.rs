//! Health HTTP routes.

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    middleware::from_fn_with_state,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::BroadcastStream;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::{ComponentType, HealthMonitor};
use crate::error::{Result, SentinelError};
use crate::middleware::track_requests;
use crate::telemetry::MetricsRegistry;

/// Shared state for the health routes.
#[derive(Clone)]
pub struct AppState {
    pub monitor: HealthMonitor,
    pub metrics: MetricsRegistry,
}

/// Success envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AlertsQuery {
    #[serde(default)]
    pub include_resolved: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SinceQuery {
    pub since: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct IntervalRequest {
    pub interval_ms: u64,
}

/// Build the full router: health routes, Prometheus endpoint, request
/// tracking, tracing and CORS.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(health_routes())
        .route("/metrics", get(prometheus_metrics))
        .layer(from_fn_with_state(state.monitor.clone(), track_requests))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// The `/health` route tree without middleware.
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/live", get(liveness_check))
        .route("/health/ready", get(readiness_check))
        .route("/health/components/:name", get(component_health))
        .route("/health/components/type/:type", get(components_by_type))
        .route("/health/metrics", get(system_metrics))
        .route("/health/alerts", get(list_alerts))
        .route("/health/alerts/summary", get(alert_summary))
        .route("/health/alerts/resolved", delete(clear_resolved_alerts))
        .route("/health/alerts/:id/acknowledge", post(acknowledge_alert))
        .route("/health/history", get(history))
        .route("/health/uptime", get(uptime))
        .route("/health/events", get(event_stream))
        .route("/health/checks", get(list_checks))
        .route("/health/checks/run", post(run_all_checks))
        .route("/health/checks/:name", delete(unregister_check))
        .route("/health/checks/:name/run", post(run_check))
        .route("/health/checks/:name/enable", post(enable_check))
        .route("/health/checks/:name/disable", post(disable_check))
        .route("/health/checks/:name/interval", put(update_interval))
}

/// GET /health - Run every enabled check and aggregate
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let report = state.monitor.get_health().await;
    let status = StatusCode::from_u16(report.http_status()).unwrap_or(StatusCode::OK);
    (status, Json(report))
}

/// GET /health/live - Liveness probe
pub async fn liveness_check(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.monitor.get_liveness()))
}

/// GET /health/ready - Readiness probe from cached results
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let response = state.monitor.get_readiness();
    let status = if response.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}

async fn component_health(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse> {
    let result = state
        .monitor
        .get_component_health(&name)
        .ok_or_else(|| SentinelError::check_not_found(&name))?;
    Ok(ApiResponse::success(result))
}

async fn components_by_type(
    State(state): State<AppState>,
    Path(component_type): Path<String>,
) -> Result<impl IntoResponse> {
    let component_type: ComponentType = component_type
        .parse()
        .map_err(|e: String| SentinelError::validation(e))?;
    Ok(ApiResponse::success(
        state.monitor.get_components_by_type(component_type),
    ))
}

async fn system_metrics(State(state): State<AppState>) -> impl IntoResponse {
    ApiResponse::success(state.monitor.get_metrics())
}

async fn list_alerts(
    State(state): State<AppState>,
    Query(query): Query<AlertsQuery>,
) -> impl IntoResponse {
    ApiResponse::success(state.monitor.get_alerts(query.include_resolved))
}

async fn alert_summary(State(state): State<AppState>) -> impl IntoResponse {
    ApiResponse::success(state.monitor.alert_summary())
}

async fn acknowledge_alert(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    Ok(ApiResponse::success(state.monitor.acknowledge_alert(&id)?))
}

async fn clear_resolved_alerts(State(state): State<AppState>) -> impl IntoResponse {
    let removed = state.monitor.clear_resolved_alerts();
    ApiResponse::success(serde_json::json!({ "removed": removed }))
}

async fn history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> impl IntoResponse {
    ApiResponse::success(state.monitor.get_history(query.since, query.limit))
}

async fn uptime(
    State(state): State<AppState>,
    Query(query): Query<SinceQuery>,
) -> impl IntoResponse {
    ApiResponse::success(state.monitor.get_uptime_stats(query.since))
}

/// GET /health/events - Server-sent stream of health events
async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let stream = BroadcastStream::new(state.monitor.subscribe()).filter_map(|event| async move {
        // Lagged receivers skip the events they missed.
        let event = event.ok()?;
        Event::default().event(event.name()).json_data(&event).ok().map(Ok)
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn list_checks(State(state): State<AppState>) -> impl IntoResponse {
    ApiResponse::success(state.monitor.get_all_checks())
}

async fn run_all_checks(State(state): State<AppState>) -> impl IntoResponse {
    ApiResponse::success(state.monitor.run_all_checks().await)
}

async fn run_check(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse> {
    Ok(ApiResponse::success(state.monitor.run_check(&name).await?))
}

async fn enable_check(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse> {
    state.monitor.enable_check(&name)?;
    Ok(ApiResponse::success(serde_json::json!({ "name": name, "enabled": true })))
}

async fn disable_check(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse> {
    state.monitor.disable_check(&name)?;
    Ok(ApiResponse::success(serde_json::json!({ "name": name, "enabled": false })))
}

async fn update_interval(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(body): Json<IntervalRequest>,
) -> Result<impl IntoResponse> {
    state
        .monitor
        .update_check_interval(&name, Duration::from_millis(body.interval_ms))?;
    Ok(ApiResponse::success(
        serde_json::json!({ "name": name, "interval_ms": body.interval_ms }),
    ))
}

async fn unregister_check(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse> {
    if !state.monitor.unregister_check(&name) {
        return Err(SentinelError::check_not_found(&name));
    }
    Ok(ApiResponse::success(serde_json::json!({ "name": name, "removed": true })))
}

/// GET /metrics - Prometheus text exposition
async fn prometheus_metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        state.metrics.render(),
    )
}
