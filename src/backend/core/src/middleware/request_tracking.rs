//! Request tracking middleware feeding the metrics aggregator.

use axum::{
    extract::{Request, State},
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::debug;

use crate::health::HealthMonitor;

static REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Record every request's outcome and duration with the monitor.
///
/// A response below 500 counts as successful. The request id from
/// `x-request-id` is echoed back, or generated when absent.
pub async fn track_requests(
    State(monitor): State<HealthMonitor>,
    req: Request,
    next: Next,
) -> Response {
    let _connection = monitor.track_connection();
    let started = Instant::now();

    let request_id = req
        .headers()
        .get(&REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let mut response = next.run(req).await;

    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    let status = response.status();
    monitor.record_request(!status.is_server_error(), elapsed_ms);

    debug!(
        request_id = %request_id,
        method = %method,
        path = %path,
        status = status.as_u16(),
        elapsed_ms,
        "Request completed"
    );

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        let _ = response.headers_mut().try_insert(REQUEST_ID.clone(), value);
    }
    response
}
