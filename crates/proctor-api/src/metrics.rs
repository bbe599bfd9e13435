//! Prometheus metrics for the proctoring engine.

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Initialize the Prometheus metrics recorder.
pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

pub mod names {
    // HTTP metrics (only /health and /metrics carry these)
    pub const HTTP_REQUESTS_TOTAL: &str = "proctor_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "proctor_http_request_duration_seconds";

    // WebSocket session metrics
    pub const WS_CONNECTIONS_TOTAL: &str = "proctor_ws_connections_total";
    pub const WS_CONNECTIONS_ACTIVE: &str = "proctor_ws_connections_active";
    pub const WS_FRAMES_RECEIVED_TOTAL: &str = "proctor_ws_frames_received_total";
    pub const WS_FRAMES_SKIPPED_TOTAL: &str = "proctor_ws_frames_skipped_total";
    pub const WS_DECODE_ERRORS_TOTAL: &str = "proctor_ws_decode_errors_total";

    // Pipeline metrics
    pub const FRAME_PROCESSING_DURATION_SECONDS: &str = "proctor_frame_processing_duration_seconds";
    pub const ALERTS_RAISED_TOTAL: &str = "proctor_alerts_raised_total";
    pub const OBJECT_DETECTOR_INVOCATIONS_TOTAL: &str = "proctor_object_detector_invocations_total";
}

pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", path.to_string()),
        ("status", status.to_string()),
    ];
    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

pub fn record_ws_connection_opened() {
    counter!(names::WS_CONNECTIONS_TOTAL).increment(1);
}

pub fn set_ws_active_connections(count: i64) {
    gauge!(names::WS_CONNECTIONS_ACTIVE).set(count as f64);
}

pub fn record_frame_received() {
    counter!(names::WS_FRAMES_RECEIVED_TOTAL).increment(1);
}

pub fn record_frame_skipped() {
    counter!(names::WS_FRAMES_SKIPPED_TOTAL).increment(1);
}

pub fn record_decode_error() {
    counter!(names::WS_DECODE_ERRORS_TOTAL).increment(1);
}

pub fn record_frame_processing_duration(duration_secs: f64) {
    histogram!(names::FRAME_PROCESSING_DURATION_SECONDS).record(duration_secs);
}

pub fn record_alert_raised(kind: &str) {
    let labels = [("kind", kind.to_string())];
    counter!(names::ALERTS_RAISED_TOTAL, &labels).increment(1);
}

pub fn record_object_detector_invocation() {
    counter!(names::OBJECT_DETECTOR_INVOCATIONS_TOTAL).increment(1);
}

/// Metrics middleware for the small HTTP surface (`/health`, `/metrics`).
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();
    record_http_request(&method, &path, status, duration);

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_namespaced_under_proctor() {
        assert!(names::HTTP_REQUESTS_TOTAL.starts_with("proctor_"));
        assert!(names::WS_CONNECTIONS_ACTIVE.starts_with("proctor_"));
    }
}
