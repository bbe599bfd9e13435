//! HTTP surface integration tests: `/health`, `/ready`, `/metrics`.
//!
//! No model weights are present in this environment, so `AppState::new`
//! always boots with a fully degraded `ModelRegistry` — these tests assert
//! the health endpoints report that honestly rather than failing outright.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use proctor_api::{create_router, AppState, EngineConfig};

fn test_state() -> AppState {
    AppState::new(EngineConfig { object_model_path: "/nonexistent/model.onnx".into(), ..EngineConfig::default() })
}

#[tokio::test]
async fn health_is_ok_even_with_no_models_loaded() {
    let app = create_router(test_state(), None);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn ready_reports_200_once_startup_has_run_even_if_degraded() {
    let app = create_router(test_state(), None);

    let response = app
        .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();

    // Startup always completes (it tolerates missing models), so /ready is
    // 200 even though every individual detector check reports unavailable.
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn metrics_endpoint_is_absent_when_disabled() {
    let app = create_router(test_state(), None);

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn metrics_endpoint_serves_prometheus_text_when_enabled() {
    let handle = proctor_api::metrics::init_metrics();
    let app = create_router(test_state(), Some(handle));

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let app = create_router(test_state(), None);

    let response = app
        .oneshot(Request::builder().uri("/does-not-exist").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
