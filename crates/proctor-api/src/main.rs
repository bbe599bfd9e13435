//! Proctoring engine process entry point.

use std::net::SocketAddr;

use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use proctor_api::{create_router, metrics, AppState, EngineConfig};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("failed to install rustls crypto provider");

    let use_json = std::env::var("LOG_FORMAT").map(|v| v.to_lowercase() == "json").unwrap_or(false);

    let env_filter = EnvFilter::from_default_env().add_directive("proctor=info".parse().unwrap());

    if use_json {
        tracing_subscriber::registry().with(fmt::layer().json()).with(env_filter).init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(true).with_target(true).with_file(false).with_line_number(false))
            .with(env_filter)
            .init();
    }

    info!("starting proctoring engine");

    let config = EngineConfig::from_env();
    info!(host = %config.host, port = config.port, "engine config loaded");

    if !std::path::Path::new(&config.object_model_path).exists() {
        warn!(path = %config.object_model_path, "object detection model not found on disk, device detection will degrade");
    }

    let state = AppState::new(config.clone());

    let metrics_handle = if config.metrics_enabled {
        info!("prometheus metrics enabled at /metrics");
        Some(metrics::init_metrics())
    } else {
        None
    };

    let app = create_router(state, metrics_handle);

    let addr: SocketAddr = config.bind_addr().parse().expect("invalid bind address");
    info!(%addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await.unwrap();

    info!("server shutdown complete");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.expect("failed to install ctrl-c handler");
    info!("received shutdown signal");
}
