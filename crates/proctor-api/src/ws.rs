//! The `/ws/proctor` streaming endpoint: one WebSocket connection per
//! proctoring session, one frame in, one verdict out.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use base64::Engine;
use futures_util::{SinkExt, StreamExt};
use opencv::core::Mat;
use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{info, warn};

use proctor_models::{ErrorFrame, FrameRequest};

use crate::error::EngineError;
use crate::metrics;
use crate::state::AppState;

static ACTIVE_WS_CONNECTIONS: AtomicI64 = AtomicI64::new(0);

const WS_SEND_BUFFER_SIZE: usize = 32;
const WS_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
const WS_CLIENT_TIMEOUT: Duration = Duration::from_secs(60);

/// Send a text frame with backpressure: try a non-blocking send first, fall
/// back to blocking the session task when the buffer is full.
async fn send_text(tx: &mpsc::Sender<Message>, body: String) -> bool {
    match tx.try_send(Message::Text(body.clone())) {
        Ok(_) => true,
        Err(mpsc::error::TrySendError::Full(_)) => tx.send(Message::Text(body)).await.is_ok(),
        Err(mpsc::error::TrySendError::Closed(_)) => false,
    }
}

async fn send_error(tx: &mpsc::Sender<Message>, err: &EngineError) -> bool {
    let frame: ErrorFrame = err.to_error_frame();
    match serde_json::to_string(&frame) {
        Ok(json) => send_text(tx, json).await,
        Err(_) => false,
    }
}

pub async fn ws_proctor(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let count = ACTIVE_WS_CONNECTIONS.fetch_add(1, Ordering::SeqCst) + 1;
    metrics::set_ws_active_connections(count);
    metrics::record_ws_connection_opened();

    ws.on_upgrade(|socket| async move {
        handle_proctor_socket(socket, state).await;
        let count = ACTIVE_WS_CONNECTIONS.fetch_sub(1, Ordering::SeqCst) - 1;
        metrics::set_ws_active_connections(count);
    })
}

/// Decode an inbound frame payload: strip an optional data-URI prefix,
/// base64-decode, then JPEG-decode into a BGR `Mat`.
fn decode_frame(payload: &str) -> Result<Mat, EngineError> {
    let raw = match payload.find(",") {
        Some(idx) if payload[..idx].starts_with("data:image/") => &payload[idx + 1..],
        _ => payload,
    };

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(raw.trim())
        .map_err(|e| EngineError::decode_failed(format!("base64: {e}")))?;

    Ok(proctor_vision::decode_jpeg_bgr(&bytes)?)
}

async fn handle_proctor_socket(socket: WebSocket, state: AppState) {
    let (ws_sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<Message>(WS_SEND_BUFFER_SIZE);

    let send_task = tokio::spawn(async move {
        let mut ws_sender = ws_sender;
        while let Some(msg) = rx.recv().await {
            if ws_sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    let (session_id, buffer) = state.create_session();
    info!(session_id, "proctoring session started");

    let mut heartbeat = interval(WS_HEARTBEAT_INTERVAL);
    let mut last_activity = std::time::Instant::now();

    loop {
        tokio::select! {
            client_msg = receiver.next() => {
                match client_msg {
                    Some(Ok(Message::Text(text))) => {
                        last_activity = std::time::Instant::now();
                        metrics::record_frame_received();

                        let request: FrameRequest = match serde_json::from_str(&text) {
                            Ok(r) => r,
                            Err(e) => {
                                metrics::record_decode_error();
                                send_error(&tx, &EngineError::invalid_frame(e.to_string())).await;
                                continue;
                            }
                        };

                        let frame = match decode_frame(&request.frame) {
                            Ok(f) => f,
                            Err(e) => {
                                metrics::record_decode_error();
                                send_error(&tx, &e).await;
                                continue;
                            }
                        };

                        let pipeline = state.pipeline.clone();
                        let buffer = buffer.clone();
                        let start = std::time::Instant::now();
                        let verdict = tokio::task::spawn_blocking(move || {
                            let mut guard = buffer.blocking_lock();
                            pipeline.process(frame, &mut guard, false)
                        })
                        .await;

                        match verdict {
                            Ok(Ok(verdict)) => {
                                metrics::record_frame_processing_duration(start.elapsed().as_secs_f64());
                                if verdict.details.skipped {
                                    metrics::record_frame_skipped();
                                }
                                if verdict.alert != "none" {
                                    for kind in verdict.alert.split(" AND ") {
                                        metrics::record_alert_raised(kind);
                                    }
                                }
                                if !verdict.details.skipped && !verdict.details.yolo_cached {
                                    metrics::record_object_detector_invocation();
                                }
                                match serde_json::to_string(&verdict) {
                                    Ok(json) => {
                                        if !send_text(&tx, json).await {
                                            warn!(session_id, "send failed, client disconnected");
                                            break;
                                        }
                                    }
                                    Err(e) => {
                                        warn!(session_id, error = %e, "failed to serialize verdict");
                                    }
                                }
                            }
                            Ok(Err(e)) => {
                                send_error(&tx, &EngineError::from(e)).await;
                            }
                            Err(e) => {
                                warn!(session_id, error = %e, "pipeline task panicked");
                                send_error(&tx, &EngineError::internal("frame processing failed")).await;
                            }
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {
                        last_activity = std::time::Instant::now();
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!(session_id, "client closed connection");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(session_id, error = %e, "websocket receive error");
                        break;
                    }
                    _ => {}
                }
            }
            _ = heartbeat.tick() => {
                if last_activity.elapsed() > WS_CLIENT_TIMEOUT {
                    info!(session_id, "client idle timeout");
                    break;
                }
                if tx.send(Message::Ping(vec![])).await.is_err() {
                    break;
                }
            }
        }
    }

    state.remove_session(session_id);
    drop(tx);
    let _ = send_task.await;
    info!(session_id, "proctoring session ended");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_frame_rejects_garbage_base64() {
        let err = decode_frame("not-base64!!!").unwrap_err();
        assert!(matches!(err, EngineError::DecodeFailed(_)));
    }

    #[test]
    fn test_decode_frame_strips_data_uri_prefix() {
        // A valid base64 payload with a junk body still strips the prefix
        // before attempting to decode, so the failure comes from the JPEG
        // decode step rather than the base64 step.
        let encoded = base64::engine::general_purpose::STANDARD.encode(b"not a jpeg");
        let payload = format!("data:image/jpeg;base64,{encoded}");
        let err = decode_frame(&payload).unwrap_err();
        assert!(matches!(err, EngineError::DecodeFailed(_)));
    }
}
