//! Streaming transport for the proctoring engine: a single `/ws/proctor`
//! WebSocket endpoint plus `/health` and `/metrics`.

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod ws;

pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use routes::create_router;
pub use state::AppState;
