//! Shared application state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use proctor_vision::{ModelRegistry, Pipeline, SessionBuffer};
use tokio::sync::Mutex as AsyncMutex;

pub type SessionId = u64;

/// Shared application state: process-wide model handles and the
/// `session_key -> SessionBuffer` map. The map itself is the only
/// cross-task shared structure; once a session's buffer is looked up, it is
/// owned (via its own `AsyncMutex`) only by that session's connection task
/// for the remainder of the stream.
#[derive(Clone)]
pub struct AppState {
    pub config: crate::config::EngineConfig,
    pub models: Arc<ModelRegistry>,
    pub pipeline: Arc<Pipeline>,
    sessions: Arc<Mutex<HashMap<SessionId, Arc<AsyncMutex<SessionBuffer>>>>>,
    next_session_id: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(config: crate::config::EngineConfig) -> Self {
        let models = Arc::new(ModelRegistry::load(&config.object_model_path));
        let pipeline = Arc::new(Pipeline::new(models.clone()));

        Self {
            config,
            models,
            pipeline,
            sessions: Arc::new(Mutex::new(HashMap::new())),
            next_session_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Issue a fresh monotonic session id and create its buffer. Matches
    /// exactly one connection's lifetime.
    pub fn create_session(&self) -> (SessionId, Arc<AsyncMutex<SessionBuffer>>) {
        let id = self.next_session_id.fetch_add(1, Ordering::SeqCst);
        let buffer = Arc::new(AsyncMutex::new(SessionBuffer::new()));
        self.sessions
            .lock()
            .expect("session map lock poisoned")
            .insert(id, buffer.clone());
        (id, buffer)
    }

    /// Drop a session's buffer on disconnect.
    pub fn remove_session(&self, id: SessionId) {
        self.sessions.lock().expect("session map lock poisoned").remove(&id);
    }

    pub fn active_session_count(&self) -> usize {
        self.sessions.lock().expect("session map lock poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    #[test]
    fn test_create_and_remove_session_updates_count() {
        let state = AppState::new(EngineConfig { object_model_path: "/nonexistent".into(), ..EngineConfig::default() });
        assert_eq!(state.active_session_count(), 0);
        let (id, _buf) = state.create_session();
        assert_eq!(state.active_session_count(), 1);
        state.remove_session(id);
        assert_eq!(state.active_session_count(), 0);
    }

    #[test]
    fn test_session_ids_are_monotonic() {
        let state = AppState::new(EngineConfig { object_model_path: "/nonexistent".into(), ..EngineConfig::default() });
        let (a, _) = state.create_session();
        let (b, _) = state.create_session();
        assert!(b > a);
    }
}
