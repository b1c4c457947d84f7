//! Application state shared across handlers.

use inference::InferenceEngine;
use sessions::SessionStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error};
use vqa_core::limits::MAX_UPLOAD_SIZE_BYTES;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Session store (one per process)
    pub sessions: Arc<SessionStore>,
    /// Inference engine (model server client in production, mock in tests)
    pub engine: Arc<dyn InferenceEngine>,
    /// Largest accepted image, in bytes
    pub max_upload_bytes: usize,
    /// CORS origins; `*` allows any
    pub allow_origins: Vec<String>,
}

impl AppState {
    pub fn new(sessions: Arc<SessionStore>, engine: Arc<dyn InferenceEngine>) -> Self {
        Self {
            sessions,
            engine,
            max_upload_bytes: MAX_UPLOAD_SIZE_BYTES,
            allow_origins: vec!["*".to_string()],
        }
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    pub fn with_allow_origins(mut self, origins: Vec<String>) -> Self {
        self.allow_origins = origins;
        self
    }

    /// Start the periodic session sweep.
    /// Returns a handle that can be used to cancel the task.
    pub fn start_session_sweeper(&self, period: Duration) -> tokio::task::JoinHandle<()> {
        let sessions = self.sessions.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let store = sessions.clone();
                // File deletion is blocking I/O.
                match tokio::task::spawn_blocking(move || store.sweep()).await {
                    Ok(removed) => debug!(removed = removed, "Session sweep finished"),
                    Err(e) => error!(error = %e, "Session sweep task failed"),
                }
            }
        })
    }
}
