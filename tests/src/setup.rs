//! Common test setup functions.

use api::{router, state::AppState};
use axum::Router;
use axum_test::TestServer;
use inference::InferenceEngine;
use sessions::{ManualClock, SessionConfig, SessionStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use telemetry::health;
use tempfile::TempDir;
use uuid::Uuid;

use crate::fixtures;
use crate::mocks::MockInferenceEngine;

/// Inactivity window used by every test context.
pub const TEST_MAX_AGE_SECS: u64 = 60;

/// Test context with a real store and router over a temporary directory.
///
/// - The real Axum router with all layers
/// - A real `SessionStore` writing into a temp directory
/// - `ManualClock` so expiry is driven by the test, not by sleeping
/// - `MockInferenceEngine` in place of the model server
pub struct TestContext {
    pub tmp: TempDir,
    pub clock: Arc<ManualClock>,
    pub store: Arc<SessionStore>,
    pub engine: Arc<MockInferenceEngine>,
    pub router: Router,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_max_upload_bytes(vqa_core::limits::MAX_UPLOAD_SIZE_BYTES)
    }

    /// Context whose upload cap is `max_upload_bytes`.
    pub fn with_max_upload_bytes(max_upload_bytes: usize) -> Self {
        let tmp = tempfile::tempdir().expect("Failed to create temp dir");
        let config = SessionConfig {
            max_session_age_secs: TEST_MAX_AGE_SECS,
            max_upload_bytes,
            ..SessionConfig::with_upload_dir(tmp.path().join("uploads"))
        };

        let clock = Arc::new(ManualClock::starting_now());
        let store = Arc::new(
            SessionStore::with_clock(&config, clock.clone()).expect("Failed to create store"),
        );
        let engine = Arc::new(MockInferenceEngine::new());

        let state = AppState::new(store.clone(), engine.clone() as Arc<dyn InferenceEngine>)
            .with_max_upload_bytes(max_upload_bytes);
        let router = router(state);

        // Mirrors a successful startup.
        health().storage.set_healthy();
        health().model.set_healthy();

        Self {
            tmp,
            clock,
            store,
            engine,
            router,
        }
    }

    pub fn server(&self) -> TestServer {
        TestServer::new(self.router.clone()).expect("Failed to create test server")
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.tmp.path().join("uploads")
    }

    /// Files currently in the upload directory.
    pub fn stored_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(self.upload_dir())
            .map(|entries| entries.flatten().map(|e| e.path()).collect())
            .unwrap_or_default();
        files.sort();
        files
    }

    /// Moves the clock past the inactivity window.
    pub fn expire_all(&self) {
        self.advance_secs(TEST_MAX_AGE_SECS as i64 + 1);
    }

    pub fn advance_secs(&self, secs: i64) {
        self.clock.advance(chrono::Duration::seconds(secs));
    }

    /// Image path of a live session, straight from the store.
    pub fn image_path(&self, id: &Uuid) -> Option<PathBuf> {
        self.store.get(id).ok().and_then(|s| s.image_path)
    }

    /// Uploads a PNG through the API and returns the new session id.
    pub async fn upload(&self, server: &TestServer) -> Uuid {
        let response = server
            .post("/api/vqa/upload")
            .multipart(fixtures::png_form())
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        body["session_id"]
            .as_str()
            .and_then(|s| Uuid::parse_str(s).ok())
            .expect("upload response should carry a session id")
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// True if `path` lives under `dir`.
pub fn is_within(path: &Path, dir: &Path) -> bool {
    path.starts_with(dir)
}
