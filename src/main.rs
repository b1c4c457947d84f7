//! VizWiz-style visual question answering backend.
//!
//! Serves an upload-then-ask workflow:
//! - Image uploads open short-lived sessions backed by files on disk
//! - Questions are answered by an out-of-process model server
//! - Idle sessions expire and their images are deleted

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use api::{router, AppState};
use inference::{InferenceConfig, ModelClient};
use sessions::{SessionConfig, SessionStore};
use telemetry::{health, init_tracing_from_env};

/// Application configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Config {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,

    /// CORS origins; `*` allows any
    #[serde(default = "default_allow_origins")]
    allow_origins: Vec<String>,

    #[serde(default)]
    sessions: SessionConfig,

    #[serde(default)]
    inference: InferenceConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_allow_origins() -> Vec<String> {
    vec!["*".to_string()]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allow_origins: default_allow_origins(),
            sessions: SessionConfig::default(),
            inference: InferenceConfig::default(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing_from_env();

    info!("Starting VQA backend v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;
    config
        .sessions
        .validate()
        .context("Invalid session configuration")?;

    info!(
        upload_dir = %config.sessions.upload_dir.display(),
        max_session_age_secs = config.sessions.max_session_age_secs,
        inference_url = %config.inference.url,
        "Loaded configuration"
    );

    // Session store
    let store = Arc::new(
        SessionStore::new(&config.sessions).context("Failed to open session store")?,
    );
    health().storage.set_healthy();

    if config.sessions.purge_orphans_on_start {
        match store.purge_orphans() {
            Ok(count) => info!(count = count, "Startup orphan purge finished"),
            Err(e) => warn!(error = %e, "Failed to purge orphaned uploads"),
        }
    }

    // Inference engine
    let engine = Arc::new(
        ModelClient::from_config(&config.inference)
            .context("Failed to create inference client")?,
    );
    if engine.is_mock() {
        warn!("No inference url configured, answering with the mock engine");
    }
    check_health(&engine).await;

    let model_monitor = start_model_monitor(
        engine.clone(),
        config.inference.health_check_interval(),
    );
    info!(
        interval_secs = config.inference.health_check_interval().as_secs(),
        "Started model health monitor"
    );

    let state = AppState::new(store.clone(), engine)
        .with_max_upload_bytes(config.sessions.max_upload_bytes)
        .with_allow_origins(config.allow_origins.clone());

    let sweeper = state.start_session_sweeper(config.sessions.sweep_interval());
    info!(
        interval_secs = config.sessions.sweep_interval_secs,
        "Started session sweeper"
    );

    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid server address")?;

    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down...");
    sweeper.abort();
    model_monitor.abort();

    // Sessions are not persisted; expired images go now, the rest on next start.
    let swept = store.sweep();
    info!(swept = swept, remaining = store.len(), "Shutdown complete");
    Ok(())
}

/// Load configuration from files and environment.
fn load_config() -> Result<Config> {
    let config = config::Config::builder()
        // Start with defaults
        .add_source(config::Config::try_from(&Config::default())?)
        // Load from config file if exists
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        // Override with environment variables
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix("VQA")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let mut config: Config = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    // Flat overrides; nested parsing is unreliable with underscored field names
    if let Ok(dir) = std::env::var("VQA_UPLOAD_DIR") {
        config.sessions.upload_dir = dir.into();
    }
    if let Ok(secs) = std::env::var("VQA_MAX_SESSION_AGE_SECS") {
        config.sessions.max_session_age_secs = secs
            .trim()
            .parse()
            .context("VQA_MAX_SESSION_AGE_SECS must be a whole number of seconds")?;
    }
    if let Ok(url) = std::env::var("VQA_INFERENCE_URL") {
        config.inference.url = url;
    }
    if let Ok(path) = std::env::var("VQA_VOCAB_PATH") {
        config.inference.vocab_path = Some(path.into());
    }

    Ok(config)
}

/// Record the model server state in `health().model`.
///
/// Logs on the first check and on every transition afterwards.
async fn check_health(engine: &ModelClient) {
    let was_healthy = health().model.is_healthy();
    if engine.check_connection().await {
        health().model.set_healthy();
        if !was_healthy {
            info!(labels = engine.vocab().len(), "Model server: healthy");
        }
    } else {
        if was_healthy || health().model.message().is_none() {
            error!("Model server: unhealthy");
        }
        health().model.set_unhealthy("Connection failed");
    }
}

/// Re-check the model server periodically so readiness follows it.
/// Returns a handle that can be used to cancel the task.
fn start_model_monitor(engine: Arc<ModelClient>, period: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; startup already checked.
        interval.tick().await;
        loop {
            interval.tick().await;
            check_health(&engine).await;
        }
    })
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }
}
