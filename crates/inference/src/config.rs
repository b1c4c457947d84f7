//! Inference configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Inference client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Model server base URL; empty or "mock" answers locally
    #[serde(default)]
    pub url: String,
    /// Answer vocabulary JSON, required unless mocked
    #[serde(default)]
    pub vocab_path: Option<PathBuf>,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Seconds between model server health checks
    #[serde(default = "default_health_check_interval_secs")]
    pub health_check_interval_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_health_check_interval_secs() -> u64 {
    30
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            vocab_path: None,
            timeout_secs: default_timeout_secs(),
            health_check_interval_secs: default_health_check_interval_secs(),
        }
    }
}

impl InferenceConfig {
    pub fn mock() -> Self {
        Self {
            url: "mock".to_string(),
            ..Self::default()
        }
    }

    pub fn is_mock(&self) -> bool {
        let url = self.url.trim();
        url.is_empty() || url == "mock"
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Never zero, so the health check interval is always valid.
    pub fn health_check_interval(&self) -> Duration {
        Duration::from_secs(self.health_check_interval_secs.max(1))
    }
}
