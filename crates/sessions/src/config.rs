//! Session store configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use vqa_core::{limits::MAX_UPLOAD_SIZE_BYTES, Error, Result, DEFAULT_MAX_SESSION_AGE_SECS};

/// Session store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Directory uploaded images are written to
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
    /// Inactivity window after which a session expires
    #[serde(default = "default_max_session_age_secs")]
    pub max_session_age_secs: u64,
    /// How often the background sweep runs
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    /// Largest accepted upload
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    /// Delete files left behind by a previous process on startup
    #[serde(default = "default_true")]
    pub purge_orphans_on_start: bool,
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("./uploads")
}

fn default_max_session_age_secs() -> u64 {
    DEFAULT_MAX_SESSION_AGE_SECS
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_max_upload_bytes() -> usize {
    MAX_UPLOAD_SIZE_BYTES
}

fn default_true() -> bool {
    true
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
            max_session_age_secs: default_max_session_age_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            max_upload_bytes: default_max_upload_bytes(),
            purge_orphans_on_start: default_true(),
        }
    }
}

impl SessionConfig {
    /// Config rooted at `upload_dir` with every other field defaulted.
    pub fn with_upload_dir(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            ..Self::default()
        }
    }

    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_session_age_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_session_age_secs == 0 {
            return Err(Error::config("max_session_age_secs must be greater than zero"));
        }
        if self.sweep_interval_secs == 0 {
            return Err(Error::config("sweep_interval_secs must be greater than zero"));
        }
        if self.max_upload_bytes == 0 {
            return Err(Error::config("max_upload_bytes must be greater than zero"));
        }
        Ok(())
    }
}
