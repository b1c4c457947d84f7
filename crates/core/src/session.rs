//! Session state types.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::answer::AnswerResult;

/// Default inactivity window (30 minutes).
pub const DEFAULT_MAX_SESSION_AGE_SECS: u64 = 30 * 60;

/// One question/answer exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaRecord {
    pub question: String,
    pub answer: AnswerResult,
    pub timestamp: DateTime<Utc>,
}

/// One user's question answering interaction over one uploaded image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Unique session ID
    pub id: Uuid,
    /// Uploaded image, `None` once released by `complete`
    pub image_path: Option<PathBuf>,
    pub created_at: DateTime<Utc>,
    /// Last lookup or mutation, never earlier than `created_at`
    pub last_accessed_at: DateTime<Utc>,
    /// Append-only, in submission order
    pub history: Vec<QaRecord>,
}

impl Session {
    /// Creates a new session with an empty history.
    pub fn new(id: Uuid, image_path: PathBuf, now: DateTime<Utc>) -> Self {
        Self {
            id,
            image_path: Some(image_path),
            created_at: now,
            last_accessed_at: now,
            history: Vec::new(),
        }
    }

    /// Checks inactivity against `max_age`. Creation time plays no part.
    pub fn is_expired_at(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        now - self.last_accessed_at > max_age
    }

    /// Refreshes the access time. A clock that steps backwards never rewinds it.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.last_accessed_at {
            self.last_accessed_at = now;
        }
    }

    /// Appends an answered question and refreshes the access time.
    pub fn record_answer(
        &mut self,
        question: impl Into<String>,
        answer: AnswerResult,
        now: DateTime<Utc>,
    ) -> &QaRecord {
        self.touch(now);
        self.history.push(QaRecord {
            question: question.into(),
            answer,
            timestamp: self.last_accessed_at,
        });
        &self.history[self.history.len() - 1]
    }

    /// Detaches the image path, leaving the session without a backing file.
    pub fn release_image(&mut self) -> Option<PathBuf> {
        self.image_path.take()
    }

    pub fn image(&self) -> Option<&Path> {
        self.image_path.as_deref()
    }

    pub fn image_released(&self) -> bool {
        self.image_path.is_none()
    }
}
