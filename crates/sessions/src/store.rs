//! In-memory session store with inactivity expiry.
//!
//! One mutex guards the id -> session map and every session's mutable fields,
//! so no caller can observe a half-finished removal. A removed entry leaves
//! the map before its file is deleted; file deletion then happens outside the
//! lock, since a removed id can never be looked up again.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use telemetry::metrics;
use tracing::{debug, info, warn};
use uuid::Uuid;
use vqa_core::{AnswerResult, Error, QaRecord, Result, Session};

use crate::clock::{Clock, SystemClock};
use crate::config::SessionConfig;
use crate::uploads::{delete_file, ManagedFile, UploadDir};

/// Why a session left the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Eviction {
    Expired,
    Removed,
}

/// Owner of all live sessions and their uploaded images.
pub struct SessionStore {
    sessions: Mutex<HashMap<Uuid, Session>>,
    uploads: UploadDir,
    max_age: Duration,
    clock: Arc<dyn Clock>,
    started_at: DateTime<Utc>,
}

impl SessionStore {
    /// Creates a store using the system clock.
    pub fn new(config: &SessionConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a store with a custom clock.
    pub fn with_clock(config: &SessionConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;

        let max_age = Duration::from_std(config.max_age())
            .map_err(|_| Error::config("max_session_age_secs is out of range"))?;
        let uploads = UploadDir::open(&config.upload_dir)?;

        info!(
            upload_dir = %uploads.path().display(),
            max_session_age_secs = config.max_session_age_secs,
            "Session store ready"
        );

        Ok(Self {
            sessions: Mutex::new(HashMap::new()),
            uploads,
            max_age,
            started_at: clock.now(),
            clock,
        })
    }

    /// Persists an uploaded image and opens a session for it.
    ///
    /// Nothing is inserted if the file cannot be written.
    pub fn create(&self, image: &[u8], original_filename: &str) -> Result<Uuid> {
        let id = Uuid::new_v4();
        let now = self.clock.now();

        let path = self
            .uploads
            .write(id, original_filename, image, now)
            .inspect_err(|e| {
                metrics().storage_errors.inc();
                warn!(error = %e, "Failed to persist upload");
            })?;

        let mut sessions = self.sessions.lock();
        sessions.insert(id, Session::new(id, path.clone(), now));
        metrics().active_sessions.set(sessions.len() as u64);
        drop(sessions);

        metrics().sessions_created.inc();
        info!(
            session_id = %id,
            path = %path.display(),
            size = image.len(),
            "Created session"
        );
        Ok(id)
    }

    /// Returns a snapshot of a live session and refreshes its access time.
    ///
    /// An expired session is removed on the spot and reported as not found.
    pub fn get(&self, id: &Uuid) -> Result<Session> {
        self.with_live(id, |session, now| {
            session.touch(now);
            session.clone()
        })
    }

    /// Appends an answered question to a live session's history.
    pub fn record_answer(
        &self,
        id: &Uuid,
        question: impl Into<String>,
        answer: AnswerResult,
    ) -> Result<QaRecord> {
        let record = self.with_live(id, |session, now| {
            session.record_answer(question, answer, now).clone()
        })?;

        metrics().answers_recorded.inc();
        debug!(session_id = %id, question = %record.question, "Recorded answer");
        Ok(record)
    }

    /// Deletes the session's image but keeps the session and its history.
    ///
    /// File deletion is attempted once; a failure is logged, not returned.
    pub fn complete(&self, id: &Uuid) -> Result<()> {
        let released = self.with_live(id, |session, now| {
            session.touch(now);
            session.release_image()
        })?;

        match released {
            Some(path) => {
                release_file(id, &path);
                metrics().sessions_completed.inc();
                info!(session_id = %id, "Completed session, image released");
            }
            None => debug!(session_id = %id, "Session already completed"),
        }
        Ok(())
    }

    /// Removes the session and deletes its image if still present.
    pub fn remove(&self, id: &Uuid) -> Result<()> {
        let session = {
            let mut sessions = self.sessions.lock();
            evict(&mut sessions, id)
        };

        match session {
            Some(session) => {
                discard(session, Eviction::Removed);
                Ok(())
            }
            None => Err(Error::SessionNotFound),
        }
    }

    /// Removes every expired session. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();

        let expired: Vec<Session> = {
            let mut sessions = self.sessions.lock();
            let ids: Vec<Uuid> = sessions
                .values()
                .filter(|s| s.is_expired_at(now, self.max_age))
                .map(|s| s.id)
                .collect();
            ids.iter()
                .filter_map(|id| evict(&mut sessions, id))
                .collect()
        };

        let count = expired.len();
        for session in expired {
            discard(session, Eviction::Expired);
        }

        if count > 0 {
            info!(count = count, "Swept expired sessions");
        }
        count
    }

    /// Deletes store-named files left behind by an earlier process.
    ///
    /// Files written since this store was built, files of live sessions, and
    /// files the store did not name are left alone.
    pub fn purge_orphans(&self) -> Result<usize> {
        let cutoff = self.started_at.timestamp();
        let files: Vec<ManagedFile> = self
            .uploads
            .managed_files()?
            .into_iter()
            .filter(|f| f.written_at < cutoff)
            .collect();

        let live: HashSet<PathBuf> = {
            let sessions = self.sessions.lock();
            sessions
                .values()
                .filter_map(|s| s.image_path.clone())
                .collect()
        };

        let mut purged = 0;
        for file in files {
            if live.contains(&file.path) {
                continue;
            }
            match delete_file(&file.path) {
                Ok(true) => {
                    purged += 1;
                    debug!(
                        session_id = %file.session_id,
                        path = %file.path.display(),
                        "Purged orphaned upload"
                    );
                }
                Ok(false) => {}
                Err(e) => {
                    metrics().file_delete_errors.inc();
                    warn!(path = %file.path.display(), error = %e, "Failed to purge orphaned upload");
                }
            }
        }

        if purged > 0 {
            metrics().orphans_purged.inc_by(purged as u64);
            info!(count = purged, "Purged orphaned uploads");
        }
        Ok(purged)
    }

    /// Number of sessions currently held, expired-but-unswept included.
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs `f` on a live session under the lock.
    ///
    /// Expired entries are evicted instead, and their file deleted after the
    /// lock is released.
    fn with_live<T>(&self, id: &Uuid, f: impl FnOnce(&mut Session, DateTime<Utc>) -> T) -> Result<T> {
        let now = self.clock.now();
        let mut sessions = self.sessions.lock();

        let expired = match sessions.entry(*id) {
            Entry::Vacant(_) => return Err(Error::SessionNotFound),
            Entry::Occupied(entry) if entry.get().is_expired_at(now, self.max_age) => {
                entry.remove()
            }
            Entry::Occupied(mut entry) => return Ok(f(entry.get_mut(), now)),
        };

        metrics().active_sessions.set(sessions.len() as u64);
        drop(sessions);

        discard(expired, Eviction::Expired);
        Err(Error::SessionNotFound)
    }
}

/// Takes a session out of the map. The caller releases the lock before `discard`.
fn evict(sessions: &mut HashMap<Uuid, Session>, id: &Uuid) -> Option<Session> {
    let session = sessions.remove(id);
    if session.is_some() {
        metrics().active_sessions.set(sessions.len() as u64);
    }
    session
}

/// Final cleanup for a session no longer in the map.
fn discard(session: Session, reason: Eviction) {
    if let Some(path) = session.image() {
        release_file(&session.id, path);
    }

    match reason {
        Eviction::Expired => {
            metrics().sessions_expired.inc();
            info!(
                session_id = %session.id,
                last_accessed_at = %session.last_accessed_at,
                "Session expired"
            );
        }
        Eviction::Removed => {
            metrics().sessions_removed.inc();
            info!(session_id = %session.id, questions = session.history.len(), "Session removed");
        }
    }
}

fn release_file(id: &Uuid, path: &Path) {
    match delete_file(path) {
        Ok(true) => debug!(session_id = %id, path = %path.display(), "Removed session file"),
        Ok(false) => debug!(session_id = %id, path = %path.display(), "Session file already gone"),
        Err(e) => {
            metrics().file_delete_errors.inc();
            warn!(
                session_id = %id,
                path = %path.display(),
                error = %e,
                "Failed to remove session file"
            );
        }
    }
}
