//! Upload directory: persists image bytes under collision-free names.
//!
//! Files are named `{unix_timestamp}_{session_uuid}{.ext}`. Only names of that
//! shape are ever considered owned by the store.

use chrono::{DateTime, Utc};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;
use vqa_core::{limits::MAX_EXTENSION_LEN, Error, Result};

/// A file in the upload directory carrying a store-generated name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedFile {
    pub path: PathBuf,
    pub session_id: Uuid,
    /// Unix seconds from the name prefix
    pub written_at: i64,
}

/// Root directory for uploaded images.
#[derive(Debug, Clone)]
pub struct UploadDir {
    root: PathBuf,
}

impl UploadDir {
    /// Opens `root`, creating it if missing.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| {
            Error::storage(
                format!("failed to create upload directory {}", root.display()),
                e,
            )
        })?;

        if !root.is_dir() {
            return Err(Error::storage(
                format!("upload path {} is not a directory", root.display()),
                io::Error::new(io::ErrorKind::InvalidInput, "not a directory"),
            ));
        }

        Ok(Self { root })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Writes `bytes` to a fresh file for session `id`.
    ///
    /// Never overwrites an existing file. A partially written file is removed
    /// before the error is returned.
    pub fn write(
        &self,
        id: Uuid,
        original_filename: &str,
        bytes: &[u8],
        now: DateTime<Utc>,
    ) -> Result<PathBuf> {
        let path = self.root.join(file_name_for(id, original_filename, now));

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| Error::storage(format!("failed to create {}", path.display()), e))?;

        if let Err(e) = file.write_all(bytes).and_then(|_| file.flush()) {
            drop(file);
            if let Err(cleanup) = fs::remove_file(&path) {
                warn!(path = %path.display(), error = %cleanup, "Failed to remove partial upload");
            }
            return Err(Error::storage(format!("failed to write {}", path.display()), e));
        }

        debug!(path = %path.display(), size = bytes.len(), "Upload written");
        Ok(path)
    }

    /// Lists files in the directory whose names the store generates.
    pub fn managed_files(&self) -> Result<Vec<ManagedFile>> {
        let entries = fs::read_dir(&self.root).map_err(|e| {
            Error::storage(format!("failed to read {}", self.root.display()), e)
        })?;

        let mut files = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let parsed = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(parse_managed_name);
            if let Some((written_at, session_id)) = parsed {
                files.push(ManagedFile {
                    path,
                    session_id,
                    written_at,
                });
            }
        }
        Ok(files)
    }
}

/// Deletes a stored file. Returns `Ok(false)` if it was already gone.
pub fn delete_file(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Builds the stored file name for an upload.
pub fn file_name_for(id: Uuid, original_filename: &str, now: DateTime<Utc>) -> String {
    let timestamp = now.timestamp().max(0);
    match normalize_extension(original_filename) {
        Some(ext) => format!("{}_{}.{}", timestamp, id, ext),
        None => format!("{}_{}", timestamp, id),
    }
}

/// Keeps the final extension if it is short ASCII alphanumeric, lower-cased.
fn normalize_extension(filename: &str) -> Option<String> {
    // Client paths may use either separator.
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let (stem, ext) = base.rsplit_once('.')?;

    if stem.is_empty()
        || ext.is_empty()
        || ext.len() > MAX_EXTENSION_LEN
        || !ext.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return None;
    }

    Some(ext.to_ascii_lowercase())
}

/// Extracts timestamp and session id from a stored file name, if it has the store's shape.
fn parse_managed_name(name: &str) -> Option<(i64, Uuid)> {
    let (timestamp, rest) = name.split_once('_')?;
    if timestamp.is_empty() || !timestamp.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let timestamp = timestamp.parse().ok()?;
    let id = rest.split_once('.').map_or(rest, |(id, _)| id);
    Some((timestamp, Uuid::parse_str(id).ok()?))
}
