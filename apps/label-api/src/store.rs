//! Uploaded spreadsheet store
//!
//! Files live on disk under one directory; an in-memory index records when
//! each arrived. Entries older than the retention window are invisible to
//! readers and removed by [`UploadStore::sweep`].

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid file name: {0}")]
    InvalidName(String),

    #[error("Storage error: {0}")]
    Io(String),
}

/// Listing entry for one upload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredFile {
    pub filename: String,
    pub size: u64,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    size: u64,
    uploaded_at: DateTime<Utc>,
}

pub struct UploadStore {
    dir: PathBuf,
    retention: Duration,
    clock: Arc<dyn Clock>,
    index: Mutex<HashMap<String, Entry>>,
}

impl UploadStore {
    /// Open (and create) the upload directory.
    ///
    /// Files already present are adopted as if uploaded now.
    pub fn open(dir: impl Into<PathBuf>, retention: Duration, clock: Arc<dyn Clock>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let now = clock.now();
        let mut index = HashMap::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let metadata = entry.metadata()?;
            let name = entry.file_name().to_string_lossy().to_string();
            if metadata.is_file() && label_sheet::is_supported_file(&name) {
                index.insert(
                    name,
                    Entry {
                        size: metadata.len(),
                        uploaded_at: now,
                    },
                );
            }
        }
        if !index.is_empty() {
            tracing::info!("Adopted {} existing uploads in {}", index.len(), dir.display());
        }

        Ok(Self {
            dir,
            retention,
            clock,
            index: Mutex::new(index),
        })
    }

    fn index(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.index.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn is_expired(&self, entry: &Entry, now: DateTime<Utc>) -> bool {
        now - entry.uploaded_at > self.retention
    }

    /// Store `bytes` under the base name of `filename`, replacing any
    /// earlier upload with the same name
    pub fn save(&self, filename: &str, bytes: &[u8]) -> Result<StoredFile, StoreError> {
        let name = sanitize(filename)?;
        let path = self.dir.join(&name);
        fs::write(&path, bytes).map_err(|e| StoreError::Io(e.to_string()))?;

        let entry = Entry {
            size: bytes.len() as u64,
            uploaded_at: self.clock.now(),
        };
        self.index().insert(name.clone(), entry);
        tracing::info!("Stored upload {} ({} bytes)", name, entry.size);
        Ok(StoredFile {
            filename: name,
            size: entry.size,
            uploaded_at: entry.uploaded_at,
        })
    }

    /// Path of a live upload.
    ///
    /// The file may still disappear before the caller opens it; readers
    /// treat a missing file as [`StoreError::NotFound`] too.
    pub fn path_for(&self, filename: &str) -> Result<PathBuf, StoreError> {
        let name = sanitize(filename)?;
        let now = self.clock.now();
        let index = self.index();
        match index.get(&name) {
            Some(entry) if !self.is_expired(entry, now) => Ok(self.dir.join(&name)),
            _ => Err(StoreError::NotFound(name)),
        }
    }

    /// Live uploads, newest first
    pub fn list(&self) -> Vec<StoredFile> {
        let now = self.clock.now();
        let mut files: Vec<StoredFile> = self
            .index()
            .iter()
            .filter(|(_, entry)| !self.is_expired(entry, now))
            .map(|(name, entry)| StoredFile {
                filename: name.clone(),
                size: entry.size,
                uploaded_at: entry.uploaded_at,
            })
            .collect();
        files.sort_by(|a, b| {
            b.uploaded_at
                .cmp(&a.uploaded_at)
                .then_with(|| a.filename.cmp(&b.filename))
        });
        files
    }

    /// Delete expired uploads; returns how many were removed
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let expired: Vec<String> = {
            let mut index = self.index();
            let expired: Vec<String> = index
                .iter()
                .filter(|(_, entry)| self.is_expired(entry, now))
                .map(|(name, _)| name.clone())
                .collect();
            for name in &expired {
                index.remove(name);
            }
            expired
        };

        for name in &expired {
            match fs::remove_file(self.dir.join(name)) {
                Ok(()) => tracing::debug!("Swept expired upload {}", name),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!("Failed to remove expired upload {}: {}", name, e),
            }
        }
        expired.len()
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Keep only the final path component so uploads cannot escape the store
fn sanitize(filename: &str) -> Result<String, StoreError> {
    Path::new(filename.trim())
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty() && *n != "." && *n != "..")
        .map(str::to_string)
        .ok_or_else(|| StoreError::InvalidName(filename.to_string()))
}
