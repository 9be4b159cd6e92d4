//! Durable tracking of billable schedule-API calls for the current
//! calendar month.
//!
//! The count survives process restarts: it is read once when the store is
//! constructed and written through after every mutation. Persistence goes
//! through the narrow [`QuotaBackend`] interface; the default
//! [`FileBackend`] keeps the record in a single small JSON file:
//!
//! ```text
//! { "calls": 42, "last_reset": "2026-08-01T14:07:11Z" }
//! ```
//!
//! File writes go through a temp file in the same directory followed by a
//! rename, so a reader never observes a half-written record. Extra fields
//! in the file are ignored on read. Concurrent processes sharing one quota
//! file are not supported and would race.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QuotaError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("quota file {} is corrupt: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// The persisted record: call count plus the timestamp of the last
/// reset or update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaRecord {
    pub calls: u32,
    pub last_reset: DateTime<Utc>,
}

impl QuotaRecord {
    fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            calls: 0,
            last_reset: now,
        }
    }
}

/// Narrow persistence interface for the quota record, so the backing store
/// can be swapped without touching the rate-limiting logic.
pub trait QuotaBackend: Send {
    /// Read the persisted record; `Ok(None)` when none exists yet.
    fn load(&self) -> Result<Option<QuotaRecord>, QuotaError>;
    /// Overwrite the persisted record. A reader must never observe a
    /// half-written state.
    fn save(&self, record: &QuotaRecord) -> Result<(), QuotaError>;
}

/// JSON-file backend for the quota record.
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl QuotaBackend for FileBackend {
    fn load(&self) -> Result<Option<QuotaRecord>, QuotaError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => {
                let record = serde_json::from_str(&raw).map_err(|source| {
                    tracing::error!(
                        "quota file {} is unreadable, refusing to guess a fresh count",
                        self.path.display()
                    );
                    QuotaError::Corrupt {
                        path: self.path.clone(),
                        source,
                    }
                })?;
                Ok(Some(record))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, record: &QuotaRecord) -> Result<(), QuotaError> {
        let encoded = serde_json::to_vec(record).map_err(io::Error::from)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, encoded)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Monthly call counter, write-through persisted via a [`QuotaBackend`].
pub struct QuotaStore {
    backend: Box<dyn QuotaBackend>,
    record: QuotaRecord,
}

impl QuotaStore {
    /// Load from the default JSON-file backend at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, QuotaError> {
        Self::with_backend(Box::new(FileBackend::new(path)))
    }

    /// Load the persisted record, resetting the count when the calendar
    /// month has rolled over since the stored anchor.
    ///
    /// A missing record means zero calls with a fresh anchor. A record
    /// that exists but cannot be read is a configuration error and is
    /// never silently replaced with a zero count. The (possibly reset)
    /// record is persisted back before this returns.
    pub fn with_backend(backend: Box<dyn QuotaBackend>) -> Result<Self, QuotaError> {
        let now = Utc::now();

        let mut record = match backend.load()? {
            Some(record) => record,
            None => {
                tracing::info!("no quota record found, starting at zero calls");
                QuotaRecord::fresh(now)
            }
        };

        let anchor = record.last_reset;
        if (anchor.year(), anchor.month()) != (now.year(), now.month()) {
            tracing::info!(
                "new calendar month (anchor {}), resetting monthly call count from {}",
                anchor.format("%Y-%m"),
                record.calls
            );
            record = QuotaRecord::fresh(now);
        }

        backend.save(&record)?;
        Ok(Self { backend, record })
    }

    /// Record one billable call: bump the count, move the anchor to now,
    /// persist immediately.
    pub fn increment(&mut self) -> Result<(), QuotaError> {
        self.record.calls += 1;
        self.record.last_reset = Utc::now();
        self.backend.save(&self.record)
    }

    /// Calls recorded so far this month.
    pub fn calls(&self) -> u32 {
        self.record.calls
    }

    /// Timestamp of the last reset or update.
    pub fn last_reset(&self) -> DateTime<Utc> {
        self.record.last_reset
    }

    /// Calls left under the given monthly limit.
    pub fn remaining(&self, monthly_limit: u32) -> u32 {
        monthly_limit.saturating_sub(self.record.calls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;

    fn quota_path(dir: &tempfile::TempDir) -> PathBuf {
        dir.path().join("monthly_calls.json")
    }

    #[test]
    fn missing_file_starts_at_zero_and_persists() {
        let dir = tempdir().unwrap();
        let path = quota_path(&dir);

        let store = QuotaStore::load(&path).unwrap();
        assert_eq!(store.calls(), 0);
        // load() writes the fresh record back before returning
        assert!(path.exists());
    }

    #[test]
    fn increment_survives_restart() {
        let dir = tempdir().unwrap();
        let path = quota_path(&dir);

        let mut store = QuotaStore::load(&path).unwrap();
        store.increment().unwrap();
        store.increment().unwrap();
        drop(store);

        let reloaded = QuotaStore::load(&path).unwrap();
        assert_eq!(reloaded.calls(), 2);
    }

    #[test]
    fn stale_month_resets_count() {
        let dir = tempdir().unwrap();
        let path = quota_path(&dir);
        fs::write(
            &path,
            r#"{"calls": 42, "last_reset": "2020-01-15T10:00:00Z"}"#,
        )
        .unwrap();

        let store = QuotaStore::load(&path).unwrap();
        assert_eq!(store.calls(), 0);
        assert_eq!(store.last_reset().year(), Utc::now().year());

        // The reset must be durable, not just in memory.
        let raw = fs::read_to_string(&path).unwrap();
        let record: QuotaRecord = serde_json::from_str(&raw).unwrap();
        assert_eq!(record.calls, 0);
    }

    #[test]
    fn current_month_keeps_count() {
        let dir = tempdir().unwrap();
        let path = quota_path(&dir);
        let record = QuotaRecord {
            calls: 7,
            last_reset: Utc::now(),
        };
        fs::write(&path, serde_json::to_vec(&record).unwrap()).unwrap();

        let store = QuotaStore::load(&path).unwrap();
        assert_eq!(store.calls(), 7);
    }

    #[test]
    fn corrupt_file_is_fatal() {
        let dir = tempdir().unwrap();
        let path = quota_path(&dir);
        fs::write(&path, "{not json").unwrap();

        match QuotaStore::load(&path) {
            Err(QuotaError::Corrupt { .. }) => {}
            other => panic!("expected Corrupt, got {:?}", other.map(|s| s.calls())),
        }
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let dir = tempdir().unwrap();
        let path = quota_path(&dir);
        let raw = format!(
            r#"{{"calls": 3, "last_reset": "{}", "schema_version": 2}}"#,
            Utc::now().to_rfc3339()
        );
        fs::write(&path, raw).unwrap();

        let store = QuotaStore::load(&path).unwrap();
        assert_eq!(store.calls(), 3);
    }

    #[test]
    fn save_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let path = quota_path(&dir);

        let mut store = QuotaStore::load(&path).unwrap();
        store.increment().unwrap();

        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn remaining_saturates_at_zero() {
        let dir = tempdir().unwrap();
        let path = quota_path(&dir);
        let record = QuotaRecord {
            calls: 10,
            last_reset: Utc::now(),
        };
        fs::write(&path, serde_json::to_vec(&record).unwrap()).unwrap();

        let store = QuotaStore::load(&path).unwrap();
        assert_eq!(store.remaining(15), 5);
        assert_eq!(store.remaining(10), 0);
        assert_eq!(store.remaining(5), 0);
    }

    /// Shared-handle in-memory backend, standing in for any non-file store.
    #[derive(Clone, Default)]
    struct MemoryBackend(Arc<Mutex<Option<QuotaRecord>>>);

    impl QuotaBackend for MemoryBackend {
        fn load(&self) -> Result<Option<QuotaRecord>, QuotaError> {
            Ok(self.0.lock().unwrap().clone())
        }

        fn save(&self, record: &QuotaRecord) -> Result<(), QuotaError> {
            *self.0.lock().unwrap() = Some(record.clone());
            Ok(())
        }
    }

    #[test]
    fn backend_is_swappable() {
        let backend = MemoryBackend::default();
        let handle = backend.clone();

        let mut store = QuotaStore::with_backend(Box::new(backend)).unwrap();
        store.increment().unwrap();
        store.increment().unwrap();
        store.increment().unwrap();

        assert_eq!(handle.0.lock().unwrap().as_ref().unwrap().calls, 3);
    }
}
