use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use tracing::{debug, error, info, info_span, warn, Span};

use crate::adapters::store::csv::{self, SkippedRow};
use crate::adapters::RollingHistory;
use crate::domain::ThroughputSample;
use crate::error::SessionError;
use crate::ports::MetricStore;

/// Suffix of the file a session is written to before it replaces the target
const PARTIAL_SUFFIX: &str = ".tmp";

/// Whether the storage directory could be prepared at construction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "lowercase")]
pub enum StorageStatus {
    Ready,
    /// Recording continues in memory; saving will fail
    Unavailable(String),
}

/// Outcome of loading a session file
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub path: PathBuf,
    /// Samples now held in the history
    pub loaded: usize,
    pub skipped: Vec<SkippedRow>,
}

/// Rolling history of one monitoring session plus its CSV persistence.
///
/// Every read or mutation of the history goes through one mutex, so the
/// sampling task and request handlers can share a store behind an `Arc`.
pub struct SessionStore {
    history: Mutex<RollingHistory>,
    session_start: NaiveDateTime,
    storage_dir: PathBuf,
    storage_status: StorageStatus,
    span: Span,
}

impl SessionStore {
    pub fn new(capacity: usize, storage_dir: impl Into<PathBuf>) -> Self {
        let storage_dir = storage_dir.into();
        let span = info_span!("session_store", dir = %storage_dir.display());
        let storage_status = span.in_scope(|| prepare_storage_dir(&storage_dir));

        Self {
            history: Mutex::new(RollingHistory::new(capacity)),
            session_start: Local::now().naive_local(),
            storage_dir,
            storage_status,
            span,
        }
    }

    /// Override the instant used to name auto-saved sessions
    pub fn with_session_start(mut self, session_start: NaiveDateTime) -> Self {
        self.session_start = session_start;
        self
    }

    /// Log under `span` instead of the default `session_store` span
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    pub fn storage_status(&self) -> &StorageStatus {
        &self.storage_status
    }

    pub fn session_start(&self) -> NaiveDateTime {
        self.session_start
    }

    /// File name `save(None)` writes to
    pub fn default_filename(&self) -> String {
        csv::session_filename(self.session_start)
    }

    fn lock(&self) -> MutexGuard<'_, RollingHistory> {
        // Ring buffer stays consistent across a panic in another holder
        self.history.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append a sample, evicting the oldest when full
    pub fn record(&self, sample: ThroughputSample) {
        self.lock().store(sample);
    }

    /// Copy of the history, oldest first
    pub fn history(&self) -> Vec<ThroughputSample> {
        self.lock().snapshot()
    }

    pub fn latest(&self) -> Option<ThroughputSample> {
        self.lock().latest()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity()
    }

    pub fn clear(&self) {
        self.lock().clear();
        self.span.in_scope(|| info!("Historical data cleared"));
    }

    /// Write the history to `filename` (or the default session name) in the
    /// storage directory and return the path written.
    pub fn save(&self, filename: Option<&str>) -> Result<PathBuf, SessionError> {
        let _enter = self.span.enter();

        let filename = match filename {
            Some(name) => validate_filename(name)?.to_string(),
            None => self.default_filename(),
        };
        let path = self.storage_dir.join(&filename);
        let partial = self.storage_dir.join(format!("{}{}", filename, PARTIAL_SUFFIX));
        let samples = self.history();

        // An existing file with the same name survives a failed write
        let written = File::create(&partial)
            .and_then(|file| csv::write_session(BufWriter::new(file), &samples))
            .and_then(|()| fs::rename(&partial, &path));
        if let Err(e) = written {
            error!("Failed to save session data to {}: {}", path.display(), e);
            if let Err(cleanup) = fs::remove_file(&partial) {
                debug!("No partial file removed at {}: {}", partial.display(), cleanup);
            }
            return Err(SessionError::persistence(&path, e));
        }

        info!("Session data saved to {} ({} samples)", path.display(), samples.len());
        Ok(path)
    }

    /// Replace the history with the contents of `filename`.
    ///
    /// Malformed rows are skipped and reported; the history is only touched
    /// once the whole file has been read.
    pub fn load(&self, filename: &str) -> Result<LoadReport, SessionError> {
        let _enter = self.span.enter();

        let path = self.storage_dir.join(validate_filename(filename)?);
        let file = File::open(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => {
                error!("File not found: {}", path.display());
                SessionError::NotFound(path.clone())
            }
            _ => SessionError::persistence(&path, e),
        })?;

        let decoded = csv::read_session(BufReader::new(file)).map_err(|e| {
            error!("Failed to load data from {}: {}", path.display(), e);
            SessionError::persistence(&path, e)
        })?;

        for row in &decoded.skipped {
            warn!("Skipping malformed row {} in {}: {}", row.line, path.display(), row.reason);
        }

        let loaded = {
            let mut history = self.lock();
            history.replace(decoded.samples);
            history.len()
        };

        info!("Loaded {} data points from {}", loaded, path.display());
        Ok(LoadReport {
            path,
            loaded,
            skipped: decoded.skipped,
        })
    }

    /// Session files in the storage directory, oldest first
    pub fn list_sessions(&self) -> Result<Vec<String>, SessionError> {
        let entries = match fs::read_dir(&self.storage_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(SessionError::persistence(&self.storage_dir, e)),
        };

        let mut sessions = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| SessionError::persistence(&self.storage_dir, e))?;
            let name = entry.file_name().to_string_lossy().to_string();
            if csv::is_session_filename(&name) && entry.path().is_file() {
                sessions.push(name);
            }
        }

        sessions.sort();
        Ok(sessions)
    }

    /// Remove a session file and return its path
    pub fn delete_session(&self, filename: &str) -> Result<PathBuf, SessionError> {
        let _enter = self.span.enter();

        let path = self.storage_dir.join(validate_filename(filename)?);
        match fs::remove_file(&path) {
            Ok(()) => {
                info!("Deleted session file: {}", path.display());
                Ok(path)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                error!("File not found: {}", path.display());
                Err(SessionError::NotFound(path))
            }
            Err(e) => {
                error!("Failed to delete session file {}: {}", path.display(), e);
                Err(SessionError::persistence(path, e))
            }
        }
    }
}

fn prepare_storage_dir(dir: &Path) -> StorageStatus {
    if dir.is_dir() {
        return StorageStatus::Ready;
    }

    match fs::create_dir_all(dir) {
        Ok(()) => {
            info!("Created data directory: {}", dir.display());
            StorageStatus::Ready
        }
        Err(e) => {
            error!("Failed to create data directory {}: {}", dir.display(), e);
            StorageStatus::Unavailable(e.to_string())
        }
    }
}

/// Session file names must be a single, plain path component
fn validate_filename(name: &str) -> Result<&str, SessionError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);

    if invalid {
        return Err(SessionError::InvalidName(name.to_string()));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn base_time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn sample(i: i64) -> ThroughputSample {
        ThroughputSample::new(
            base_time() + Duration::seconds(i),
            i as f64 * 0.25,
            i as f64 * 0.5,
        )
    }

    fn store(dir: &Path, capacity: usize) -> SessionStore {
        SessionStore::new(capacity, dir).with_session_start(base_time())
    }

    #[test]
    fn test_creates_missing_storage_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested/data");

        let store = store(&dir, 60);
        assert_eq!(store.storage_status(), &StorageStatus::Ready);
        assert!(dir.is_dir());
    }

    #[test]
    fn test_unavailable_storage_is_soft_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("not_a_dir");
        fs::write(&blocker, "x").unwrap();

        let store = store(&blocker.join("data"), 60);
        assert!(matches!(store.storage_status(), StorageStatus::Unavailable(_)));

        store.record(sample(1));
        assert_eq!(store.len(), 1);
        assert!(matches!(store.save(None), Err(SessionError::Persistence { .. })));
    }

    #[test]
    fn test_injected_span() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path(), 2).with_span(tracing::info_span!("gui_session"));
        assert_eq!(store.storage_dir(), tmp.path());

        store.record(sample(1));
        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn test_record_evicts_oldest() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path(), 3);

        for i in 0..5 {
            store.record(sample(i));
        }
        assert_eq!(store.history(), vec![sample(2), sample(3), sample(4)]);
        assert_eq!(store.latest(), Some(sample(4)));
    }

    #[test]
    fn test_clear_twice() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path(), 60);
        store.record(sample(1));

        store.clear();
        assert!(store.history().is_empty());
        store.clear();
        assert!(store.history().is_empty());
    }

    #[test]
    fn test_save_clear_load_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path(), 60);
        let original: Vec<_> = (0..10).map(sample).collect();
        for s in &original {
            store.record(*s);
        }

        let path = store.save(None).unwrap();
        assert_eq!(path, tmp.path().join("wifi_session_20240101_120000.csv"));

        store.clear();
        let report = store.load("wifi_session_20240101_120000.csv").unwrap();
        assert_eq!(report.loaded, 10);
        assert!(report.skipped.is_empty());
        assert_eq!(store.history(), original);
    }

    #[test]
    fn test_save_truncates_to_second_and_two_decimals() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path(), 60);
        let precise = base_time() + Duration::milliseconds(750);
        store.record(ThroughputSample::new(precise, 1.23456, 0.004));

        store.save(Some("precise.csv")).unwrap();
        let content = fs::read_to_string(tmp.path().join("precise.csv")).unwrap();
        assert_eq!(
            content,
            "Timestamp,Upload Speed (MB/s),Download Speed (MB/s)\n2024-01-01 12:00:00,1.23,0.00\n"
        );

        store.load("precise.csv").unwrap();
        assert_eq!(store.history(), vec![ThroughputSample::new(base_time(), 1.23, 0.0)]);
    }

    #[test]
    fn test_save_empty_history_writes_header() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path(), 60);

        let path = store.save(Some("empty.csv")).unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), format!("{}\n", csv::HEADER));

        store.record(sample(1));
        let report = store.load("empty.csv").unwrap();
        assert_eq!(report.loaded, 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_load_missing_file_keeps_history() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path(), 60);
        store.record(sample(1));
        store.record(sample(2));

        assert!(matches!(store.load("missing.csv"), Err(SessionError::NotFound(_))));
        assert_eq!(store.history(), vec![sample(1), sample(2)]);
    }

    #[test]
    fn test_load_skips_malformed_row() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(
            tmp.path().join("partial.csv"),
            "Timestamp,Upload Speed (MB/s),Download Speed (MB/s)\n\
             2024-01-01 12:00:00,0.10,0.20\n\
             bad,row\n\
             2024-01-01 12:00:01,0.20,0.40\n\
             2024-01-01 12:00:02,0.30,0.60\n",
        )
        .unwrap();

        let store = store(tmp.path(), 60);
        store.record(sample(42));

        let report = store.load("partial.csv").unwrap();
        assert_eq!(report.loaded, 3);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].line, 3);
        assert_eq!(store.history().len(), 3);
        assert!(!store.history().contains(&sample(42)));
    }

    #[test]
    fn test_load_skips_row_with_invalid_utf8() {
        let tmp = tempfile::tempdir().unwrap();
        let mut content = b"Timestamp,Upload Speed (MB/s),Download Speed (MB/s)\n\
                            2024-01-01 12:00:00,0.10,0.20\n\
                            2024-01-01 12:00:01,0.20,0.40\n\
                            2024-01-01 12:00:02,0.30,0.60\n"
            .to_vec();
        content.extend_from_slice(b"\xff\xfe,bad,row\n");
        fs::write(tmp.path().join("garbled.csv"), content).unwrap();

        let store = store(tmp.path(), 60);
        let report = store.load("garbled.csv").unwrap();
        assert_eq!(report.loaded, 3);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].line, 5);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_load_keeps_newest_when_file_exceeds_capacity() {
        let tmp = tempfile::tempdir().unwrap();
        let big = store(tmp.path(), 60);
        for i in 0..10 {
            big.record(sample(i));
        }
        big.save(Some("big.csv")).unwrap();

        let small = store(tmp.path(), 4);
        let report = small.load("big.csv").unwrap();
        assert_eq!(report.loaded, 4);
        assert_eq!(small.history(), (6..10).map(sample).collect::<Vec<_>>());
    }

    #[test]
    fn test_load_directory_is_persistence_error() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir(tmp.path().join("folder.csv")).unwrap();
        let store = store(tmp.path(), 60);
        store.record(sample(1));

        assert!(matches!(store.load("folder.csv"), Err(SessionError::Persistence { .. })));
        assert_eq!(store.history(), vec![sample(1)]);
    }

    #[test]
    fn test_failed_save_keeps_previous_file() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path(), 60);
        store.record(sample(1));
        let path = store.save(None).unwrap();
        let before = fs::read_to_string(&path).unwrap();

        // A directory in the way of the partial file makes the write fail
        let partial = tmp.path().join(format!("{}{}", store.default_filename(), PARTIAL_SUFFIX));
        fs::create_dir(&partial).unwrap();
        store.record(sample(2));
        assert!(matches!(store.save(None), Err(SessionError::Persistence { .. })));
        assert_eq!(fs::read_to_string(&path).unwrap(), before);

        fs::remove_dir(&partial).unwrap();
        store.save(None).unwrap();
        assert!(!partial.exists());
        assert_ne!(fs::read_to_string(&path).unwrap(), before);
        assert_eq!(store.list_sessions().unwrap(), vec![store.default_filename()]);
    }

    #[test]
    fn test_concurrent_access_keeps_history_consistent() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path(), 8);
        for i in 0..5 {
            store.record(sample(i));
        }
        store.save(Some("seed.csv")).unwrap();

        let assert_consistent = |history: &[ThroughputSample]| {
            assert!(history.len() <= 8, "{} samples", history.len());
            assert!(
                history.windows(2).all(|w| w[0].timestamp < w[1].timestamp),
                "out of order: {history:?}"
            );
        };

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for i in 1000..3000 {
                    store.record(sample(i));
                }
            });
            scope.spawn(|| {
                for _ in 0..50 {
                    store.save(Some("snapshot.csv")).unwrap();
                }
            });
            scope.spawn(|| {
                for _ in 0..50 {
                    store.load("seed.csv").unwrap();
                }
            });
            scope.spawn(|| {
                for _ in 0..200 {
                    store.clear();
                }
            });
            for _ in 0..2 {
                scope.spawn(|| {
                    for _ in 0..500 {
                        assert_consistent(&store.history());
                    }
                });
            }
        });

        assert_consistent(&store.history());
        let saved = csv::read_session(BufReader::new(File::open(tmp.path().join("snapshot.csv")).unwrap())).unwrap();
        assert!(saved.skipped.is_empty());
        assert_consistent(&saved.samples);
    }

    #[test]
    fn test_list_sessions_chronological() {
        let tmp = tempfile::tempdir().unwrap();
        let starts = [
            base_time() + Duration::days(1),
            base_time(),
            base_time() + Duration::hours(3),
        ];
        for start in starts {
            let store = SessionStore::new(60, tmp.path()).with_session_start(start);
            store.record(sample(0));
            store.save(None).unwrap();
        }
        fs::write(tmp.path().join("notes.txt"), "ignored").unwrap();
        fs::write(tmp.path().join("other.csv"), "ignored").unwrap();

        let store = store(tmp.path(), 60);
        assert_eq!(
            store.list_sessions().unwrap(),
            vec![
                "wifi_session_20240101_120000.csv",
                "wifi_session_20240101_150000.csv",
                "wifi_session_20240102_120000.csv",
            ]
        );
    }

    #[test]
    fn test_list_sessions_without_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path(), 60);
        fs::remove_dir(tmp.path()).unwrap();

        assert!(store.list_sessions().unwrap().is_empty());
    }

    #[test]
    fn test_delete_session_twice() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path(), 60);
        let path = store.save(None).unwrap();
        assert!(path.exists());

        let name = store.default_filename();
        assert_eq!(store.delete_session(&name).unwrap(), path);
        assert!(!path.exists());
        assert!(matches!(store.delete_session(&name), Err(SessionError::NotFound(_))));
        assert!(matches!(store.delete_session(&name), Err(SessionError::NotFound(_))));
    }

    #[test]
    fn test_rejects_path_traversal() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(&tmp.path().join("data"), 60);

        for name in ["", ".", "..", "../escape.csv", "a/b.csv", "a\\b.csv"] {
            assert!(matches!(store.save(Some(name)), Err(SessionError::InvalidName(_))), "{name:?}");
            assert!(matches!(store.load(name), Err(SessionError::InvalidName(_))), "{name:?}");
            assert!(matches!(store.delete_session(name), Err(SessionError::InvalidName(_))), "{name:?}");
        }
        assert!(!tmp.path().join("escape.csv").exists());
    }
}
