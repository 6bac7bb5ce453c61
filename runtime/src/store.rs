//! Append-only JSON logs of rating records.
//!
//! Each log is a single JSON array rewritten in full on every append. Writes
//! go through a temp file in the same directory and an atomic rename, so a
//! reader never sees a half-written array. A sidecar `.<file>.lock` is held
//! exclusively for the whole read-modify-write so concurrent invocations
//! cannot drop each other's records.

use crate::error::{Result, TrackerError};
use crate::model::RatingRecord;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// A directory of segment logs.
#[derive(Debug, Clone)]
pub struct LogStore {
    dir: PathBuf,
}

impl LogStore {
    /// Logs are resolved relative to `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_of(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    /// Append one record to one log, creating the log if it is absent.
    pub fn append(&self, file: &str, record: &RatingRecord) -> Result<()> {
        self.append_all(&[(file, record)])
    }

    /// Append several records as one unit.
    ///
    /// Every target log is locked and its new contents staged before any log
    /// is replaced; if reading, decoding, or staging fails for any of them,
    /// none of the logs change. Records for the same file keep their order.
    pub fn append_all(&self, entries: &[(&str, &RatingRecord)]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        std::fs::create_dir_all(&self.dir).map_err(|e| TrackerError::io(&self.dir, e))?;

        // BTreeMap gives a stable lock order across processes.
        let mut grouped: BTreeMap<PathBuf, Vec<&RatingRecord>> = BTreeMap::new();
        for (file, record) in entries {
            grouped.entry(self.path_of(file)).or_default().push(record);
        }

        let _locks = grouped
            .keys()
            .map(|path| LogLock::acquire(path))
            .collect::<Result<Vec<_>>>()?;

        let mut staged = Vec::with_capacity(grouped.len());
        for (path, records) in &grouped {
            let mut values = read_values(path)?;
            for record in records {
                values.push(serde_json::to_value(record)?);
            }
            staged.push((self.stage(path, &values)?, path, values.len()));
        }

        for (tmp, path, len) in staged {
            tmp.persist(path)
                .map_err(|e| TrackerError::io(path.as_path(), e.error))?;
            debug!(path = %path.display(), records = len, "log updated");
        }
        Ok(())
    }

    /// Read every record of a log. A missing log is empty.
    pub fn load(&self, file: &str) -> Result<Vec<RatingRecord>> {
        let path = self.path_of(file);
        match std::fs::read_to_string(&path) {
            Ok(text) => {
                serde_json::from_str(&text).map_err(|e| TrackerError::Decode { path, source: e })
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(TrackerError::io(path, e)),
        }
    }

    /// Read a log, keeping every entry that decodes as a record.
    ///
    /// Appends preserve foreign entries (hand edits, other tools), so readers
    /// that only want the records use this instead of failing on them.
    pub fn scan(&self, file: &str) -> Result<LogScan> {
        let path = self.path_of(file);
        let mut scan = LogScan::default();
        for value in read_values(&path)? {
            match serde_json::from_value(value) {
                Ok(record) => scan.records.push(record),
                Err(_) => scan.skipped += 1,
            }
        }
        Ok(scan)
    }

    fn stage(&self, path: &Path, values: &[Value]) -> Result<NamedTempFile> {
        let tmp = NamedTempFile::new_in(&self.dir).map_err(|e| TrackerError::io(&self.dir, e))?;
        let mut writer = BufWriter::new(tmp.as_file());
        serde_json::to_writer(&mut writer, values)?;
        writer.flush().map_err(|e| TrackerError::io(path, e))?;
        drop(writer);
        tmp.as_file()
            .sync_all()
            .map_err(|e| TrackerError::io(path, e))?;
        Ok(tmp)
    }
}

/// Records read by [`LogStore::scan`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogScan {
    pub records: Vec<RatingRecord>,
    /// Entries that are not rating records.
    pub skipped: usize,
}

/// Existing array elements, kept as raw JSON so they are rewritten unchanged.
fn read_values(path: &Path) -> Result<Vec<Value>> {
    match std::fs::read_to_string(path) {
        Ok(text) => serde_json::from_str(&text).map_err(|e| TrackerError::Decode {
            path: path.to_path_buf(),
            source: e,
        }),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(TrackerError::io(path, e)),
    }
}

/// Exclusive advisory lock on a log's sidecar lock file, released on drop.
struct LogLock {
    file: File,
}

impl LogLock {
    fn acquire(log_path: &Path) -> Result<Self> {
        let path = lock_path(log_path);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| TrackerError::Lock {
                path: path.clone(),
                source: e,
            })?;
        file.lock().map_err(|e| TrackerError::Lock { path, source: e })?;
        Ok(Self { file })
    }
}

impl Drop for LogLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

/// `dir/critics.json` → `dir/.critics.json.lock`.
fn lock_path(log_path: &Path) -> PathBuf {
    let name = format!(
        ".{}.lock",
        log_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("log")
    );
    log_path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_json_diff::assert_json_eq;
    use serde_json::json;
    use tempfile::TempDir;

    fn record(ts: &str, value: i64) -> RatingRecord {
        RatingRecord {
            timestamp: ts.to_string(),
            average_rating: 7.5,
            liked_count: 120,
            not_liked_count: 30,
            rating_count: 150,
            review_count: 45,
            value,
        }
    }

    fn read_json(path: &Path) -> Value {
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn test_append_creates_single_element_log() {
        let dir = TempDir::new().unwrap();
        let store = LogStore::new(dir.path());
        let r = record("2023-11-10T12:00:00", 80);

        store.append("critics.json", &r).unwrap();

        assert_eq!(store.load("critics.json").unwrap(), vec![r]);
        assert!(read_json(&dir.path().join("critics.json")).is_array());
    }

    #[test]
    fn test_appends_keep_call_order() {
        let dir = TempDir::new().unwrap();
        let store = LogStore::new(dir.path());
        let records: Vec<_> = (0..5)
            .map(|i| record(&format!("2023-11-10T12:00:0{i}"), 80 + i))
            .collect();

        for (i, r) in records.iter().enumerate() {
            store.append("audience.json", r).unwrap();
            let loaded = store.load("audience.json").unwrap();
            assert_eq!(loaded.len(), i + 1);
            assert_eq!(&loaded[..], &records[..=i]);
        }
    }

    #[test]
    fn test_append_keeps_existing_entry_unchanged() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("critics.json");
        let existing = json!([{
            "timestamp": "2023-11-10T12:00:00",
            "average_rating": 7.5,
            "liked_count": 120,
            "not_liked_count": 30,
            "rating_count": 150,
            "review_count": 45,
            "value": 80
        }]);
        std::fs::write(&path, existing.to_string()).unwrap();

        let store = LogStore::new(dir.path());
        store
            .append("critics.json", &record("2023-11-11T12:00:00", 82))
            .unwrap();

        let after = read_json(&path);
        let arr = after.as_array().unwrap();
        assert_eq!(arr.len(), 2);
        assert_json_eq!(arr[0], existing[0]);
        assert_eq!(arr[1]["value"], json!(82));
        assert_eq!(arr[1]["timestamp"], json!("2023-11-11T12:00:00"));
    }

    #[test]
    fn test_file_keys_follow_record_field_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("critics.json");
        std::fs::write(&path, r#"[{"value":80,"timestamp":"2023-11-09T12:00:00"}]"#).unwrap();

        LogStore::new(dir.path())
            .append("critics.json", &record("2023-11-10T12:00:00", 82))
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            concat!(
                r#"[{"value":80,"timestamp":"2023-11-09T12:00:00"},"#,
                r#"{"timestamp":"2023-11-10T12:00:00","average_rating":7.5,"liked_count":120,"#,
                r#""not_liked_count":30,"rating_count":150,"review_count":45,"value":82}]"#
            )
        );
    }

    #[test]
    fn test_scan_skips_foreign_entries() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("critics.json");
        std::fs::write(&path, r#"[{"value": 80, "note": "hand-edited"}]"#).unwrap();
        let store = LogStore::new(dir.path());
        let r = record("2023-11-11T12:00:00", 82);
        store.append("critics.json", &r).unwrap();

        assert!(matches!(
            store.load("critics.json"),
            Err(TrackerError::Decode { .. })
        ));
        assert_eq!(
            store.scan("critics.json").unwrap(),
            LogScan {
                records: vec![r],
                skipped: 1
            }
        );
    }

    #[test]
    fn test_scan_missing_log_is_empty() {
        let dir = TempDir::new().unwrap();
        assert_eq!(
            LogStore::new(dir.path()).scan("nope.json").unwrap(),
            LogScan::default()
        );
    }

    #[test]
    fn test_append_preserves_foreign_fields() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("critics.json");
        std::fs::write(&path, r#"[{"value": 80, "note": "hand-edited"}]"#).unwrap();

        LogStore::new(dir.path())
            .append("critics.json", &record("2023-11-11T12:00:00", 82))
            .unwrap();

        assert_json_eq!(read_json(&path)[0], json!({"value": 80, "note": "hand-edited"}));
    }

    #[test]
    fn test_malformed_log_is_decode_error_and_left_alone() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("critics.json");
        std::fs::write(&path, "[{\"value\": 80,").unwrap();

        let err = LogStore::new(dir.path())
            .append("critics.json", &record("2023-11-11T12:00:00", 82))
            .unwrap_err();

        assert!(matches!(err, TrackerError::Decode { .. }));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[{\"value\": 80,");
    }

    #[test]
    fn test_non_array_log_is_decode_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("critics.json"), r#"{"value": 80}"#).unwrap();
        let err = LogStore::new(dir.path())
            .append("critics.json", &record("2023-11-11T12:00:00", 82))
            .unwrap_err();
        assert!(matches!(err, TrackerError::Decode { .. }));
    }

    #[test]
    fn test_append_all_is_all_or_nothing() {
        let dir = TempDir::new().unwrap();
        let store = LogStore::new(dir.path());
        let first = record("2023-11-10T12:00:00", 80);
        store.append("critics.json", &first).unwrap();
        std::fs::write(dir.path().join("audience.json"), "garbage").unwrap();

        let next = record("2023-11-11T12:00:00", 82);
        let err = store
            .append_all(&[("critics.json", &next), ("audience.json", &next)])
            .unwrap_err();

        assert!(matches!(err, TrackerError::Decode { .. }));
        assert_eq!(store.load("critics.json").unwrap(), vec![first]);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("audience.json")).unwrap(),
            "garbage"
        );
    }

    #[test]
    fn test_append_all_writes_every_log() {
        let dir = TempDir::new().unwrap();
        let store = LogStore::new(dir.path().join("nested"));
        let critics = record("2023-11-10T12:00:00", 80);
        let audience = record("2023-11-10T12:00:00", 62);

        store
            .append_all(&[("critics.json", &critics), ("audience.json", &audience)])
            .unwrap();

        assert_eq!(store.load("critics.json").unwrap(), vec![critics]);
        assert_eq!(store.load("audience.json").unwrap(), vec![audience]);
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let dir = TempDir::new().unwrap();
        let store = LogStore::new(dir.path());
        store
            .append("critics.json", &record("2023-11-10T12:00:00", 80))
            .unwrap();

        let mut names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec![".critics.json.lock", "critics.json"]);
    }

    #[test]
    fn test_concurrent_appends_lose_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        std::thread::scope(|scope| {
            for t in 0..4 {
                let path = path.clone();
                scope.spawn(move || {
                    // Separate stores mimic separate processes.
                    let store = LogStore::new(path);
                    for i in 0..10 {
                        store
                            .append("critics.json", &record("2023-11-10T12:00:00", t * 100 + i))
                            .unwrap();
                    }
                });
            }
        });

        let mut values: Vec<i64> = LogStore::new(&path)
            .load("critics.json")
            .unwrap()
            .into_iter()
            .map(|r| r.value)
            .collect();
        assert_eq!(values.len(), 40);
        values.sort();
        values.dedup();
        assert_eq!(values.len(), 40);
    }

    #[test]
    fn test_load_missing_log_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(LogStore::new(dir.path()).load("nope.json").unwrap().is_empty());
    }

    #[test]
    fn test_lock_path() {
        assert_eq!(
            lock_path(Path::new("/data/critics.json")),
            PathBuf::from("/data/.critics.json.lock")
        );
    }
}
