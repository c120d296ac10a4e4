//! Daily API call counter persisted as a small JSON file.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const DEFAULT_USAGE_FILE: &str = "api_usage.json";

#[derive(Debug, thiserror::Error)]
pub enum UsageError {
    #[error("failed to serialize usage record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write usage file {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
}

/// Number of external calls made on `date`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub date: NaiveDate,
    pub count: u32,
}

impl UsageRecord {
    pub fn fresh(date: NaiveDate) -> Self {
        Self { date, count: 0 }
    }

    pub fn remaining(&self, quota: u32) -> u32 {
        quota.saturating_sub(self.count)
    }

    pub fn is_exhausted(&self, quota: u32) -> bool {
        self.count >= quota
    }

    pub fn record_call(&mut self) {
        self.count = self.count.saturating_add(1);
    }
}

/// Where the record returned by [`UsageStore::load_report`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    /// Stored record for today, count carried over.
    Stored,
    /// Stored record from an earlier day; count reset to zero.
    NewDay,
    /// No usage file yet.
    Missing,
    /// File present but unreadable or corrupt; fresh record substituted.
    Unreadable,
}

#[derive(Debug, Clone)]
pub struct LoadReport {
    pub record: UsageRecord,
    pub source: LoadSource,
}

type Clock = Box<dyn Fn() -> NaiveDate + Send + Sync>;

/// Sole reader/writer of the usage file.
///
/// No locking: two processes sharing one file race and the last writer wins.
pub struct UsageStore {
    path: PathBuf,
    today: Clock,
}

impl std::fmt::Debug for UsageStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsageStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl UsageStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_clock(path, || Local::now().date_naive())
    }

    pub fn with_clock(
        path: impl Into<PathBuf>,
        today: impl Fn() -> NaiveDate + Send + Sync + 'static,
    ) -> Self {
        Self {
            path: path.into(),
            today: Box::new(today),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn today(&self) -> NaiveDate {
        (self.today)()
    }

    /// Today's usage. Never fails: missing or corrupt storage yields a zero count.
    pub fn load(&self) -> UsageRecord {
        self.load_report().record
    }

    pub fn load_report(&self) -> LoadReport {
        let today = self.today();

        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "usage file not found, starting fresh");
                return LoadReport {
                    record: UsageRecord::fresh(today),
                    source: LoadSource::Missing,
                };
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "usage file unreadable, starting fresh"
                );
                return LoadReport {
                    record: UsageRecord::fresh(today),
                    source: LoadSource::Unreadable,
                };
            }
        };

        match serde_json::from_str::<UsageRecord>(&text) {
            Ok(stored) if stored.date == today => LoadReport {
                record: stored,
                source: LoadSource::Stored,
            },
            Ok(stored) => {
                debug!(
                    stored = %stored.date,
                    %today,
                    "usage record is from an earlier day, resetting"
                );
                LoadReport {
                    record: UsageRecord::fresh(today),
                    source: LoadSource::NewDay,
                }
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "usage file corrupt, starting fresh"
                );
                LoadReport {
                    record: UsageRecord::fresh(today),
                    source: LoadSource::Unreadable,
                }
            }
        }
    }

    /// Replace the usage file with `record`.
    ///
    /// Writes a sibling temp file and renames it over the target so readers
    /// never observe a partial write.
    pub fn save(&self, record: &UsageRecord) -> Result<(), UsageError> {
        let json = serde_json::to_string(record)?;
        self.write_atomic(json.as_bytes())
            .map_err(|source| UsageError::Write {
                path: self.path.clone(),
                source,
            })?;
        debug!(date = %record.date, count = record.count, "usage saved");
        Ok(())
    }

    /// Zero today's counter and persist it.
    pub fn reset(&self) -> Result<UsageRecord, UsageError> {
        let record = UsageRecord::fresh(self.today());
        self.save(&record)?;
        Ok(record)
    }

    fn write_atomic(&self, bytes: &[u8]) -> io::Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let temp_path = temp_path_for(&self.path);
        let _ = fs::remove_file(&temp_path);

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, &self.path).inspect_err(|_| {
            let _ = fs::remove_file(&temp_path);
        })
    }
}

fn temp_path_for(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(DEFAULT_USAGE_FILE);
    target.with_file_name(format!(".{name}.{}.tmp", std::process::id()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn store_on(dir: &TempDir, today: NaiveDate) -> UsageStore {
        UsageStore::with_clock(dir.path().join(DEFAULT_USAGE_FILE), move || today)
    }

    #[test]
    fn missing_file_yields_fresh_record() {
        let dir = TempDir::new().unwrap();
        let store = store_on(&dir, day(2024, 5, 1));

        let report = store.load_report();
        assert_eq!(report.record, UsageRecord::fresh(day(2024, 5, 1)));
        assert_eq!(report.source, LoadSource::Missing);
    }

    #[test]
    fn same_day_keeps_count() {
        let dir = TempDir::new().unwrap();
        let store = store_on(&dir, day(2024, 5, 1));
        fs::write(store.path(), r#"{"date":"2024-05-01","count":42}"#).unwrap();

        let report = store.load_report();
        assert_eq!(report.record.count, 42);
        assert_eq!(report.record.date, day(2024, 5, 1));
        assert_eq!(report.source, LoadSource::Stored);
    }

    #[test]
    fn earlier_day_resets_count_without_touching_file() {
        let dir = TempDir::new().unwrap();
        let store = store_on(&dir, day(2024, 5, 2));
        let stale = r#"{"date":"2024-05-01","count":99}"#;
        fs::write(store.path(), stale).unwrap();

        let report = store.load_report();
        assert_eq!(report.record, UsageRecord::fresh(day(2024, 5, 2)));
        assert_eq!(report.source, LoadSource::NewDay);
        assert_eq!(fs::read_to_string(store.path()).unwrap(), stale);
    }

    #[test]
    fn corrupt_file_falls_back() {
        let dir = TempDir::new().unwrap();
        let store = store_on(&dir, day(2024, 5, 1));

        let bodies = [
            "not json",
            r#"{"date":"yesterday","count":3}"#,
            r#"{"date":"2024-05-01","count":-1}"#,
        ];
        for body in bodies {
            fs::write(store.path(), body).unwrap();
            let report = store.load_report();
            assert_eq!(report.record.count, 0, "body: {body}");
            assert_eq!(report.source, LoadSource::Unreadable, "body: {body}");
        }
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = store_on(&dir, day(2024, 5, 1));
        let record = UsageRecord {
            date: day(2024, 5, 1),
            count: 17,
        };

        store.save(&record).unwrap();
        assert_eq!(store.load(), record);

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw, serde_json::json!({"date": "2024-05-01", "count": 17}));
    }

    #[test]
    fn save_overwrites_and_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let store = store_on(&dir, day(2024, 5, 1));
        let mut record = UsageRecord::fresh(day(2024, 5, 1));

        for _ in 0..3 {
            record.record_call();
            store.save(&record).unwrap();
        }

        assert_eq!(store.load().count, 3);
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/state/usage.json");
        let store = UsageStore::with_clock(&path, || day(2024, 5, 1));

        store.save(&UsageRecord::fresh(day(2024, 5, 1))).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn reset_zeroes_todays_count() {
        let dir = TempDir::new().unwrap();
        let store = store_on(&dir, day(2024, 5, 1));
        store
            .save(&UsageRecord {
                date: day(2024, 5, 1),
                count: 100,
            })
            .unwrap();

        let record = store.reset().unwrap();
        assert_eq!(record.count, 0);
        assert_eq!(store.load().count, 0);
    }

    #[test]
    fn remaining_saturates() {
        let record = UsageRecord {
            date: day(2024, 5, 1),
            count: 120,
        };
        assert_eq!(record.remaining(100), 0);
        assert!(record.is_exhausted(100));
        assert_eq!(UsageRecord::fresh(day(2024, 5, 1)).remaining(100), 100);
    }
}
