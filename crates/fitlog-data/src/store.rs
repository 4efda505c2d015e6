//! Storage collaborator for workout records.
//!
//! [`WorkoutStore`] is the abstract capability the rest of fitlog depends on.
//! Two implementations ship with the crate: [`InMemoryStore`] for tests and
//! embedding, and [`JsonlStore`], which keeps one directory per owner and one
//! `YYYY-MM.jsonl` file per month.

use std::io::BufRead;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use fitlog_core::error::StoreError;
use fitlog_core::models::WorkoutRecord;

// ── WorkoutStore ──────────────────────────────────────────────────────────────

#[async_trait]
pub trait WorkoutStore: Send + Sync {
    /// Persist one record.
    async fn save(&self, record: &WorkoutRecord) -> Result<(), StoreError>;

    /// Records of `owner` dated within `[start, end)`, oldest file first and
    /// in write order within a file.
    async fn find_by_owner_and_date_range(
        &self,
        owner: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<WorkoutRecord>, StoreError>;

    /// Number of records of `owner` dated within `[start, end)`.
    async fn count_by_owner_and_date_range(
        &self,
        owner: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        Ok(self
            .find_by_owner_and_date_range(owner, start, end)
            .await?
            .len() as u64)
    }
}

// ── InMemoryStore ─────────────────────────────────────────────────────────────

/// Process-local store, kept in insertion order.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: RwLock<Vec<WorkoutRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records across all owners.
    pub async fn record_count(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl WorkoutStore for InMemoryStore {
    async fn save(&self, record: &WorkoutRecord) -> Result<(), StoreError> {
        self.records.write().await.push(record.clone());
        Ok(())
    }

    async fn find_by_owner_and_date_range(
        &self,
        owner: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<WorkoutRecord>, StoreError> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .filter(|r| r.owner == owner && r.date >= start && r.date < end)
            .cloned()
            .collect())
    }
}

// ── JsonlStore ────────────────────────────────────────────────────────────────

/// File-backed store: `<root>/<owner>/<YYYY-MM>.jsonl`, one record per line.
///
/// Month files are keyed by the record's UTC date. Appends are serialised
/// through a mutex; reads run on the blocking pool and skip malformed lines.
#[derive(Debug)]
pub struct JsonlStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Directory holding `owner`'s month files.
    pub fn owner_dir(&self, owner: &str) -> PathBuf {
        self.root.join(encode_owner(owner))
    }

    fn month_file(&self, record: &WorkoutRecord) -> PathBuf {
        self.owner_dir(&record.owner)
            .join(format!("{}.jsonl", record.date.format("%Y-%m")))
    }
}

#[async_trait]
impl WorkoutStore for JsonlStore {
    async fn save(&self, record: &WorkoutRecord) -> Result<(), StoreError> {
        let path = self.month_file(record);
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| StoreError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let io_err = |source| StoreError::Io {
            path: path.clone(),
            source,
        };
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(io_err)?;
        file.write_all(line.as_bytes()).await.map_err(io_err)?;
        file.flush().await.map_err(io_err)?;

        debug!(id = %record.id, path = %path.display(), "workout record appended");
        Ok(())
    }

    async fn find_by_owner_and_date_range(
        &self,
        owner: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<WorkoutRecord>, StoreError> {
        let dir = self.owner_dir(owner);
        let owner = owner.to_string();
        tokio::task::spawn_blocking(move || read_range(&dir, &owner, start, end))
            .await
            .map_err(|e| StoreError::Unavailable(format!("store read task failed: {e}")))?
    }
}

// ── File helpers ──────────────────────────────────────────────────────────────

/// Map an owner id onto a single safe path component.
///
/// ASCII alphanumerics, `-` and `_` pass through; every other byte becomes
/// `%XX`, so distinct owners never share a directory.
fn encode_owner(owner: &str) -> String {
    let mut out = String::with_capacity(owner.len());
    for b in owner.bytes() {
        if b.is_ascii_alphanumeric() || b == b'-' || b == b'_' {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    if out.is_empty() {
        out.push('%');
    }
    out
}

/// UTC interval `[first of month, first of next month)` for a `YYYY-MM` stem.
fn month_span(stem: &str) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let first = NaiveDate::parse_from_str(&format!("{stem}-01"), "%Y-%m-%d").ok()?;
    let next = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)?
    };
    let to_utc = |d: NaiveDate| Utc.from_utc_datetime(&d.and_time(chrono::NaiveTime::MIN));
    Some((to_utc(first), to_utc(next)))
}

/// Month files under `dir` overlapping `[start, end)`, sorted by name.
fn month_files(dir: &Path, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<PathBuf> {
    if !dir.exists() {
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .map(|ext| ext == "jsonl")
                    .unwrap_or(false)
        })
        .filter(|entry| {
            entry
                .path()
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(month_span)
                .is_some_and(|(m_start, m_end)| m_start < end && m_end > start)
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

fn read_range(
    dir: &Path,
    owner: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<WorkoutRecord>, StoreError> {
    let mut records = Vec::new();

    for path in month_files(dir, start, end) {
        let file = std::fs::File::open(&path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        let reader = std::io::BufReader::new(file);

        for (line_no, line) in reader.lines().enumerate() {
            let line = line.map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<WorkoutRecord>(trimmed) {
                Ok(record) => {
                    if record.owner == owner && record.date >= start && record.date < end {
                        records.push(record);
                    }
                }
                Err(e) => {
                    warn!(
                        "Skipping malformed record at {}:{}: {}",
                        path.display(),
                        line_no + 1,
                        e
                    );
                }
            }
        }
    }

    debug!(owner, count = records.len(), "records loaded from store");
    Ok(records)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_record(owner: &str, ts: &str, calories: f64) -> WorkoutRecord {
        WorkoutRecord {
            id: format!("{owner}-{ts}"),
            owner: owner.to_string(),
            category: "cardio".to_string(),
            workout_name: "Run".to_string(),
            sets: 1,
            reps: 1,
            weight: 70.0,
            duration: 30.0,
            calories_burned: calories,
            date: DateTime::parse_from_rfc3339(ts)
                .unwrap()
                .with_timezone(&Utc),
        }
    }

    fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    // ── InMemoryStore ─────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_in_memory_filters_owner_and_range() {
        let store = InMemoryStore::new();
        store
            .save(&make_record("alice", "2024-01-15T08:00:00Z", 1.0))
            .await
            .unwrap();
        store
            .save(&make_record("bob", "2024-01-15T09:00:00Z", 2.0))
            .await
            .unwrap();
        store
            .save(&make_record("alice", "2024-01-16T00:00:00Z", 4.0))
            .await
            .unwrap();

        let found = store
            .find_by_owner_and_date_range("alice", utc(2024, 1, 15), utc(2024, 1, 16))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].calories_burned, 1.0);

        let count = store
            .count_by_owner_and_date_range("alice", utc(2024, 1, 1), utc(2024, 2, 1))
            .await
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(store.record_count().await, 3);
    }

    // ── JsonlStore ────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_jsonl_round_trip_across_months() {
        let tmp = TempDir::new().expect("tempdir");
        let store = JsonlStore::new(tmp.path());

        let jan = make_record("alice", "2024-01-31T23:00:00Z", 1.0);
        let feb = make_record("alice", "2024-02-01T01:00:00Z", 2.0);
        store.save(&jan).await.unwrap();
        store.save(&feb).await.unwrap();

        assert!(store.owner_dir("alice").join("2024-01.jsonl").is_file());
        assert!(store.owner_dir("alice").join("2024-02.jsonl").is_file());

        let found = store
            .find_by_owner_and_date_range("alice", utc(2024, 1, 31), utc(2024, 2, 2))
            .await
            .unwrap();
        assert_eq!(found, vec![jan, feb]);
    }

    #[tokio::test]
    async fn test_jsonl_range_is_half_open() {
        let tmp = TempDir::new().expect("tempdir");
        let store = JsonlStore::new(tmp.path());
        store
            .save(&make_record("alice", "2024-01-16T00:00:00Z", 1.0))
            .await
            .unwrap();

        let count = store
            .count_by_owner_and_date_range("alice", utc(2024, 1, 15), utc(2024, 1, 16))
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_jsonl_unknown_owner_is_empty() {
        let tmp = TempDir::new().expect("tempdir");
        let store = JsonlStore::new(tmp.path());
        let found = store
            .find_by_owner_and_date_range("nobody", utc(2024, 1, 1), utc(2025, 1, 1))
            .await
            .unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_jsonl_skips_malformed_lines() {
        let tmp = TempDir::new().expect("tempdir");
        let store = JsonlStore::new(tmp.path());
        store
            .save(&make_record("alice", "2024-01-15T08:00:00Z", 1.0))
            .await
            .unwrap();

        let path = store.owner_dir("alice").join("2024-01.jsonl");
        let mut content = std::fs::read_to_string(&path).unwrap();
        content.push_str("{not json}\n\n");
        std::fs::write(&path, content).unwrap();

        store
            .save(&make_record("alice", "2024-01-15T09:00:00Z", 2.0))
            .await
            .unwrap();

        let found = store
            .find_by_owner_and_date_range("alice", utc(2024, 1, 15), utc(2024, 1, 16))
            .await
            .unwrap();
        assert_eq!(found.len(), 2);
    }

    #[tokio::test]
    async fn test_jsonl_owners_are_isolated() {
        let tmp = TempDir::new().expect("tempdir");
        let store = JsonlStore::new(tmp.path());
        store
            .save(&make_record("a/b", "2024-01-15T08:00:00Z", 1.0))
            .await
            .unwrap();
        store
            .save(&make_record("a_b", "2024-01-15T08:00:00Z", 2.0))
            .await
            .unwrap();

        let found = store
            .find_by_owner_and_date_range("a/b", utc(2024, 1, 1), utc(2024, 2, 1))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].calories_burned, 1.0);
        assert!(store.owner_dir("a/b").starts_with(tmp.path()));
    }

    // ── helpers ───────────────────────────────────────────────────────────────

    #[test]
    fn test_encode_owner() {
        assert_eq!(encode_owner("alice_01"), "alice_01");
        assert_eq!(encode_owner("../etc"), "%2E%2E%2Fetc");
        assert_eq!(encode_owner(""), "%");
    }

    #[test]
    fn test_month_span_december_rolls_over() {
        let (start, end) = month_span("2024-12").unwrap();
        assert_eq!(start, utc(2024, 12, 1));
        assert_eq!(end, utc(2025, 1, 1));
        assert!(month_span("notes").is_none());
    }
}
