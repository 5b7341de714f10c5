//! Local file-backed collaborators, for running the tracker offline.
//!
//! Everything lives under one data directory:
//!
//! ```text
//! <root>/
//!   tasks.json       # Task records as fetched from the backend (JSON array)
//!   journal.jsonl    # Append-only log of every persisted task record
//! ```
//!
//! Fetching reads `tasks.json` and replays the journal over it, so the
//! latest persisted record of each task wins. Each fetch then compacts: the
//! replayed records are written back to `tasks.json` and the journal is
//! emptied, so the journal only holds what changed since the last fetch.

use std::{fs, io, path::PathBuf};

// Traits must be in scope for `.lines()` on `BufReader` and `.write_all()` on `File`.
use io::{BufRead, Write};

use crate::model::{RecordError, Task, TaskFilter, TaskRecord};
use crate::sync::{MutationSink, SyncError, TaskSource};

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid task record: {0}")]
    Record(#[from] RecordError),
}

pub type Result<T> = core::result::Result<T, StoreError>;

/// Task file plus mutation journal in one directory.
pub struct Store {
    root: PathBuf,
}

impl Store {
    /// Creates a store rooted at the given directory.
    ///
    /// The directory is created if it doesn't exist.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Returns the default data directory: `~/.tasktally/data/`.
    pub fn default_root() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".tasktally").join("data"))
    }

    // ── Task file ──

    /// Loads the raw records from `tasks.json`. A missing file is empty.
    pub fn load_records(&self) -> Result<Vec<TaskRecord>> {
        let path = self.tasks_path();
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&json)?)
    }

    /// Overwrites `tasks.json` with the given records.
    pub fn save_records(&self, records: &[TaskRecord]) -> Result<()> {
        let json = serde_json::to_string_pretty(records)?;
        fs::write(self.tasks_path(), json)?;
        Ok(())
    }

    /// Loads tasks with the journal replayed over the task file.
    pub fn load_tasks(&self) -> Result<Vec<Task>> {
        self.replayed_records()?
            .into_iter()
            .map(|r| Task::try_from(r).map_err(StoreError::from))
            .collect()
    }

    /// Folds the journal into `tasks.json` and empties it.
    ///
    /// Safe to interrupt: replaying the same journal over its own result
    /// gives the same records.
    pub fn compact(&self) -> Result<()> {
        let records = self.replayed_records()?;
        self.save_records(&records)?;
        match fs::remove_file(self.journal_path()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Task file records with the latest journal record per id applied.
    /// Journal records for ids missing from the task file are ignored.
    fn replayed_records(&self) -> Result<Vec<TaskRecord>> {
        let mut records = self.load_records()?;
        for entry in self.load_journal()? {
            if let Some(slot) = records.iter_mut().find(|r| r.id == entry.id) {
                *slot = entry;
            }
        }
        Ok(records)
    }

    // ── Journal ──

    /// Appends one record to the journal.
    pub fn append_journal(&self, record: &TaskRecord) -> Result<()> {
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.journal_path())?;
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    /// Loads every journal record in write order.
    pub fn load_journal(&self) -> Result<Vec<TaskRecord>> {
        let file = match fs::File::open(self.journal_path()) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let reader = io::BufReader::new(file);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if !line.is_empty() {
                records.push(serde_json::from_str(&line)?);
            }
        }
        Ok(records)
    }

    fn tasks_path(&self) -> PathBuf {
        self.root.join("tasks.json")
    }

    fn journal_path(&self) -> PathBuf {
        self.root.join("journal.jsonl")
    }
}

impl TaskSource for Store {
    fn fetch_tasks_for(&self, filter: &TaskFilter) -> core::result::Result<Vec<Task>, SyncError> {
        let tasks = self
            .load_tasks()
            .map_err(|e| SyncError::new(e.to_string()))?;
        // Only compact once the replayed records are known to be valid.
        if let Err(e) = self.compact() {
            tracing::warn!(error = %e, "journal compaction failed");
        }
        Ok(tasks.into_iter().filter(|t| filter.matches(t)).collect())
    }
}

impl MutationSink for Store {
    fn persist(&mut self, record: &TaskRecord) -> core::result::Result<(), SyncError> {
        self.append_journal(record)
            .map_err(|e| SyncError::new(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;
    use uuid::Uuid;

    use crate::model::TaskStatus;

    fn test_store() -> (TempDir, Store) {
        let dir = TempDir::new().unwrap();
        let store = Store::new(dir.path().join("data")).unwrap();
        (dir, store)
    }

    fn record(employee: &str, status: TaskStatus) -> TaskRecord {
        TaskRecord {
            id: Uuid::new_v4(),
            employee_name: employee.into(),
            task_name: "Inventory".into(),
            planned_duration_minutes: 30,
            status,
            accumulated_minutes: 0,
            finished_in_minutes: None,
            rating: None,
        }
    }

    #[test]
    fn missing_files_are_empty() {
        let (_dir, store) = test_store();
        assert!(store.load_records().unwrap().is_empty());
        assert!(store.load_journal().unwrap().is_empty());
        assert!(store.load_tasks().unwrap().is_empty());
    }

    #[test]
    fn save_and_load_records() {
        let (_dir, store) = test_store();
        let records = vec![
            record("Dana", TaskStatus::Pending),
            record("Lee", TaskStatus::Paused),
        ];

        store.save_records(&records).unwrap();
        assert_eq!(store.load_records().unwrap(), records);
    }

    #[test]
    fn journal_replays_latest_record_per_task() {
        let (_dir, store) = test_store();
        let original = record("Dana", TaskStatus::Pending);
        store.save_records(std::slice::from_ref(&original)).unwrap();

        let mut paused = original.clone();
        paused.status = TaskStatus::Paused;
        paused.accumulated_minutes = 4;
        let mut done = paused.clone();
        done.status = TaskStatus::Completed;
        done.finished_in_minutes = Some(6);

        store.append_journal(&paused).unwrap();
        store.append_journal(&done).unwrap();
        store
            .append_journal(&record("Ghost", TaskStatus::Paused))
            .unwrap();

        assert_eq!(store.load_journal().unwrap().len(), 3);
        let tasks = store.load_tasks().unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].status(), TaskStatus::Completed);
        assert_eq!(tasks[0].accumulated_minutes(), 4);
        assert_eq!(tasks[0].finished_in_minutes(), Some(6));
    }

    #[test]
    fn invalid_record_is_rejected() {
        let (_dir, store) = test_store();
        let mut bad = record("Dana", TaskStatus::Completed);
        bad.finished_in_minutes = None;
        store.save_records(&[bad]).unwrap();

        assert!(matches!(store.load_tasks(), Err(StoreError::Record(_))));
    }

    #[test]
    fn source_filters_by_employee() {
        let (_dir, store) = test_store();
        store
            .save_records(&[
                record("Dana", TaskStatus::Pending),
                record("Lee", TaskStatus::Pending),
            ])
            .unwrap();

        let dana = store
            .fetch_tasks_for(&TaskFilter::Employee("Dana".into()))
            .unwrap();
        assert_eq!(dana.len(), 1);
        assert_eq!(store.fetch_tasks_for(&TaskFilter::All).unwrap().len(), 2);
    }

    #[test]
    fn compact_folds_journal_into_task_file() {
        let (_dir, store) = test_store();
        let original = record("Dana", TaskStatus::Pending);
        store.save_records(std::slice::from_ref(&original)).unwrap();

        let mut paused = original.clone();
        paused.status = TaskStatus::Paused;
        paused.accumulated_minutes = 4;
        store.append_journal(&paused).unwrap();
        store
            .append_journal(&record("Ghost", TaskStatus::Paused))
            .unwrap();

        store.compact().unwrap();
        assert!(store.load_journal().unwrap().is_empty());
        assert_eq!(store.load_records().unwrap(), vec![paused.clone()]);

        // A second compaction with nothing journaled changes nothing.
        store.compact().unwrap();
        assert_eq!(store.load_records().unwrap(), vec![paused]);
    }

    #[test]
    fn fetch_leaves_the_journal_empty() {
        let (_dir, mut store) = test_store();
        let original = record("Dana", TaskStatus::Pending);
        store.save_records(std::slice::from_ref(&original)).unwrap();

        let mut running = original.clone();
        running.status = TaskStatus::Running;
        store.persist(&running).unwrap();

        let tasks = store.fetch_tasks_for(&TaskFilter::All).unwrap();
        assert_eq!(tasks[0].status(), TaskStatus::Running);
        assert!(store.load_journal().unwrap().is_empty());
        assert_eq!(store.load_records().unwrap(), vec![running]);
    }

    #[test]
    fn invalid_journal_record_is_not_compacted() {
        let (_dir, store) = test_store();
        let original = record("Dana", TaskStatus::Pending);
        store.save_records(std::slice::from_ref(&original)).unwrap();

        let mut bad = original.clone();
        bad.status = TaskStatus::Completed;
        store.append_journal(&bad).unwrap();

        assert!(store.fetch_tasks_for(&TaskFilter::All).is_err());
        assert_eq!(store.load_journal().unwrap(), vec![bad]);
        assert_eq!(store.load_records().unwrap(), vec![original]);
    }

    #[test]
    fn sink_appends_to_journal() {
        let (_dir, mut store) = test_store();
        let rec = record("Dana", TaskStatus::Running);

        store.persist(&rec).unwrap();
        assert_eq!(store.load_journal().unwrap(), vec![rec]);
    }
}
