//! Task types: the unit of tracked work.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::TaskClock;

/// A unit of work assigned to one employee.
///
/// Status, clock, and rating are only changed through the lifecycle
/// functions, which keep them consistent with each other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: Uuid,
    pub employee_name: String,
    pub task_name: String,
    pub planned_duration_minutes: u32,
    pub(crate) status: TaskStatus,
    pub(crate) clock: TaskClock,
    pub(crate) rating: Option<Rating>,
}

impl Task {
    /// A new task that has not been started.
    pub fn new(
        employee_name: impl Into<String>,
        task_name: impl Into<String>,
        planned_duration_minutes: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            employee_name: employee_name.into(),
            task_name: task_name.into(),
            planned_duration_minutes,
            status: TaskStatus::Pending,
            clock: TaskClock::new(),
            rating: None,
        }
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn clock(&self) -> &TaskClock {
        &self.clock
    }

    pub fn accumulated_minutes(&self) -> u32 {
        self.clock.accumulated()
    }

    /// Ticks in the running interval, not yet folded into the total.
    pub fn open_elapsed(&self) -> Option<u32> {
        self.clock.open_elapsed()
    }

    /// Set exactly once, on completion.
    pub fn finished_in_minutes(&self) -> Option<u32> {
        self.clock.finished()
    }

    pub fn rating(&self) -> Option<Rating> {
        self.rating
    }

    /// The shape handed to the persistence collaborator.
    pub fn to_record(&self) -> TaskRecord {
        TaskRecord {
            id: self.id,
            employee_name: self.employee_name.clone(),
            task_name: self.task_name.clone(),
            planned_duration_minutes: self.planned_duration_minutes,
            status: self.status,
            accumulated_minutes: self.clock.accumulated(),
            finished_in_minutes: self.clock.finished(),
            rating: self.rating.map(Rating::get),
        }
    }
}

/// Where a task stands in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    /// Not started yet.
    Pending,

    /// The clock is running.
    Running,

    /// Started at least once, clock stopped.
    Paused,

    /// Terminal. Finished time is fixed.
    Completed,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A 1–5 quality rating given after completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&value).then_some(Self(value))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

/// Flat task shape exchanged with the task source and mutation sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub id: Uuid,
    pub employee_name: String,
    pub task_name: String,
    #[serde(default)]
    pub planned_duration_minutes: u32,
    pub status: TaskStatus,
    #[serde(default)]
    pub accumulated_minutes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_in_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
}

/// Why a record could not become a task.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("task {0}: finishedInMinutes must be set if and only if status is completed")]
    FinishedMismatch(Uuid),

    #[error("task {0}: rating present on a task that is not finished")]
    RatingWithoutFinish(Uuid),

    #[error("task {id}: rating {value} is outside 1-5")]
    RatingOutOfRange { id: Uuid, value: u8 },
}

impl TryFrom<TaskRecord> for Task {
    type Error = RecordError;

    /// Validates the status/finished/rating invariants.
    ///
    /// A record reported as running gets a fresh open interval: the remote
    /// side knows the task is running but not how many ticks this process
    /// would have counted.
    fn try_from(record: TaskRecord) -> Result<Self, Self::Error> {
        let completed = record.status == TaskStatus::Completed;
        if completed != record.finished_in_minutes.is_some() {
            return Err(RecordError::FinishedMismatch(record.id));
        }

        let rating = match record.rating {
            None => None,
            Some(_) if record.finished_in_minutes.is_none() => {
                return Err(RecordError::RatingWithoutFinish(record.id));
            }
            Some(value) => Some(Rating::new(value).ok_or(RecordError::RatingOutOfRange {
                id: record.id,
                value,
            })?),
        };

        let clock = if record.status == TaskStatus::Running {
            TaskClock::restore_running(record.accumulated_minutes)
        } else {
            TaskClock::restore(record.accumulated_minutes, record.finished_in_minutes)
        };

        Ok(Self {
            id: record.id,
            employee_name: record.employee_name,
            task_name: record.task_name,
            planned_duration_minutes: record.planned_duration_minutes,
            status: record.status,
            clock,
            rating,
        })
    }
}

/// Which tasks a view covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskFilter {
    /// Every employee's tasks: the manager view.
    All,

    /// One employee's tasks, matched exactly by name.
    Employee(String),
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        match self {
            Self::All => true,
            Self::Employee(name) => task.employee_name == *name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(status: TaskStatus) -> TaskRecord {
        TaskRecord {
            id: Uuid::new_v4(),
            employee_name: "Dana".into(),
            task_name: "Inventory".into(),
            planned_duration_minutes: 30,
            status,
            accumulated_minutes: 12,
            finished_in_minutes: None,
            rating: None,
        }
    }

    #[test]
    fn rating_bounds() {
        assert!(Rating::new(0).is_none());
        assert_eq!(Rating::new(1).map(Rating::get), Some(1));
        assert_eq!(Rating::new(5).map(Rating::get), Some(5));
        assert!(Rating::new(6).is_none());
    }

    #[test]
    fn running_record_hydrates_with_fresh_interval() {
        let task = Task::try_from(record(TaskStatus::Running)).unwrap();
        assert_eq!(task.status(), TaskStatus::Running);
        assert_eq!(task.accumulated_minutes(), 12);
        assert_eq!(task.open_elapsed(), Some(0));
    }

    #[test]
    fn paused_record_has_no_open_interval() {
        let task = Task::try_from(record(TaskStatus::Paused)).unwrap();
        assert_eq!(task.open_elapsed(), None);
        assert_eq!(task.finished_in_minutes(), None);
    }

    #[test]
    fn completed_record_requires_finished() {
        let rec = record(TaskStatus::Completed);
        let err = Task::try_from(rec).unwrap_err();
        assert!(matches!(err, RecordError::FinishedMismatch(_)));
    }

    #[test]
    fn finished_on_open_task_is_rejected() {
        let mut rec = record(TaskStatus::Paused);
        rec.finished_in_minutes = Some(3);
        assert!(matches!(
            Task::try_from(rec),
            Err(RecordError::FinishedMismatch(_))
        ));
    }

    #[test]
    fn rating_needs_finish_and_range() {
        let mut rec = record(TaskStatus::Paused);
        rec.rating = Some(4);
        assert!(matches!(
            Task::try_from(rec),
            Err(RecordError::RatingWithoutFinish(_))
        ));

        let mut rec = record(TaskStatus::Completed);
        rec.finished_in_minutes = Some(20);
        rec.rating = Some(9);
        assert!(matches!(
            Task::try_from(rec),
            Err(RecordError::RatingOutOfRange { value: 9, .. })
        ));
    }

    #[test]
    fn completed_record_round_trips_to_record() {
        let mut rec = record(TaskStatus::Completed);
        rec.finished_in_minutes = Some(20);
        rec.rating = Some(5);

        let task = Task::try_from(rec.clone()).unwrap();
        assert_eq!(task.finished_in_minutes(), Some(20));
        assert_eq!(task.rating().map(Rating::get), Some(5));
        assert_eq!(task.to_record(), rec);
    }

    #[test]
    fn record_uses_camel_case_and_skips_unset_fields() {
        let json = serde_json::to_string(&record(TaskStatus::Pending)).unwrap();
        assert!(json.contains(r#""employeeName":"Dana""#));
        assert!(json.contains(r#""accumulatedMinutes":12"#));
        assert!(!json.contains("finishedInMinutes"));
        assert!(!json.contains("rating"));
    }

    #[test]
    fn filter_matches_by_exact_name() {
        let task = Task::new("Dana", "Inventory", 30);
        assert!(TaskFilter::All.matches(&task));
        assert!(TaskFilter::Employee("Dana".into()).matches(&task));
        assert!(!TaskFilter::Employee("dana".into()).matches(&task));
    }
}
