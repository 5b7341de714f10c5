//! Change notifications, sync bookkeeping, and read-only views.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::task::{Task, TaskRecord};

/// Emitted once per successful mutation. Carries the full new state so a
/// subscriber never has to read back into the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskChange {
    pub task_id: Uuid,
    pub kind: ChangeKind,
    pub record: TaskRecord,
    pub changed_at: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeKind {
    Started,
    Paused,
    Completed,
    Rated,
    /// Local state was replaced by a remote confirmation.
    Reconciled,
}

impl ChangeKind {
    /// Whether the persistence collaborator has to hear about this change.
    /// Reconciliations came from the remote side in the first place.
    pub fn needs_persist(self) -> bool {
        !matches!(self, Self::Reconciled)
    }
}

/// Whether the remote side has confirmed the local state of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum SyncState {
    Confirmed,

    /// Locally modified, not yet confirmed.
    Unconfirmed {
        since: Timestamp,

        /// Message of the last failed persist attempt, if any.
        last_error: Option<String>,
    },
}

impl SyncState {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed)
    }
}

/// An authoritative report of a task's state from the remote side.
///
/// Applying the same reconciliation twice leaves the task as the first
/// application did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reconciliation {
    pub task_id: Uuid,
    pub accumulated_minutes: u32,

    /// Only applied to tasks that are completed locally.
    #[serde(default)]
    pub finished_in_minutes: Option<u32>,
}

/// Immutable copy of one task handed out by a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskView {
    pub task: Task,
    pub sync: SyncState,
}
