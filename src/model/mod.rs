//! Core data model for tasktally.
//!
//! These types represent the tracked domain: actors and their grants,
//! tasks with their clocks, and the change notifications that flow out
//! to collaborators.

mod actor;
mod change;
mod task;

pub use actor::{ActionCode, Actor, Role};
pub use change::{ChangeKind, Reconciliation, SyncState, TaskChange, TaskView};
pub use task::{Rating, RecordError, Task, TaskFilter, TaskRecord, TaskStatus};
