//! Task lifecycle: the state machine around a task's clock.
//!
//! ```text
//! Pending ──start──▶ Running ◀──start── Paused
//!                       │  └───pause───▶  │
//!                       └──complete──▶ Completed ◀──complete──┘
//! ```
//!
//! `Completed` is terminal. These functions borrow the task for the
//! duration of one call and keep status, clock, and rating in step. On
//! any error the task is left exactly as it was.

use crate::error::{self, Result, TaskError};
use crate::model::{Rating, Task, TaskStatus};

/// An actor-driven event against a single task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskEvent {
    Start,
    Pause,
    /// Finish with the authoritative elapsed total.
    Complete { minutes: u32 },
}

impl TaskEvent {
    pub fn verb(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Pause => "pause",
            Self::Complete { .. } => "complete",
        }
    }
}

/// Applies `event`, returning the new status.
pub fn apply(task: &mut Task, event: TaskEvent) -> Result<TaskStatus> {
    let from = task.status;
    let next = match (from, event) {
        (TaskStatus::Completed, _) => return Err(TaskError::TaskAlreadyCompleted),
        (TaskStatus::Pending | TaskStatus::Paused, TaskEvent::Start) => TaskStatus::Running,
        (TaskStatus::Running, TaskEvent::Pause) => TaskStatus::Paused,
        (TaskStatus::Running | TaskStatus::Paused, TaskEvent::Complete { .. }) => {
            TaskStatus::Completed
        }
        (_, event) => {
            return Err(TaskError::InvalidTransition {
                from,
                event: event.verb(),
            });
        }
    };

    let clock = match event {
        TaskEvent::Start => task.clock.start(),
        TaskEvent::Pause => task.clock.pause(),
        TaskEvent::Complete { minutes } => task.clock.complete(minutes),
    };
    clock.map_err(|e| error::from_clock(e, from, event.verb()))?;

    task.status = next;
    if next == TaskStatus::Completed {
        task.rating = None;
    }
    tracing::debug!(task = %task.id, %from, to = %next, "transition");
    Ok(next)
}

/// Advances the running interval by `n` units.
pub fn tick(task: &mut Task, n: u32) -> Result<()> {
    match task.status {
        TaskStatus::Completed => Err(TaskError::TaskAlreadyCompleted),
        TaskStatus::Running => task
            .clock
            .tick(n)
            .map_err(|e| error::from_clock(e, TaskStatus::Running, "tick")),
        TaskStatus::Pending | TaskStatus::Paused => Err(TaskError::NoOpenInterval),
    }
}

/// Rates a completed task. A task is rated at most once.
pub fn rate(task: &mut Task, rating: Rating) -> Result<()> {
    if task.status != TaskStatus::Completed {
        return Err(TaskError::InvalidTransition {
            from: task.status,
            event: "rate",
        });
    }
    if task.rating.is_some() {
        return Err(TaskError::AlreadyRated);
    }
    task.rating = Some(rating);
    Ok(())
}
