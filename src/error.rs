//! Errors returned by the task core.
//!
//! Every failure is a typed result. Nothing in the core is fatal to the
//! hosting process.

use uuid::Uuid;

use crate::clock::ClockError;
use crate::model::{ActionCode, TaskStatus};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    #[error("permission denied: {action} is not granted")]
    PermissionDenied { action: ActionCode },

    #[error("task not found: {0}")]
    TaskNotFound(Uuid),

    #[error("cannot {event} a {from} task")]
    InvalidTransition { from: TaskStatus, event: &'static str },

    #[error("task is already completed")]
    TaskAlreadyCompleted,

    #[error("task is already rated")]
    AlreadyRated,

    #[error("task has no running interval")]
    NoOpenInterval,

    #[error("rating {0} is outside 1-5")]
    InvalidRating(u8),
}

impl TaskError {
    /// Only permission failures are meant for the end user. Everything
    /// else is an integration signal.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, Self::PermissionDenied { .. })
    }

    /// The caller's view of the task is stale and should be re-fetched.
    pub fn needs_resync(&self) -> bool {
        matches!(
            self,
            Self::TaskNotFound(_)
                | Self::InvalidTransition { .. }
                | Self::TaskAlreadyCompleted
                | Self::AlreadyRated
                | Self::NoOpenInterval
        )
    }
}

pub type Result<T> = core::result::Result<T, TaskError>;

/// Maps clock failures onto lifecycle terms. The lifecycle checks status
/// before touching the clock, so these only surface if the two disagree.
pub(crate) fn from_clock(err: ClockError, from: TaskStatus, event: &'static str) -> TaskError {
    match err {
        ClockError::InvalidTransition => TaskError::InvalidTransition { from, event },
        ClockError::NoOpenInterval => TaskError::NoOpenInterval,
        ClockError::AlreadyCompleted => TaskError::TaskAlreadyCompleted,
    }
}
