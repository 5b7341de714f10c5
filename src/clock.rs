//! Task clock: elapsed-time accounting for a single task.
//!
//! The clock never reads wall time. Whatever drives the display (a
//! once-per-second refresh, a once-per-minute refresh, a test) calls
//! [`TaskClock::tick`] with the number of units that passed, and the clock
//! only does the bookkeeping:
//!
//! ```text
//! start ─ tick ─ tick ─ pause ─ start ─ tick ─ complete(final)
//!         └── open interval ──┘         └ open ┘
//! ```
//!
//! Pausing folds the open interval into the accumulated total. Completing
//! folds too, then pins the finished value to whatever the caller says is
//! authoritative.

/// Errors from clock operations. The clock is unchanged when one is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ClockError {
    #[error("an interval is already open")]
    InvalidTransition,

    #[error("no open interval")]
    NoOpenInterval,

    #[error("clock is frozen: task already completed")]
    AlreadyCompleted,
}

pub type Result<T> = core::result::Result<T, ClockError>;

/// Accumulated minutes plus the ticks of the interval currently running.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskClock {
    accumulated: u32,
    open: Option<u32>,
    finished: Option<u32>,
}

impl TaskClock {
    /// A fresh clock: nothing accumulated, no open interval.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a clock from server-reported values.
    ///
    /// There is never an open interval after a restore: tick counts live
    /// only in memory and are gone once the process that counted them is.
    pub fn restore(accumulated: u32, finished: Option<u32>) -> Self {
        Self {
            accumulated,
            open: None,
            finished,
        }
    }

    /// Rebuilds the clock of a task the remote side reports as running.
    ///
    /// The interval is opened fresh at zero, since the ticks counted before
    /// the restart are gone.
    pub(crate) fn restore_running(accumulated: u32) -> Self {
        Self {
            accumulated,
            open: Some(0),
            finished: None,
        }
    }

    /// Opens a new interval.
    pub fn start(&mut self) -> Result<()> {
        self.ensure_running_allowed()?;
        if self.open.is_some() {
            return Err(ClockError::InvalidTransition);
        }
        self.open = Some(0);
        Ok(())
    }

    /// Adds `n` units to the open interval.
    pub fn tick(&mut self, n: u32) -> Result<()> {
        self.ensure_running_allowed()?;
        let open = self.open.as_mut().ok_or(ClockError::NoOpenInterval)?;
        *open = open.saturating_add(n);
        Ok(())
    }

    /// Closes the open interval, folding it into the accumulated total.
    pub fn pause(&mut self) -> Result<()> {
        self.ensure_running_allowed()?;
        let elapsed = self.open.take().ok_or(ClockError::NoOpenInterval)?;
        self.accumulated = self.accumulated.saturating_add(elapsed);
        Ok(())
    }

    /// Freezes the clock with `final_elapsed` as the finished value.
    ///
    /// Any open interval is folded first so `accumulated` stays the honest
    /// local count, but the finished value is always `final_elapsed`.
    pub fn complete(&mut self, final_elapsed: u32) -> Result<()> {
        self.ensure_running_allowed()?;
        if let Some(elapsed) = self.open.take() {
            self.accumulated = self.accumulated.saturating_add(elapsed);
        }
        self.finished = Some(final_elapsed);
        Ok(())
    }

    /// Replaces the folded total with an authoritative remote value.
    ///
    /// Ticks in a currently open interval have not been reported anywhere
    /// yet, so they are kept.
    pub fn reconcile(&mut self, accumulated: u32) {
        self.accumulated = accumulated;
    }

    /// Overrides the finished value of a completed clock.
    pub(crate) fn reconcile_finished(&mut self, finished: u32) {
        if self.finished.is_some() {
            self.finished = Some(finished);
        }
    }

    /// Minutes folded in by completed intervals.
    pub fn accumulated(&self) -> u32 {
        self.accumulated
    }

    /// Ticks counted in the open interval, if one is open.
    pub fn open_elapsed(&self) -> Option<u32> {
        self.open
    }

    /// The fixed finished value, once completed.
    pub fn finished(&self) -> Option<u32> {
        self.finished
    }

    /// Accumulated plus whatever the open interval holds.
    pub fn elapsed(&self) -> u32 {
        self.accumulated.saturating_add(self.open.unwrap_or_default())
    }

    fn ensure_running_allowed(&self) -> Result<()> {
        if self.finished.is_some() {
            return Err(ClockError::AlreadyCompleted);
        }
        Ok(())
    }
}
