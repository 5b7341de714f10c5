//! Task registry: the single mutation surface over the tasks in view.
//!
//! Every request runs the same way:
//!
//! 1. ask the permission policy (a denial touches nothing),
//! 2. find the task,
//! 3. hand the event to the lifecycle,
//! 4. mark the task unconfirmed and notify subscribers.
//!
//! Readers get cloned [`TaskView`]s, never references into the registry.

use std::sync::mpsc;

use jiff::Timestamp;
use uuid::Uuid;

use crate::error::{Result, TaskError};
use crate::lifecycle::{self, TaskEvent};
use crate::model::{
    ActionCode, Actor, ChangeKind, Rating, Reconciliation, SyncState, Task, TaskChange,
    TaskFilter, TaskStatus, TaskView,
};
use crate::policy;

struct Entry {
    task: Task,
    sync: SyncState,
}

impl Entry {
    fn view(&self) -> TaskView {
        TaskView {
            task: self.task.clone(),
            sync: self.sync.clone(),
        }
    }
}

/// Owns the tasks of one viewing context.
#[derive(Default)]
pub struct TaskRegistry {
    entries: Vec<Entry>,
    subscribers: Vec<mpsc::Sender<TaskChange>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the task set with freshly fetched tasks, all confirmed.
    ///
    /// Local unconfirmed changes and running tick counts are dropped.
    pub fn hydrate(&mut self, tasks: Vec<Task>) {
        tracing::info!(count = tasks.len(), "hydrating task registry");
        self.entries = tasks
            .into_iter()
            .map(|task| Entry {
                task,
                sync: SyncState::Confirmed,
            })
            .collect();
    }

    /// Receives one [`TaskChange`] per successful mutation from now on.
    pub fn subscribe(&mut self) -> mpsc::Receiver<TaskChange> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    // ── Actor requests ──

    pub fn request_start(&mut self, actor: &Actor, id: Uuid) -> Result<TaskStatus> {
        self.request_event(actor, ActionCode::StartTask, id, TaskEvent::Start)
    }

    pub fn request_pause(&mut self, actor: &Actor, id: Uuid) -> Result<TaskStatus> {
        self.request_event(actor, ActionCode::PauseTask, id, TaskEvent::Pause)
    }

    /// Completes the task with `elapsed_minutes` as its finished time.
    pub fn request_complete(
        &mut self,
        actor: &Actor,
        id: Uuid,
        elapsed_minutes: u32,
    ) -> Result<TaskStatus> {
        self.request_event(
            actor,
            ActionCode::CompleteTask,
            id,
            TaskEvent::Complete {
                minutes: elapsed_minutes,
            },
        )
    }

    /// Rates a completed task, once.
    pub fn request_rate(&mut self, actor: &Actor, id: Uuid, rating: u8) -> Result<()> {
        policy::authorize(actor, ActionCode::RateTask)?;
        let rating = Rating::new(rating).ok_or(TaskError::InvalidRating(rating))?;
        let index = self.index_of(id)?;

        lifecycle::rate(&mut self.entries[index].task, rating)
            .inspect_err(|e| warn_rejected(id, e))?;
        self.commit(index, ChangeKind::Rated);
        Ok(())
    }

    fn request_event(
        &mut self,
        actor: &Actor,
        action: ActionCode,
        id: Uuid,
        event: TaskEvent,
    ) -> Result<TaskStatus> {
        policy::authorize(actor, action)?;
        let index = self.index_of(id)?;

        let status = lifecycle::apply(&mut self.entries[index].task, event)
            .inspect_err(|e| warn_rejected(id, e))?;
        let kind = match event {
            TaskEvent::Start => ChangeKind::Started,
            TaskEvent::Pause => ChangeKind::Paused,
            TaskEvent::Complete { .. } => ChangeKind::Completed,
        };
        self.commit(index, kind);
        Ok(status)
    }

    // ── Passive clock ──

    /// Advances a running task's clock by `n` units.
    ///
    /// Not an authorizable action: the viewer's own refresh loop calls it.
    /// Returns whether the clock moved. Pending and paused tasks ignore the
    /// tick; a completed task reports [`TaskError::TaskAlreadyCompleted`].
    pub fn tick(&mut self, id: Uuid, n: u32) -> Result<bool> {
        let index = self.index_of(id)?;
        let task = &mut self.entries[index].task;
        match lifecycle::tick(task, n) {
            Ok(()) => Ok(true),
            Err(TaskError::NoOpenInterval) => {
                tracing::trace!(task = %id, status = %task.status(), "tick ignored");
                Ok(false)
            }
            Err(e) => {
                warn_rejected(id, &e);
                Err(e)
            }
        }
    }

    /// Ticks every running task. Returns how many moved.
    pub fn tick_running(&mut self, n: u32) -> usize {
        let running: Vec<Uuid> = self
            .entries
            .iter()
            .filter(|e| e.task.status() == TaskStatus::Running)
            .map(|e| e.task.id)
            .collect();
        running
            .into_iter()
            .filter(|&id| matches!(self.tick(id, n), Ok(true)))
            .count()
    }

    // ── Reads ──

    /// Copies of the tasks matching `filter`, in hydration order.
    pub fn snapshot(&self, filter: &TaskFilter) -> Vec<TaskView> {
        self.entries
            .iter()
            .filter(|e| filter.matches(&e.task))
            .map(Entry::view)
            .collect()
    }

    /// Like [`snapshot`](Self::snapshot), gated on who is looking.
    ///
    /// An actor may always see the tasks filed under their own name. Any
    /// other view needs the view-all grant.
    pub fn authorized_snapshot(
        &self,
        actor: &Actor,
        filter: &TaskFilter,
    ) -> Result<Vec<TaskView>> {
        let own = matches!(
            (filter, actor.name.as_deref()),
            (TaskFilter::Employee(wanted), Some(name)) if wanted == name
        );
        if !own {
            policy::authorize(actor, ActionCode::ViewAllTasks)?;
        }
        Ok(self.snapshot(filter))
    }

    pub fn view(&self, id: Uuid) -> Option<TaskView> {
        self.entries
            .iter()
            .find(|e| e.task.id == id)
            .map(Entry::view)
    }

    /// Ids of tasks changed locally and not yet confirmed remotely.
    pub fn unconfirmed(&self) -> Vec<Uuid> {
        self.entries
            .iter()
            .filter(|e| !e.sync.is_confirmed())
            .map(|e| e.task.id)
            .collect()
    }

    // ── Remote side ──

    /// Applies an authoritative report from the remote side.
    ///
    /// The remote total replaces the local one outright. Returns whether
    /// anything changed; applying the same report again changes nothing.
    pub fn reconcile(&mut self, report: &Reconciliation) -> Result<bool> {
        let index = self.index_of(report.task_id)?;
        let entry = &mut self.entries[index];
        let before = entry.task.clone();

        entry.task.clock.reconcile(report.accumulated_minutes);
        if let Some(finished) = report.finished_in_minutes {
            entry.task.clock.reconcile_finished(finished);
        }

        let changed = entry.task != before;
        if changed {
            tracing::info!(
                task = %report.task_id,
                local = before.accumulated_minutes(),
                remote = report.accumulated_minutes,
                "remote state replaced local clock"
            );
        }
        entry.sync = SyncState::Confirmed;
        if changed {
            let change = change_for(&self.entries[index].task, ChangeKind::Reconciled);
            self.emit(&change);
        }
        Ok(changed)
    }

    /// Records the outcome of a push that did not confirm the task: the
    /// error of a failed persist, or `None` once a retry went through.
    /// The local change stays in place either way.
    pub fn mark_unconfirmed(&mut self, id: Uuid, error: Option<String>) -> Result<()> {
        let index = self.index_of(id)?;
        let since = match &self.entries[index].sync {
            SyncState::Unconfirmed { since, .. } => *since,
            SyncState::Confirmed => Timestamp::now(),
        };
        self.entries[index].sync = SyncState::Unconfirmed {
            since,
            last_error: error,
        };
        Ok(())
    }

    fn index_of(&self, id: Uuid) -> Result<usize> {
        self.entries
            .iter()
            .position(|e| e.task.id == id)
            .ok_or(TaskError::TaskNotFound(id))
    }

    fn commit(&mut self, index: usize, kind: ChangeKind) {
        let entry = &mut self.entries[index];
        let since = match &entry.sync {
            SyncState::Unconfirmed { since, .. } => *since,
            SyncState::Confirmed => Timestamp::now(),
        };
        entry.sync = SyncState::Unconfirmed {
            since,
            last_error: None,
        };
        let change = change_for(&entry.task, kind);
        self.emit(&change);
    }

    fn emit(&mut self, change: &TaskChange) {
        self.subscribers.retain(|tx| tx.send(change.clone()).is_ok());
    }
}

fn change_for(task: &Task, kind: ChangeKind) -> TaskChange {
    TaskChange {
        task_id: task.id,
        kind,
        record: task.to_record(),
        changed_at: Timestamp::now(),
    }
}

fn warn_rejected(id: Uuid, err: &TaskError) {
    match err {
        TaskError::TaskAlreadyCompleted | TaskError::AlreadyRated => {
            tracing::warn!(task = %id, error = %err, "terminal task left unchanged");
        }
        _ => tracing::debug!(task = %id, error = %err, "request rejected"),
    }
}
