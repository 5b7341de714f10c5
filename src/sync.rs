//! Boundary contracts and the session that wires them to the registry.
//!
//! The core never talks to a network or a disk. It hydrates from a
//! [`TaskSource`], reports changes to a [`MutationSink`], and asks an
//! [`ActorSource`] who is acting. [`Session`] is the glue: each request
//! re-reads the actor, runs against the registry, then pushes every change
//! it produced to the sink.
//!
//! A failed push never rolls the local change back. The task stays
//! unconfirmed until a retry succeeds or the remote side reconciles it.

use std::sync::mpsc;

use uuid::Uuid;

use crate::error::TaskError;
use crate::model::{
    Actor, Reconciliation, Task, TaskChange, TaskFilter, TaskRecord, TaskStatus, TaskView,
};
use crate::registry::TaskRegistry;

/// A collaborator failure: the task source or mutation sink could not do its job.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct SyncError(pub String);

impl SyncError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Read-only hydration.
pub trait TaskSource {
    fn fetch_tasks_for(&self, filter: &TaskFilter) -> Result<Vec<Task>, SyncError>;
}

/// Receives the new state of a task after each local transition.
pub trait MutationSink {
    fn persist(&mut self, record: &TaskRecord) -> Result<(), SyncError>;
}

/// Who is acting right now. Queried on every check, never cached.
pub trait ActorSource {
    fn current_actor(&self) -> Actor;
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Task(#[from] TaskError),

    /// The local change stands; only the push failed.
    #[error("saved locally, not confirmed: {0}")]
    Persist(SyncError),

    #[error("could not fetch tasks: {0}")]
    Fetch(SyncError),
}

pub type SessionResult<T> = Result<T, SessionError>;

/// A registry plus the collaborators it reports to.
pub struct Session<S, K, A> {
    registry: TaskRegistry,
    changes: mpsc::Receiver<TaskChange>,
    source: S,
    sink: K,
    actors: A,
    filter: TaskFilter,
}

impl<S, K, A> Session<S, K, A>
where
    S: TaskSource,
    K: MutationSink,
    A: ActorSource,
{
    /// Opens a session over `filter` and hydrates it from the source.
    pub fn open(source: S, sink: K, actors: A, filter: TaskFilter) -> SessionResult<Self> {
        let mut registry = TaskRegistry::new();
        let changes = registry.subscribe();
        let mut session = Self {
            registry,
            changes,
            source,
            sink,
            actors,
            filter,
        };
        session.resync()?;
        Ok(session)
    }

    /// Re-fetches the task set, dropping unconfirmed local state.
    pub fn resync(&mut self) -> SessionResult<()> {
        let tasks = self
            .source
            .fetch_tasks_for(&self.filter)
            .map_err(SessionError::Fetch)?;
        self.registry.hydrate(tasks);
        Ok(())
    }

    pub fn start(&mut self, id: Uuid) -> SessionResult<TaskStatus> {
        let actor = self.actors.current_actor();
        let status = self.registry.request_start(&actor, id)?;
        self.flush()?;
        Ok(status)
    }

    pub fn pause(&mut self, id: Uuid) -> SessionResult<TaskStatus> {
        let actor = self.actors.current_actor();
        let status = self.registry.request_pause(&actor, id)?;
        self.flush()?;
        Ok(status)
    }

    pub fn complete(&mut self, id: Uuid, elapsed_minutes: u32) -> SessionResult<TaskStatus> {
        let actor = self.actors.current_actor();
        let status = self.registry.request_complete(&actor, id, elapsed_minutes)?;
        self.flush()?;
        Ok(status)
    }

    pub fn rate(&mut self, id: Uuid, rating: u8) -> SessionResult<()> {
        let actor = self.actors.current_actor();
        self.registry.request_rate(&actor, id, rating)?;
        self.flush()
    }

    /// Passive clock advance. See [`TaskRegistry::tick`].
    pub fn tick(&mut self, id: Uuid, n: u32) -> SessionResult<bool> {
        Ok(self.registry.tick(id, n)?)
    }

    pub fn tick_running(&mut self, n: u32) -> usize {
        self.registry.tick_running(n)
    }

    /// Applies a confirmation that arrived from the remote side.
    pub fn reconcile(&mut self, report: &Reconciliation) -> SessionResult<bool> {
        let changed = self.registry.reconcile(report)?;
        // Reconciled changes came from the remote side; nothing to push.
        self.flush()?;
        Ok(changed)
    }

    /// Pushes every unconfirmed task again. Returns how many went through.
    pub fn retry_unconfirmed(&mut self) -> SessionResult<usize> {
        let mut pushed = 0;
        let mut last_failure = None;
        for id in self.registry.unconfirmed() {
            let Some(view) = self.registry.view(id) else {
                continue;
            };
            match self.sink.persist(&view.task.to_record()) {
                Ok(()) => {
                    self.registry.mark_unconfirmed(id, None)?;
                    pushed += 1;
                }
                Err(e) => {
                    tracing::warn!(task = %id, error = %e, "retry failed");
                    self.registry.mark_unconfirmed(id, Some(e.to_string()))?;
                    last_failure = Some(e);
                }
            }
        }
        match last_failure {
            Some(e) => Err(SessionError::Persist(e)),
            None => Ok(pushed),
        }
    }

    /// The session's view, gated on the current actor.
    pub fn snapshot(&self) -> SessionResult<Vec<TaskView>> {
        let actor = self.actors.current_actor();
        Ok(self.registry.authorized_snapshot(&actor, &self.filter)?)
    }

    /// Change feed for a display, alongside the session's own.
    pub fn subscribe(&mut self) -> mpsc::Receiver<TaskChange> {
        self.registry.subscribe()
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    /// Drains pending changes into the sink.
    ///
    /// Every change is attempted even if an earlier one fails; the first
    /// failure is returned.
    fn flush(&mut self) -> SessionResult<()> {
        let mut first_failure = None;
        while let Ok(change) = self.changes.try_recv() {
            if !change.kind.needs_persist() {
                continue;
            }
            if let Err(e) = self.sink.persist(&change.record) {
                tracing::warn!(task = %change.task_id, error = %e, "persist failed");
                self.registry.mark_unconfirmed(change.task_id, Some(e.to_string()))?;
                first_failure.get_or_insert(e);
            } else {
                tracing::debug!(task = %change.task_id, kind = ?change.kind, "persisted");
            }
        }
        match first_failure {
            Some(e) => Err(SessionError::Persist(e)),
            None => Ok(()),
        }
    }
}
