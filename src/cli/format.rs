//! Output formatting for CLI display.

use uuid::Uuid;

use crate::model::{ChangeKind, SyncState, TaskChange, TaskView};

pub(super) fn short_id(id: Uuid) -> String {
    id.to_string()[..8].to_string()
}

/// One line per task: id, status, owner, name, time.
pub(super) fn format_task_line(view: &TaskView) -> String {
    let task = &view.task;
    let time = match (task.finished_in_minutes(), task.open_elapsed()) {
        (Some(finished), _) => format!("finished in {finished}m"),
        (None, Some(open)) => format!(
            "{}m ({open} this run) / {}m planned",
            task.clock().elapsed(),
            task.planned_duration_minutes
        ),
        (None, None) => format!(
            "{}m / {}m planned",
            task.accumulated_minutes(),
            task.planned_duration_minutes
        ),
    };
    let rating = task
        .rating()
        .map(|r| format!("  rated {}/5", r.get()))
        .unwrap_or_default();
    let sync = match &view.sync {
        SyncState::Confirmed => "",
        SyncState::Unconfirmed {
            last_error: Some(_),
            ..
        } => "  (unconfirmed, push failed)",
        SyncState::Unconfirmed { .. } => "  (unconfirmed)",
    };
    format!(
        "{}  [{}]  {}  {}  {time}{rating}{sync}",
        short_id(task.id),
        task.status(),
        task.employee_name,
        task.task_name,
    )
}

pub(super) fn format_change(change: &TaskChange) -> String {
    let verb = match change.kind {
        ChangeKind::Started => "started",
        ChangeKind::Paused => "paused",
        ChangeKind::Completed => "completed",
        ChangeKind::Rated => "rated",
        ChangeKind::Reconciled => "reconciled",
    };
    format!(
        "{} {verb} ({}m accumulated)",
        short_id(change.task_id),
        change.record.accumulated_minutes
    )
}
