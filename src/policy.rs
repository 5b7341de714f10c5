//! Permission policy: may this actor perform this action?
//!
//! The decision uses only the actor value passed in. There is no ambient
//! session state to consult, so the same actor always gets the same answer.
//!
//! 1. `admin` and `superadmin` may do anything.
//! 2. `employee` and `hr` need a grant with the exact action code and `access = true`.
//! 3. No matching grant, or a role nobody recognizes, means no.

use crate::error::{Result, TaskError};
use crate::model::{ActionCode, Actor, Role};

/// Evaluates the policy for a raw action code.
pub fn is_allowed(actor: &Actor, action_code: &str) -> bool {
    match actor.role {
        Role::Admin | Role::Superadmin => return true,
        Role::Employee | Role::Hr => {}
        Role::Other(_) => return false,
    }
    actor
        .grants
        .iter()
        .any(|g| g.access && g.action_code == action_code)
}

/// Like [`is_allowed`], as a result the registry can propagate.
pub fn authorize(actor: &Actor, action: ActionCode) -> Result<()> {
    if is_allowed(actor, action.code()) {
        return Ok(());
    }
    tracing::warn!(
        role = %actor.role,
        actor = actor.name.as_deref().unwrap_or("-"),
        action = %action,
        "permission denied"
    );
    Err(TaskError::PermissionDenied { action })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_CODES: [ActionCode; 6] = [
        ActionCode::StartTask,
        ActionCode::PauseTask,
        ActionCode::CompleteTask,
        ActionCode::RateTask,
        ActionCode::ViewAllTasks,
        ActionCode::AssignTask,
    ];

    #[test]
    fn privileged_roles_pass_everything_without_grants() {
        for role in ["admin", "superadmin", "Admin", "SUPERADMIN"] {
            let actor = Actor::new(Role::from(role));
            for code in ALL_CODES {
                assert!(is_allowed(&actor, code.code()), "{role} {code}");
            }
            assert!(is_allowed(&actor, "ANYTHING-Else"));
        }
    }

    #[test]
    fn privileged_roles_ignore_explicit_denials() {
        let actor = Actor::new(Role::Admin).grant(ActionCode::StartTask, false);
        assert!(is_allowed(&actor, "TASK-Start"));
    }

    #[test]
    fn employee_without_grant_is_denied() {
        let actor = Actor::new(Role::Employee);
        for code in ALL_CODES {
            assert!(!is_allowed(&actor, code.code()));
        }
    }

    #[test]
    fn employee_with_grant_is_allowed_for_that_code_only() {
        let actor = Actor::new(Role::Employee).grant(ActionCode::StartTask, true);
        assert!(is_allowed(&actor, "TASK-Start"));
        assert!(!is_allowed(&actor, "TASK-Pause"));
    }

    #[test]
    fn false_grant_denies() {
        let actor = Actor::new(Role::Hr).grant(ActionCode::PauseTask, false);
        assert!(!is_allowed(&actor, "TASK-Pause"));
    }

    #[test]
    fn codes_match_exactly() {
        let actor = Actor::new(Role::Employee).grant("task-start", true);
        assert!(!is_allowed(&actor, "TASK-Start"));
    }

    #[test]
    fn empty_and_unknown_actors_fail_closed() {
        assert!(!is_allowed(&Actor::default(), "TASK-Start"));
        assert!(!is_allowed(&Actor::default(), ""));
        assert!(!is_allowed(&Actor::new(Role::from("root")), "TASK-Start"));
    }

    #[test]
    fn unknown_role_is_denied_even_with_grants() {
        let actor = Actor::new(Role::from("contractor")).grant(ActionCode::StartTask, true);
        assert!(!is_allowed(&actor, "TASK-Start"));
    }

    #[test]
    fn authorize_reports_the_action() {
        let err = authorize(&Actor::new(Role::Employee), ActionCode::RateTask).unwrap_err();
        assert_eq!(
            err,
            TaskError::PermissionDenied {
                action: ActionCode::RateTask
            }
        );
        assert!(authorize(&Actor::new(Role::Superadmin), ActionCode::RateTask).is_ok());
    }
}
