//! Actor types: who is acting and what they have been granted.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The operator performing actions for the current session.
///
/// Rebuilt from the actor source on every check, so a changed role or
/// grant takes effect on the next action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Employee name, when the actor is also an assignee.
    /// Lets an actor see their own tasks without the view-all grant.
    #[serde(default)]
    pub name: Option<String>,

    pub role: Role,

    #[serde(default)]
    pub grants: Vec<PermissionGrant>,
}

impl Actor {
    pub fn new(role: Role) -> Self {
        Self {
            name: None,
            role,
            grants: Vec::new(),
        }
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn grant(mut self, action_code: impl Into<String>, access: bool) -> Self {
        self.grants.push(PermissionGrant {
            action_code: action_code.into(),
            access,
        });
        self
    }
}

/// Where an actor sits in the organization.
///
/// Parsed case-insensitively. Anything unrecognized is kept as `Other`
/// and carries no privileges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Employee,
    Hr,
    Admin,
    Superadmin,
    Other(String),
}

impl Role {
    /// Privilege order. `employee` and `hr` both rely on grants, so they
    /// rank the same; an unrecognized role ranks below everything.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Other(_) => 0,
            Self::Employee | Self::Hr => 1,
            Self::Admin => 2,
            Self::Superadmin => 3,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Employee => "employee",
            Self::Hr => "hr",
            Self::Admin => "admin",
            Self::Superadmin => "superadmin",
            Self::Other(s) => s,
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl From<&str> for Role {
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "employee" => Self::Employee,
            "hr" => Self::Hr,
            "admin" => Self::Admin,
            "superadmin" => Self::Superadmin,
            _ => Self::Other(s.to_string()),
        }
    }
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One explicit grant. Absence of a grant means denial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionGrant {
    pub action_code: String,
    pub access: bool,
}

/// Gated operations, each with a distinct action code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionCode {
    StartTask,
    PauseTask,
    CompleteTask,
    RateTask,
    /// See tasks of other employees (the manager view).
    ViewAllTasks,
    /// Put a new task on an employee's list.
    AssignTask,
}

impl ActionCode {
    pub fn code(self) -> &'static str {
        match self {
            Self::StartTask => "TASK-Start",
            Self::PauseTask => "TASK-Pause",
            Self::CompleteTask => "TASK-Complete",
            Self::RateTask => "TASK-Rate",
            Self::ViewAllTasks => "TASK-ViewAll",
            Self::AssignTask => "TASK-Assign",
        }
    }
}

impl From<ActionCode> for String {
    fn from(action: ActionCode) -> Self {
        action.code().to_string()
    }
}

impl fmt::Display for ActionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!(Role::from("ADMIN"), Role::Admin);
        assert_eq!(Role::from(" SuperAdmin "), Role::Superadmin);
        assert_eq!(Role::from("Hr"), Role::Hr);
        assert_eq!(Role::from("intern"), Role::Other("intern".into()));
    }

    #[test]
    fn role_rank_orders_privilege() {
        assert!(Role::Other("intern".into()).rank() < Role::Employee.rank());
        assert_eq!(Role::Employee.rank(), Role::Hr.rank());
        assert!(Role::Hr.rank() < Role::Admin.rank());
        assert!(Role::Admin.rank() < Role::Superadmin.rank());
    }

    #[test]
    fn role_round_trips_through_json_as_string() {
        let actor = Actor::new(Role::Hr).grant(ActionCode::StartTask, true);
        let json = serde_json::to_string(&actor).unwrap();
        assert!(json.contains(r#""role":"hr""#));
        assert!(json.contains(r#""actionCode":"TASK-Start""#));

        let back: Actor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, actor);
    }

    #[test]
    fn missing_fields_deserialize_to_unprivileged_actor() {
        let actor: Actor = serde_json::from_str(r#"{"role":""}"#).unwrap();
        assert_eq!(actor.role, Role::Other(String::new()));
        assert!(actor.grants.is_empty());
    }
}
