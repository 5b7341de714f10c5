//! Actor resolution for tasktally commands.
//!
//! Every mutating command needs to know who is acting and what they may do.
//! Name, role, and grants come from `~/.tasktally/config.toml`, re-read on
//! every call so an edited grant applies to the very next action.
//!
//! The configured role can be narrowed for one invocation:
//!
//! 1. `--role <role>` — explicit per-invocation override
//! 2. `TASKTALLY_ROLE` env var — process/session level
//!
//! An override only ever lowers privilege. Asking for a role above the
//! configured one keeps the configured role.

use std::env;
use std::path::PathBuf;

use crate::config::Config;
use crate::model::{Actor, Role};
use crate::sync::ActorSource;

/// Environment variable overriding the configured role.
pub const ROLE_ENV: &str = "TASKTALLY_ROLE";

/// Resolves the acting [`Actor`] from the config file on every call.
pub struct ConfiguredActor {
    config_path: Option<PathBuf>,
    explicit_role: Option<String>,
}

impl ConfiguredActor {
    pub fn new(config_path: Option<PathBuf>, explicit_role: Option<String>) -> Self {
        Self {
            config_path,
            explicit_role,
        }
    }

    /// Uses `~/.tasktally/config.toml`.
    pub fn from_default_path(explicit_role: Option<String>) -> Self {
        Self::new(Config::path(), explicit_role)
    }

    fn resolve_role(&self, configured: Role) -> Role {
        let requested = self.requested_role();
        match requested {
            Some(role) if role.rank() <= configured.rank() => role,
            Some(role) => {
                tracing::warn!(
                    requested = %role,
                    configured = %configured,
                    "role override above configured role ignored"
                );
                configured
            }
            None => configured,
        }
    }

    fn requested_role(&self) -> Option<Role> {
        // 1. Explicit --role flag.
        if let Some(role) = self.explicit_role.as_deref() {
            return Some(Role::from(role));
        }

        // 2. TASKTALLY_ROLE environment variable.
        if let Ok(role) = env::var(ROLE_ENV)
            && !role.is_empty()
        {
            return Some(Role::from(role));
        }

        None
    }
}

impl ActorSource for ConfiguredActor {
    /// An unreadable config yields the empty actor, which is denied
    /// every gated action.
    fn current_actor(&self) -> Actor {
        let config = match &self.config_path {
            Some(path) => Config::load_from(path).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "falling back to an actor with no grants");
                Config::default()
            }),
            None => Config::default(),
        };
        let mut actor = config.actor.to_actor();
        actor.role = self.resolve_role(actor.role);
        actor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    use tempfile::TempDir;

    use crate::model::ActionCode;
    use crate::policy;

    fn write_config(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        fs::write(&path, body).unwrap();
        path
    }

    // An explicit role never consults the environment, so these are safe
    // to run alongside other tests.

    #[test]
    fn explicit_role_can_lower_privilege() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[actor]\nrole = \"superadmin\"\n");
        let source = ConfiguredActor::new(Some(path), Some("employee".into()));

        let actor = source.current_actor();
        assert_eq!(actor.role, Role::Employee);
        assert!(!policy::is_allowed(&actor, ActionCode::CompleteTask.code()));
    }

    #[test]
    fn explicit_role_cannot_raise_privilege() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[actor]\nrole = \"employee\"\n");
        let source = ConfiguredActor::new(Some(path), Some("superadmin".into()));

        let actor = source.current_actor();
        assert_eq!(actor.role, Role::Employee);
        assert!(policy::authorize(&actor, ActionCode::AssignTask).is_err());
    }

    #[test]
    fn explicit_role_without_config_stays_unprivileged() {
        let dir = TempDir::new().unwrap();
        let source = ConfiguredActor::new(
            Some(dir.path().join("config.toml")),
            Some("superadmin".into()),
        );

        let actor = source.current_actor();
        assert!(actor.grants.is_empty());
        assert!(policy::authorize(&actor, ActionCode::AssignTask).is_err());
    }

    #[test]
    fn grant_edits_apply_on_next_call() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[actor]\nrole = \"hr\"\n");
        let source = ConfiguredActor::new(Some(path.clone()), Some("hr".into()));
        assert!(!policy::is_allowed(&source.current_actor(), "TASK-Start"));

        fs::write(
            &path,
            "[actor]\nrole = \"hr\"\n[actor.grants]\n\"TASK-Start\" = true\n",
        )
        .unwrap();
        assert!(policy::is_allowed(&source.current_actor(), "TASK-Start"));
    }

    #[test]
    fn broken_config_fails_closed() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "not = [valid");
        let source = ConfiguredActor::new(Some(path), Some("employee".into()));

        let actor = source.current_actor();
        assert!(actor.grants.is_empty());
        assert!(!policy::is_allowed(&actor, "TASK-Start"));
    }
}
