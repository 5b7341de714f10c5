//! tasktally configuration.
//!
//! Loaded from `~/.tasktally/config.toml`. A missing file means defaults,
//! and the default actor is granted nothing.
//!
//! ```toml
//! data-dir = "/var/lib/tasktally"
//!
//! [actor]
//! name = "Dana"
//! role = "employee"
//!
//! [actor.grants]
//! "TASK-Start" = true
//! "TASK-Pause" = true
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::model::{Actor, Role};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("invalid config at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// tasktally configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Where `tasks.json` and `journal.jsonl` live.
    /// Defaults to `~/.tasktally/data/`.
    pub data_dir: Option<PathBuf>,

    #[serde(default)]
    pub actor: ActorConfig,
}

/// The operator this machine acts as.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ActorConfig {
    pub name: Option<String>,

    #[serde(default)]
    pub role: String,

    /// Action code to access.
    #[serde(default)]
    pub grants: BTreeMap<String, bool>,
}

impl ActorConfig {
    pub fn to_actor(&self) -> Actor {
        let mut actor = Actor::new(Role::from(self.role.as_str()));
        if let Some(name) = self.name.as_deref().filter(|n| !n.is_empty()) {
            actor = actor.named(name);
        }
        self.grants
            .iter()
            .fold(actor, |actor, (code, &access)| actor.grant(code.as_str(), access))
    }
}

impl Config {
    /// Load config from `~/.tasktally/config.toml`, or defaults when the
    /// file or home directory is missing.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load config from an explicit path. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// The config file path: `~/.tasktally/config.toml`.
    pub fn path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".tasktally").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    use crate::model::ActionCode;
    use crate::policy;

    #[test]
    fn missing_file_is_default_and_grants_nothing() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();

        assert!(config.data_dir.is_none());
        let actor = config.actor.to_actor();
        assert!(!policy::is_allowed(&actor, ActionCode::StartTask.code()));
    }

    #[test]
    fn parses_actor_and_grants() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
data-dir = "/tmp/tally"

[actor]
name = "Dana"
role = "Employee"

[actor.grants]
"TASK-Start" = true
"TASK-Pause" = false
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/tally")));

        let actor = config.actor.to_actor();
        assert_eq!(actor.name.as_deref(), Some("Dana"));
        assert_eq!(actor.role, Role::Employee);
        assert!(policy::is_allowed(&actor, "TASK-Start"));
        assert!(!policy::is_allowed(&actor, "TASK-Pause"));
    }

    #[test]
    fn invalid_toml_reports_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[actor\nrole = ").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("config.toml"));
    }
}
