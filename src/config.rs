//! Optional TOML configuration.
//!
//! Resolution: explicit path (`--config`), then `PMS_CONFIG`, then
//! `<config dir>/pms/config.toml`. Only an explicitly named file must exist.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::client::{EndpointProfile, EndpointTable};
use crate::session::default_session_path;

pub const ENV_PMS_CONFIG: &str = "PMS_CONFIG";

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:3000";
const DEFAULT_PROFILE: &str = "nodejs";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("unknown endpoint profile {name:?} (available: {available})")]
    UnknownProfile { name: String, available: String },
    #[error("{0}")]
    Message(String),
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_profile() -> String {
    DEFAULT_PROFILE.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_profile")]
    pub profile: String,
    /// Unset means requests never time out.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub session_file: Option<PathBuf>,
    /// Backend storage directory (database and uploads).
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub profiles: BTreeMap<String, EndpointProfile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            profile: default_profile(),
            request_timeout_secs: None,
            session_file: None,
            data_dir: None,
            profiles: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Load using the resolution order above.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load_from_path(path);
        }
        match std::env::var(ENV_PMS_CONFIG) {
            Ok(raw) if !raw.trim().is_empty() => return Self::load_from_path(Path::new(&raw)),
            Ok(_) | Err(std::env::VarError::NotPresent) => {}
            Err(_) => {
                return Err(ConfigError::Message(format!(
                    "{ENV_PMS_CONFIG} contained invalid UTF-8"
                )))
            }
        }
        match default_config_path() {
            Some(path) if path.exists() => Self::load_from_path(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    pub fn endpoint_table(&self) -> EndpointTable {
        EndpointTable::with_overrides(self.profiles.clone())
    }

    /// The active endpoint profile.
    pub fn endpoint_profile(&self) -> Result<EndpointProfile, ConfigError> {
        let table = self.endpoint_table();
        table
            .get(&self.profile)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownProfile {
                name: self.profile.clone(),
                available: table.names().collect::<Vec<_>>().join(", "),
            })
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn session_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.session_file {
            Some(path) => Ok(path.clone()),
            None => default_session_path().map_err(|e| ConfigError::Message(e.to_string())),
        }
    }

    /// Backend data directory, defaulting to the platform data dir.
    pub fn data_dir(&self) -> Result<PathBuf, ConfigError> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        directories::ProjectDirs::from("", "", "pms")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or_else(|| ConfigError::Message("could not determine data directory".into()))
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|dirs| dirs.config_dir().join("pms").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::IdPlacement;

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.base_url, "http://127.0.0.1:3000");
        assert!(config.request_timeout().is_none());
        assert_eq!(config.endpoint_profile().unwrap(), EndpointProfile::nodejs());
    }

    #[test]
    fn selects_and_overrides_profiles() {
        let config = Config::parse(
            r#"
            base_url = "http://legacy.local"
            profile = "legacy"
            request_timeout_secs = 15

            [profiles.legacy]
            projects = "projects.php"
            users = "users.php"
            tasks = "tasks.php"
            upload = "upload.php"
            id_placement = "body"
            "#,
        )
        .unwrap();
        let profile = config.endpoint_profile().unwrap();
        assert_eq!(profile.projects, "projects.php");
        assert_eq!(profile.id_placement, IdPlacement::Body);
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(15)));
    }

    #[test]
    fn unknown_profile_is_an_error() {
        let config = Config {
            profile: "ruby".into(),
            ..Config::default()
        };
        let err = config.endpoint_profile().unwrap_err();
        assert!(err.to_string().contains("nodejs, php"));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(
            Config::load(Some(&missing)),
            Err(ConfigError::Read { .. })
        ));
    }
}
