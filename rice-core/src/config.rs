use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::db::BackendType;
use crate::merge::MatchPolicy;
use crate::storage::STORAGE_KEY;

/// Overrides the config file location
pub const CONFIG_PATH_ENV: &str = "RICE_CONFIG_PATH";
/// Overrides the configured storage path
pub const DB_PATH_ENV: &str = "RICE_DB_PATH";

const APP_DIR: &str = "rice-prioritizer";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to determine the user configuration directory")]
    NoConfigDir,

    #[error("Failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("Failed to write config file {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] serde_yaml::Error),
}

/// User configuration, stored as YAML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory (file backend) or database file (SQLite backend)
    pub storage_path: PathBuf,
    /// Inferred from `storage_path` when unset
    pub backend: Option<BackendType>,
    pub storage_key: String,
    pub match_policy: MatchPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_path: default_storage_path(),
            backend: None,
            storage_key: STORAGE_KEY.to_string(),
            match_policy: MatchPolicy::default(),
        }
    }
}

/// `<data dir>/rice-prioritizer/store`, or a relative directory when there is no data dir
pub fn default_storage_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from(format!(".{}", APP_DIR)))
        .join("store")
}

/// Gets the path to the config file
pub fn config_path() -> Result<PathBuf, ConfigError> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        return Ok(PathBuf::from(path));
    }

    let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
    Ok(config_dir.join(APP_DIR).join("config.yaml"))
}

impl Config {
    /// Loads the config at `path`; a missing file yields the defaults
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No config file at {:?}, using defaults", path);
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads the user config and applies environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        let config = Self::load_from(config_path()?)?;
        Ok(config.with_db_path(std::env::var(DB_PATH_ENV).ok()))
    }

    /// Replaces the storage path when `db_path` is set and non-empty
    pub fn with_db_path(mut self, db_path: Option<String>) -> Self {
        if let Some(path) = db_path.filter(|p| !p.trim().is_empty()) {
            self.storage_path = PathBuf::from(path);
        }
        self
    }

    /// Save the config to the specified path
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = serde_yaml::to_string(self)?;

        let write = || -> std::io::Result<()> {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, content)
        };
        write().map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_config_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load_from(temp_dir.path().join("config.yaml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.storage_key, "rice_prioritizer_v1");
        assert_eq!(config.match_policy, MatchPolicy::IdOrName);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        fs::write(&path, "backend: sqlite\nmatch_policy: id-only\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.backend, Some(BackendType::Sqlite));
        assert_eq!(config.match_policy, MatchPolicy::IdOnly);
        assert_eq!(config.storage_key, STORAGE_KEY);
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        fs::write(&path, "match_policy: [1, 2]\n").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_save_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested/config.yaml");
        let config = Config {
            storage_path: temp_dir.path().join("rice.db"),
            backend: Some(BackendType::Sqlite),
            storage_key: "other".to_string(),
            match_policy: MatchPolicy::IdOnly,
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_db_path_override() {
        let config = Config::default().with_db_path(Some("/tmp/rice.db".to_string()));
        assert_eq!(config.storage_path, PathBuf::from("/tmp/rice.db"));

        let unchanged = Config::default().with_db_path(Some("  ".to_string()));
        assert_eq!(unchanged.storage_path, default_storage_path());
    }
}
