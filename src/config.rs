use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const CONFIG_FILE: &str = "taskboard.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database_path: PathBuf,
    pub log_path: PathBuf,
    pub log_filter: String,
    pub reminder_interval_secs: u64,
    pub reminder_window_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("tasks.db"),
            log_path: PathBuf::from("taskboard.log"),
            log_filter: "info".to_string(),
            reminder_interval_secs: 60,
            reminder_window_secs: 300,
        }
    }
}

impl Config {
    /// Reads the config file, falling back to defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(path)?;
        serde_json::from_str(&data).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Writes the default config to `path`. Returns `false` if a file is already there.
    pub fn init(path: &Path) -> Result<bool> {
        if path.exists() {
            return Ok(false);
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(&Self::default()).map_err(|source| {
            Error::Config {
                path: path.to_path_buf(),
                source,
            }
        })?;
        fs::write(path, data)?;
        Ok(true)
    }

    pub fn reminder_interval(&self) -> Duration {
        Duration::from_secs(self.reminder_interval_secs.max(1))
    }

    pub fn reminder_window(&self) -> Duration {
        Duration::from_secs(self.reminder_window_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.reminder_interval(), Duration::from_secs(60));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, r#"{ "database_path": "board.db", "reminder_window_secs": 120 }"#).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.database_path, PathBuf::from("board.db"));
        assert_eq!(config.reminder_window(), Duration::from_secs(120));
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn init_does_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        assert!(Config::init(&path).unwrap());
        assert_eq!(Config::load(&path).unwrap(), Config::default());

        fs::write(&path, r#"{ "log_filter": "debug" }"#).unwrap();
        assert!(!Config::init(&path).unwrap());
        assert_eq!(Config::load(&path).unwrap().log_filter, "debug");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Config::load(&path), Err(Error::Config { .. })));
    }
}
