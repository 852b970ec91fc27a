//! Session configuration.
//!
//! Every field has a default, so an empty JSON object is a valid config.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::commands::View;
use crate::constants::{DEFAULT_COMMAND, FALLBACK_DELAY, HOTKEY_THROTTLE};

/// Path of a JSON config file to load instead of the defaults.
pub const CONFIG_ENV: &str = "BLOCKTREE_CONFIG";
/// Overrides `store_path`.
pub const DB_ENV: &str = "BLOCKTREE_DB";
/// Any value forces the in-memory store.
pub const IN_MEMORY_ENV: &str = "BLOCKTREE_IN_MEMORY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("invalid config {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("unknown default command: {0}")]
    UnknownDefaultCommand(String),
}

/// Where navigation state is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    Memory,
    Path(PathBuf),
    /// `~/.blocktree/blocktree.db`.
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Key-repeat throttle window for hotkeys.
    pub throttle_ms: u64,
    /// Delay before re-arming the default command after a mode mismatch.
    pub fallback_ms: u64,
    pub default_command: String,
    pub view: View,
    /// Capacity of the outbound event channel.
    pub event_capacity: usize,
    /// SQLite database; `None` uses the default location.
    pub store_path: Option<PathBuf>,
    /// Keep everything in memory, ignoring `store_path`.
    pub in_memory: bool,
    /// How often the session task checks for due transitions.
    pub tick_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            throttle_ms: HOTKEY_THROTTLE.as_millis() as u64,
            fallback_ms: FALLBACK_DELAY.as_millis() as u64,
            default_command: DEFAULT_COMMAND.to_string(),
            view: View::Full,
            event_capacity: 256,
            store_path: None,
            in_memory: false,
            tick_ms: 10,
        }
    }
}

impl SessionConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Defaults, or the file named by `BLOCKTREE_CONFIG`, with
    /// `BLOCKTREE_DB` and `BLOCKTREE_IN_MEMORY` applied on top.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load(Path::new(&path))?,
            None => Self::default(),
        };
        if let Some(db) = std::env::var_os(DB_ENV) {
            config.store_path = Some(PathBuf::from(db));
        }
        if std::env::var_os(IN_MEMORY_ENV).is_some() {
            config.in_memory = true;
        }
        Ok(config)
    }

    pub fn store_location(&self) -> StoreLocation {
        match (&self.store_path, self.in_memory) {
            (_, true) => StoreLocation::Memory,
            (Some(path), false) => StoreLocation::Path(path.clone()),
            (None, false) => StoreLocation::Default,
        }
    }

    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }

    pub fn fallback_delay(&self) -> Duration {
        Duration::from_millis(self.fallback_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_editor_timings() {
        let config = SessionConfig::default();
        assert_eq!(config.throttle(), Duration::from_millis(250));
        assert_eq!(config.fallback_delay(), Duration::from_millis(50));
        assert_eq!(config.default_command, "openBlock");
        assert_eq!(config.view, View::Full);
    }

    #[test]
    fn store_location_prefers_memory_then_path() {
        let mut config = SessionConfig::default();
        assert_eq!(config.store_location(), StoreLocation::Default);

        config.store_path = Some(PathBuf::from("/tmp/blocktree.db"));
        assert_eq!(
            config.store_location(),
            StoreLocation::Path(PathBuf::from("/tmp/blocktree.db"))
        );

        config.in_memory = true;
        assert_eq!(config.store_location(), StoreLocation::Memory);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"fallback_ms": 80, "view": "shared_link"}}"#).unwrap();

        let config = SessionConfig::load(file.path()).unwrap();
        assert_eq!(config.fallback_ms, 80);
        assert_eq!(config.view, View::SharedLink);
        assert_eq!(config.throttle_ms, 250);
        assert_eq!(config.event_capacity, 256);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            SessionConfig::load(file.path()),
            Err(ConfigError::Json { .. })
        ));
        assert!(matches!(
            SessionConfig::load(Path::new("/nonexistent/blocktree.json")),
            Err(ConfigError::Io { .. })
        ));
    }
}
