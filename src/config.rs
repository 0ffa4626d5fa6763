//! Runtime configuration: built-in defaults, then an optional YAML file named by
//! `CSVAULT_CONFIG`, then individual environment variables.

use std::env;
use std::fs;
use std::path::PathBuf;

use serde::Deserialize;

use crate::data::storage::{FileBackend, DEFAULT_HISTORY_KEY};

pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub bind_addr: String,
    pub history_key: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    data_dir: Option<PathBuf>,
    bind_addr: Option<String>,
    history_key: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            history_key: DEFAULT_HISTORY_KEY.to_string(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(|key| env::var(key).ok())
    }

    /// Same as [`AppConfig::load`] with an injectable variable lookup.
    pub fn load_from(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut cfg = Self::default();

        if let Some(path) = lookup("CSVAULT_CONFIG") {
            cfg.apply_file(&path)?;
        }
        if let Some(dir) = lookup("CSVAULT_DATA_DIR") {
            cfg.data_dir = PathBuf::from(dir);
        }
        if let Some(bind) = lookup("CSVAULT_BIND") {
            cfg.bind_addr = bind;
        }
        if let Some(key) = lookup("CSVAULT_HISTORY_KEY") {
            cfg.history_key = key;
        }

        cfg.check()?;
        Ok(cfg)
    }

    fn apply_file(&mut self, path: &str) -> Result<(), ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        let file: FileConfig = serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })?;
        if let Some(dir) = file.data_dir {
            self.data_dir = dir;
        }
        if let Some(bind) = file.bind_addr {
            self.bind_addr = bind;
        }
        if let Some(key) = file.history_key {
            self.history_key = key;
        }
        Ok(())
    }

    fn check(&self) -> Result<(), ConfigError> {
        let key = self.history_key.trim();
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            return Err(ConfigError::InvalidValue {
                key: "history_key",
                reason: format!("'{}' is not a plain file stem", self.history_key),
            });
        }
        if self.bind_addr.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "bind_addr",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn history_backend(&self) -> FileBackend {
        FileBackend::new(&self.data_dir, &self.history_key)
    }
}
