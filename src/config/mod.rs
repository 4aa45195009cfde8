//! Runtime settings, read from `config.json` with environment overrides.

use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::progress::ProgressThrottle;

mod error;

pub use error::{ConfigError, ConfigErrorCode, ConfigResult};

const APP_DIR: &str = "respaste";
const CONFIG_FILENAME: &str = "config.json";

pub const ENV_LOG_LEVEL: &str = "RESPASTE_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "RESPASTE_LOG_DIR";
pub const ENV_PROPERTY_DB: &str = "RESPASTE_PROPERTY_DB";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// tracing filter directive, e.g. `info` or `respaste=debug`.
    pub log_level: String,
    pub log_dir: PathBuf,
    /// Property database; `None` keeps it inside the workspace.
    pub property_db: Option<PathBuf>,
    pub copy_buffer_size: usize,
    pub progress_step_bytes: u64,
    pub progress_interval_ms: u64,
}

fn default_log_dir() -> PathBuf {
    dirs_next::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
        .join("logs")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: default_log_dir(),
            property_db: None,
            copy_buffer_size: 512 * 1024,
            progress_step_bytes: 64 * 1024,
            progress_interval_ms: 200,
        }
    }
}

/// `<config_dir>/respaste/config.json`, when the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs_next::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILENAME))
}

impl Config {
    /// Reads `explicit` (which must exist), else the default config file if
    /// present, else defaults. Environment overrides apply on top.
    pub fn load(explicit: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path() {
                Some(path) if path.is_file() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::from_io_error(format!("Failed to read config {}", path.display()), e)
        })?;
        let config: Config = serde_json::from_str(&content).map_err(|e| {
            ConfigError::new(
                ConfigErrorCode::ParseFailed,
                format!("Failed to parse config {}: {e}", path.display()),
            )
        })?;
        debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    /// Applies the `RESPASTE_*` overrides through `lookup`. Empty values are
    /// ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        if let Some(level) = get(ENV_LOG_LEVEL) {
            self.log_level = level;
        }
        if let Some(dir) = get(ENV_LOG_DIR) {
            self.log_dir = PathBuf::from(dir);
        }
        if let Some(db) = get(ENV_PROPERTY_DB) {
            self.property_db = Some(PathBuf::from(db));
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        EnvFilter::try_new(&self.log_level)
            .map_err(|e| ConfigError::invalid_value("log_level", e))?;
        if self.copy_buffer_size == 0 {
            return Err(ConfigError::invalid_value(
                "copy_buffer_size",
                "must be greater than zero",
            ));
        }
        if self.progress_step_bytes == 0 {
            return Err(ConfigError::invalid_value(
                "progress_step_bytes",
                "must be greater than zero",
            ));
        }
        if self.log_dir.as_os_str().is_empty() {
            return Err(ConfigError::invalid_value("log_dir", "must not be empty"));
        }
        Ok(())
    }

    pub fn throttle(&self) -> ProgressThrottle {
        ProgressThrottle {
            step_bytes: self.progress_step_bytes,
            interval: Duration::from_millis(self.progress_interval_ms),
        }
    }
}
