//! `scope.toml` loading.
//!
//! ```toml
//! [runner]
//! max_concurrency = 16
//! task_timeout_secs = 30
//!
//! [log]
//! level = "debug"
//!
//! [parameters.PortScanPreparation]
//! SkipCdn = "-suffixes cdn.example.net"
//! ```

use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::debug;

pub const CONFIG_FILE: &str = "scope.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunnerConfig {
    /// Upper bound on plugin clones executing at once
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Deadline for a single execution, unbounded when unset
    #[serde(default)]
    pub task_timeout_secs: Option<u64>,
}

fn default_max_concurrency() -> usize {
    32
}

impl RunnerConfig {
    pub fn task_timeout(&self) -> Option<Duration> {
        self.task_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            task_timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub runner: RunnerConfig,

    #[serde(default)]
    pub log: LogConfig,

    /// Raw parameter strings keyed by module, then plugin name
    #[serde(default)]
    pub parameters: HashMap<String, HashMap<String, String>>,
}

impl Config {
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(config_path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        if config.runner.max_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "runner.max_concurrency must be at least 1".to_string(),
            ));
        }
        if config.runner.max_concurrency > Semaphore::MAX_PERMITS {
            return Err(ConfigError::Invalid(format!(
                "runner.max_concurrency must be at most {}",
                Semaphore::MAX_PERMITS
            )));
        }
        if config.runner.task_timeout_secs == Some(0) {
            return Err(ConfigError::Invalid(
                "runner.task_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(config)
    }

    /// Load the nearest `scope.toml` from the current directory or one of
    /// its parents. Defaults apply when there is none.
    pub fn from_project_root() -> Result<Self, ConfigError> {
        let current_dir = std::env::current_dir()?;
        match find_config(&current_dir) {
            Some(path) => {
                debug!(path = %path.display(), "Loading config");
                Self::load(path)
            }
            None => {
                debug!("No {} found, using defaults", CONFIG_FILE);
                Ok(Self::default())
            }
        }
    }

    /// Configured parameter for a plugin, if any
    pub fn parameter_for(&self, module: &str, plugin: &str) -> Option<&str> {
        self.parameters
            .get(module)
            .and_then(|plugins| plugins.get(plugin))
            .map(String::as_str)
    }
}

fn find_config(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILE))
        .find(|path| path.is_file())
}
