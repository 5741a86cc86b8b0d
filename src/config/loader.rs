//! Configuration file loader.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::supervisor::DEFAULT_DEBOUNCE;
use crate::watcher::{DEFAULT_DEPENDENCY_DIR, DEFAULT_EVENT_TICK};

/// Settings loaded from a TOML file. Every key is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Quiet period before a restart, in milliseconds.
    pub debounce_ms: u64,
    /// Watch paths inside dependency directories.
    pub dependency_trees: bool,
    /// Directory names treated as dependency trees.
    pub dependency_dir_names: Vec<String>,
    /// Watch reported paths outside the working directory.
    pub watch_outside_working_dir: bool,
    /// Interpreter used to run the entry.
    pub runtime: Option<String>,
    /// Flags always passed to the runtime.
    pub runtime_args: Vec<String>,
    /// Runtime flags that load the path reporter into the child.
    pub reporter_args: Vec<String>,
    /// Force-kill a child this long after SIGTERM.
    pub kill_timeout_ms: Option<u64>,
    /// Event stitching window of the change source, in milliseconds.
    pub event_tick_ms: u64,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            debounce_ms: u64::try_from(DEFAULT_DEBOUNCE.as_millis()).unwrap_or(1000),
            dependency_trees: false,
            dependency_dir_names: vec![DEFAULT_DEPENDENCY_DIR.to_string()],
            watch_outside_working_dir: false,
            runtime: None,
            runtime_args: Vec::new(),
            reporter_args: Vec::new(),
            kill_timeout_ms: None,
            event_tick_ms: u64::try_from(DEFAULT_EVENT_TICK.as_millis()).unwrap_or(50),
        }
    }
}

/// Configuration loader that searches multiple locations.
#[derive(Debug)]
pub struct ConfigLoader {
    /// Search paths in order of priority.
    search_paths: Vec<PathBuf>,
    /// An explicitly requested file must exist.
    explicit: bool,
}

impl ConfigLoader {
    /// Create a new config loader with default search paths.
    #[must_use]
    pub fn new() -> Self {
        let mut search_paths = Vec::new();

        // 1. Current directory: .hotwire.toml
        search_paths.push(PathBuf::from(".hotwire.toml"));

        // 2. User config directory: ~/.config/hotwire/config.toml
        if let Some(config_dir) = dirs::config_dir() {
            search_paths.push(config_dir.join("hotwire").join("config.toml"));
        }

        Self {
            search_paths,
            explicit: false,
        }
    }

    /// Create a config loader with a specific config file path.
    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            search_paths: vec![path],
            explicit: true,
        }
    }

    /// Load configuration from the first available file, or return defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be parsed, or if an
    /// explicitly requested file does not exist.
    pub fn load(&self) -> Result<FileConfig, ConfigError> {
        if let Some(path) = self.find_config_file() {
            tracing::debug!(path = %path.display(), "Loading config file");
            return Self::load_from_path(&path);
        }

        if self.explicit {
            if let Some(path) = self.search_paths.first() {
                return Err(ConfigError::ReadError {
                    path: path.clone(),
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                });
            }
        }

        tracing::debug!("No config file found, using defaults");
        Ok(FileConfig::default())
    }

    /// Load configuration from a specific path.
    fn load_from_path(path: &Path) -> Result<FileConfig, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the search paths for debugging.
    #[must_use]
    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Find the first config file that exists.
    #[must_use]
    pub fn find_config_file(&self) -> Option<PathBuf> {
        self.search_paths.iter().find(|p| p.exists()).cloned()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur during configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
