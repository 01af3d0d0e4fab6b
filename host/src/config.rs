//! Host configuration.
//!
//! Read from a YAML file next to the project, for example:
//!
//! ```yaml
//! project_root: /path/to/game
//! log_filter: gdort_onnx=debug,info
//! runner:
//!   log_level: error
//!   session:
//!     intra_op_threads: 1
//! ```

use std::path::{Path, PathBuf};

use gdort_onnx::RunnerOptions;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::paths::ProjectPaths;

/// Default configuration filename.
pub const DEFAULT_CONFIG_FILE: &str = "gdort.yaml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Directory `res://` paths resolve against.
    pub project_root: PathBuf,

    /// Directory `user://` paths resolve against. Defaults to the platform
    /// data directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_dir: Option<PathBuf>,

    /// `tracing` filter directive; logging is left alone when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_filter: Option<String>,

    pub runner: RunnerOptions,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            project_root: PathBuf::from("."),
            user_dir: None,
            log_filter: None,
            runner: RunnerOptions::default(),
        }
    }
}

impl HostConfig {
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(s)?;
        // Re-validate the runner section through its own loader.
        RunnerOptions::from_yaml_str(&serde_yaml::to_string(&config.runner)?)?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    /// Loads `gdort.yaml` from `dir`, or returns defaults rooted at `dir`
    /// when the file does not exist.
    pub fn load_or_default(dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let dir = dir.as_ref();
        let path = dir.join(DEFAULT_CONFIG_FILE);
        if !path.exists() {
            return Ok(Self {
                project_root: dir.to_path_buf(),
                ..Self::default()
            });
        }
        Self::load(path)
    }

    pub fn paths(&self) -> ProjectPaths {
        let user_dir = self.user_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|d| d.join("gdort"))
                .unwrap_or_else(|| self.project_root.join(".user"))
        });
        ProjectPaths::new(self.project_root.clone(), user_dir)
    }
}
