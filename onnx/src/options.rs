//! Runner and session options.
//!
//! Options can be built in code or read from YAML:
//!
//! ```yaml
//! env_name: game
//! log_level: error
//! session:
//!   intra_op_threads: 1
//!   graph_optimization: extended
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::OnnxError;

/// Severity threshold for the backend's own log stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Verbose,
    Info,
    #[default]
    Warning,
    Error,
    Fatal,
}

impl LogLevel {
    /// Value of the matching `OrtLoggingLevel`.
    pub fn as_raw(self) -> i32 {
        match self {
            LogLevel::Verbose => 0,
            LogLevel::Info => 1,
            LogLevel::Warning => 2,
            LogLevel::Error => 3,
            LogLevel::Fatal => 4,
        }
    }
}

/// Graph optimization level applied when a model is compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphOptimization {
    Disabled,
    Basic,
    #[default]
    Extended,
    All,
}

impl GraphOptimization {
    /// Value of the matching `GraphOptimizationLevel`.
    pub fn as_raw(self) -> i32 {
        match self {
            GraphOptimization::Disabled => 0,
            GraphOptimization::Basic => 1,
            GraphOptimization::Extended => 2,
            GraphOptimization::All => 99,
        }
    }
}

/// Per-model compile options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    /// Threads used inside a single operator.
    pub intra_op_threads: u32,
    pub graph_optimization: GraphOptimization,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            intra_op_threads: 1,
            graph_optimization: GraphOptimization::Extended,
        }
    }
}

/// Options for a [`Runner`](crate::Runner) and the environment it creates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerOptions {
    /// Log id of the backend environment.
    pub env_name: String,
    pub log_level: LogLevel,
    pub session: SessionOptions,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            env_name: "gdort".to_string(),
            log_level: LogLevel::Warning,
            session: SessionOptions::default(),
        }
    }
}

impl RunnerOptions {
    pub fn from_yaml_str(s: &str) -> Result<Self, OnnxError> {
        let opts: Self = serde_yaml::from_str(s).map_err(|e| OnnxError::Options(e.to_string()))?;
        opts.validate()?;
        Ok(opts)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, OnnxError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| OnnxError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    fn validate(&self) -> Result<(), OnnxError> {
        if self.session.intra_op_threads == 0 {
            return Err(OnnxError::Options("intra_op_threads must be at least 1".into()));
        }
        if self.env_name.is_empty() {
            return Err(OnnxError::Options("env_name must not be empty".into()));
        }
        Ok(())
    }
}
