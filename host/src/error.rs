use std::path::PathBuf;

use gdort_onnx::OnnxError;
use thiserror::Error;

use crate::object::ObjectId;

/// Errors raised while dispatching a script call.
#[derive(Debug, Error)]
pub enum CallError {
    #[error("host: invalid object {0}")]
    InvalidObject(ObjectId),

    #[error("host: class {0:?} is not registered")]
    ClassNotRegistered(String),

    #[error("host: class {class:?} has no method {method:?}")]
    InvalidMethod { class: String, method: String },

    #[error("host: {method}() takes {expected} arguments, got {got}")]
    ArgumentCount {
        method: String,
        expected: usize,
        got: usize,
    },

    #[error("host: {method}() argument {index} must be {expected}, got {got}")]
    InvalidArgument {
        method: String,
        index: usize,
        expected: &'static str,
        got: &'static str,
    },

    #[error("host: singleton {0:?} already registered")]
    SingletonExists(String),

    #[error("host: no singleton named {0:?}")]
    NoSingleton(String),
}

/// Errors loading the host configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config: read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("config: {0}")]
    Runner(#[from] OnnxError),
}
