use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by runner and session operations.
#[derive(Debug, Error)]
pub enum OnnxError {
    #[error("onnx: model file {0:?} not found")]
    ModelNotFound(PathBuf),

    #[error("onnx: read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("onnx: empty data")]
    EmptyData,

    /// A failure reported by the inference backend.
    #[error("onnx: {context}: {message} ({code})")]
    Backend {
        context: &'static str,
        message: String,
        code: i32,
    },

    #[error("onnx: expected {expected} input tensors, got {got}")]
    InputCount { expected: usize, got: usize },

    #[error("onnx: input {index} ({name}): {got} elements do not fit shape {shape:?}")]
    InputSize {
        index: usize,
        name: String,
        shape: Vec<i64>,
        got: usize,
    },

    #[error("onnx: {kind} index {index} is out of range (0..{count})")]
    IndexOutOfRange {
        kind: &'static str,
        index: usize,
        count: usize,
    },

    #[error("onnx: options: {0}")]
    Options(String),

    #[error("onnx: {0}")]
    Runtime(String),
}

impl OnnxError {
    /// Returns the backend error code, if this error came from the backend.
    pub fn code(&self) -> Option<i32> {
        match self {
            OnnxError::Backend { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// True for errors detected before the backend was invoked.
    pub fn is_shape_error(&self) -> bool {
        matches!(self, OnnxError::InputCount { .. } | OnnxError::InputSize { .. })
    }
}
