//! The seam between the session wrapper and an inference library.
//!
//! A backend compiles model bytes into a [`Model`], describes its inputs and
//! outputs, and runs one forward pass over borrowed `f32` buffers. Failures
//! are returned as errors; backends that report through [`report`] as well
//! have the first reported failure take precedence.
//!
//! [`report`]: crate::report

use crate::error::OnnxError;
use crate::metadata::TensorInfo;
use crate::options::{RunnerOptions, SessionOptions};

/// An inference library.
pub trait Backend: Send + Sync {
    /// Process-wide backend state (logging, thread pools).
    type Env: Send + Sync;

    /// A compiled model.
    type Model: Model + 'static;

    /// Initializes the backend environment.
    fn create_env(&self, options: &RunnerOptions) -> Result<Self::Env, OnnxError>;

    /// Compiles serialized model data into a runnable model.
    fn load_model(
        &self,
        env: &Self::Env,
        model_data: &[u8],
        options: &SessionOptions,
    ) -> Result<Self::Model, OnnxError>;
}

/// A compiled model owned by exactly one session.
pub trait Model: Send {
    /// Backend-owned output value, valid until dropped.
    type Output: OutputTensor;

    fn inputs(&self) -> Result<Vec<TensorInfo>, OnnxError>;

    fn outputs(&self) -> Result<Vec<TensorInfo>, OnnxError>;

    /// Runs one forward pass, producing one output per requested name in
    /// the same order.
    fn run(
        &self,
        inputs: &[TensorBinding<'_>],
        output_names: &[&str],
    ) -> Result<Vec<Self::Output>, OnnxError>;
}

/// An output produced by [`Model::run`].
pub trait OutputTensor {
    fn element_count(&self) -> Result<usize, OnnxError>;

    /// Copies the tensor into `out`, which holds exactly
    /// [`element_count`](OutputTensor::element_count) elements.
    fn copy_to(&self, out: &mut [f32]) -> Result<(), OnnxError>;
}

/// A caller-owned buffer bound to a named model input for one call.
#[derive(Debug, Clone, Copy)]
pub struct TensorBinding<'a> {
    pub name: &'a str,
    pub shape: &'a [i64],
    pub data: &'a [f32],
}
