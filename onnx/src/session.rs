//! A loaded model and its cached metadata.

use crate::backend::{Model, OutputTensor, TensorBinding};
use crate::catcher::guarded;
use crate::error::OnnxError;
use crate::metadata::{ModelMetadata, TensorInfo};

/// Input data for [`Session::run`].
#[derive(Debug, Clone)]
pub enum TensorInput<'a> {
    /// One buffer, accepted only by single-input models.
    Single(&'a [f32]),
    /// One buffer per model input, in input order.
    List(Vec<&'a [f32]>),
}

impl<'a> TensorInput<'a> {
    fn into_buffers(self, input_count: usize) -> Result<Vec<&'a [f32]>, OnnxError> {
        match self {
            TensorInput::Single(data) if input_count == 1 => Ok(vec![data]),
            TensorInput::Single(_) => Err(OnnxError::InputCount {
                expected: input_count,
                got: 1,
            }),
            TensorInput::List(buffers) => Ok(buffers),
        }
    }
}

impl<'a> From<&'a [f32]> for TensorInput<'a> {
    fn from(data: &'a [f32]) -> Self {
        TensorInput::Single(data)
    }
}

impl<'a> From<Vec<&'a [f32]>> for TensorInput<'a> {
    fn from(buffers: Vec<&'a [f32]>) -> Self {
        TensorInput::List(buffers)
    }
}

/// Result of [`Session::run`].
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutput {
    /// The only output of a single-output model.
    Single(Vec<f32>),
    /// One buffer per model output, in output order.
    List(Vec<Vec<f32>>),
}

impl RunOutput {
    /// Flattens into one buffer per output.
    pub fn into_vec(self) -> Vec<Vec<f32>> {
        match self {
            RunOutput::Single(data) => vec![data],
            RunOutput::List(buffers) => buffers,
        }
    }
}

/// Holds one loaded model.
///
/// Created by [`Runner::load_model`](crate::Runner::load_model). The model
/// handle is released when the session is dropped.
pub struct Session<M: Model> {
    model: M,
    metadata: ModelMetadata,
}

impl<M: Model> Session<M> {
    pub(crate) fn new(model: M) -> Result<Self, OnnxError> {
        let metadata = guarded("read model metadata", || ModelMetadata::read(&model))?;
        tracing::debug!(
            inputs = metadata.inputs.len(),
            outputs = metadata.outputs.len(),
            "onnx: session ready"
        );
        Ok(Self { model, metadata })
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    pub fn inputs(&self) -> &[TensorInfo] {
        &self.metadata.inputs
    }

    pub fn outputs(&self) -> &[TensorInfo] {
        &self.metadata.outputs
    }

    pub fn input_count(&self) -> usize {
        self.metadata.inputs.len()
    }

    pub fn output_count(&self) -> usize {
        self.metadata.outputs.len()
    }

    pub fn input_shape(&self, index: usize) -> Result<&[i64], OnnxError> {
        Ok(&self.metadata.input(index)?.shape)
    }

    pub fn input_name(&self, index: usize) -> Result<&str, OnnxError> {
        Ok(&self.metadata.input(index)?.name)
    }

    pub fn output_shape(&self, index: usize) -> Result<&[i64], OnnxError> {
        Ok(&self.metadata.output(index)?.shape)
    }

    pub fn output_name(&self, index: usize) -> Result<&str, OnnxError> {
        Ok(&self.metadata.output(index)?.name)
    }

    /// Runs one forward pass.
    ///
    /// Returns [`RunOutput::Single`] for single-output models and
    /// [`RunOutput::List`] otherwise.
    pub fn run<'a>(&self, input: impl Into<TensorInput<'a>>) -> Result<RunOutput, OnnxError> {
        let buffers = input.into().into_buffers(self.input_count())?;
        let mut outputs = self.run_buffers(&buffers)?;
        if outputs.len() == 1 {
            if let Some(only) = outputs.pop() {
                return Ok(RunOutput::Single(only));
            }
        }
        Ok(RunOutput::List(outputs))
    }

    /// Runs one forward pass over one buffer per input, in input order, and
    /// returns one buffer per output.
    ///
    /// Buffer counts and sizes are checked against the cached metadata
    /// before the backend is called. Inputs are borrowed for the duration of
    /// the call; outputs are copied out of backend memory.
    pub fn run_buffers(&self, inputs: &[&[f32]]) -> Result<Vec<Vec<f32>>, OnnxError> {
        if inputs.len() != self.input_count() {
            return Err(OnnxError::InputCount {
                expected: self.input_count(),
                got: inputs.len(),
            });
        }

        let shapes = self
            .metadata
            .inputs
            .iter()
            .zip(inputs)
            .enumerate()
            .map(|(index, (info, data))| {
                info.resolve_shape(data.len()).ok_or_else(|| OnnxError::InputSize {
                    index,
                    name: info.name.clone(),
                    shape: info.shape.clone(),
                    got: data.len(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let bindings: Vec<TensorBinding<'_>> = self
            .metadata
            .inputs
            .iter()
            .zip(inputs)
            .zip(&shapes)
            .map(|((info, data), shape)| TensorBinding {
                name: &info.name,
                shape,
                data,
            })
            .collect();
        let output_names: Vec<&str> = self.metadata.outputs.iter().map(|o| o.name.as_str()).collect();

        guarded("run", || {
            let values = self.model.run(&bindings, &output_names)?;
            if values.len() != output_names.len() {
                return Err(OnnxError::Runtime(format!(
                    "backend returned {} outputs, expected {}",
                    values.len(),
                    output_names.len()
                )));
            }
            values
                .iter()
                .map(|value| {
                    let mut out = vec![0.0f32; value.element_count()?];
                    value.copy_to(&mut out)?;
                    Ok::<_, OnnxError>(out)
                })
                .collect()
        })
    }
}
