//! `OnnxSession`: a loaded model as seen by scripts.

use std::any::Any;

use gdort_onnx::{Model, RunOutput, Session, TensorInput};

use crate::error::CallError;
use crate::logging::fail;
use crate::object::{arg, HostClass, HostObject, MethodInfo, ObjectDb};
use crate::variant::Variant;

const INPUT_TYPE_ERROR: &str = "OnnxSession input data must be a PackedFloat32Array or an Array of them";

/// Script wrapper around a [`Session`].
pub struct OnnxSession<M: Model> {
    session: Session<M>,
}

impl<M: Model> OnnxSession<M> {
    pub fn new(session: Session<M>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Session<M> {
        &self.session
    }

    fn num_inputs(&self) -> Variant {
        Variant::Int(self.session.input_count() as i64)
    }

    fn num_outputs(&self) -> Variant {
        Variant::Int(self.session.output_count() as i64)
    }

    fn input_shape(&self, index: i64) -> Variant {
        match checked_index(index).and_then(|i| self.session.input_shape(i).ok()) {
            Some(shape) => Variant::PackedInt64Array(shape.to_vec()),
            None => fail(
                Variant::PackedInt64Array(Vec::new()),
                format_args!("Input index {index} is out of range (0..{})", self.session.input_count()),
            ),
        }
    }

    fn input_name(&self, index: i64) -> Variant {
        match checked_index(index).and_then(|i| self.session.input_name(i).ok()) {
            Some(name) => Variant::String(name.to_string()),
            None => fail(
                Variant::String(String::new()),
                format_args!("Input index {index} is out of range (0..{})", self.session.input_count()),
            ),
        }
    }

    fn output_shape(&self, index: i64) -> Variant {
        match checked_index(index).and_then(|i| self.session.output_shape(i).ok()) {
            Some(shape) => Variant::PackedInt64Array(shape.to_vec()),
            None => fail(
                Variant::PackedInt64Array(Vec::new()),
                format_args!("Output index {index} is out of range (0..{})", self.session.output_count()),
            ),
        }
    }

    fn output_name(&self, index: i64) -> Variant {
        match checked_index(index).and_then(|i| self.session.output_name(i).ok()) {
            Some(name) => Variant::String(name.to_string()),
            None => fail(
                Variant::String(String::new()),
                format_args!("Output index {index} is out of range (0..{})", self.session.output_count()),
            ),
        }
    }

    fn run(&self, input: &Variant) -> Variant {
        let Some(input) = tensor_input(input) else {
            return fail(Variant::Nil, INPUT_TYPE_ERROR);
        };
        match self.session.run(input) {
            Ok(RunOutput::Single(data)) => Variant::PackedFloat32Array(data),
            Ok(RunOutput::List(buffers)) => {
                Variant::Array(buffers.into_iter().map(Variant::PackedFloat32Array).collect())
            }
            Err(e) => fail(Variant::Nil, format_args!("OnnxSession.run failed: {e}")),
        }
    }
}

fn checked_index(index: i64) -> Option<usize> {
    usize::try_from(index).ok()
}

fn tensor_input(input: &Variant) -> Option<TensorInput<'_>> {
    match input {
        Variant::PackedFloat32Array(data) => Some(TensorInput::Single(data)),
        Variant::Array(items) => items
            .iter()
            .map(Variant::as_float32_array)
            .collect::<Option<Vec<_>>>()
            .map(TensorInput::List),
        _ => None,
    }
}

fn int_arg(method: &str, args: &[Variant], index: usize) -> Result<i64, CallError> {
    let value = arg(method, args, index)?;
    value.as_int().ok_or_else(|| CallError::InvalidArgument {
        method: method.to_string(),
        index,
        expected: "int",
        got: value.type_name(),
    })
}

impl<M: Model + 'static> HostClass for OnnxSession<M> {
    const NAME: &'static str = "OnnxSession";
    const METHODS: &'static [MethodInfo] = &[
        MethodInfo::new("run", 1),
        MethodInfo::new("num_inputs", 0),
        MethodInfo::new("input_shape", 1),
        MethodInfo::new("input_name", 1),
        MethodInfo::new("num_outputs", 0),
        MethodInfo::new("output_shape", 1),
        MethodInfo::new("output_name", 1),
    ];
}

impl<M: Model + 'static> HostObject for OnnxSession<M> {
    fn class_name(&self) -> &'static str {
        <Self as HostClass>::NAME
    }

    fn call(&mut self, method: &str, args: &[Variant], _objects: &mut ObjectDb) -> Result<Variant, CallError> {
        Ok(match method {
            "run" => self.run(arg(method, args, 0)?),
            "num_inputs" => self.num_inputs(),
            "num_outputs" => self.num_outputs(),
            "input_shape" => self.input_shape(int_arg(method, args, 0)?),
            "input_name" => self.input_name(int_arg(method, args, 0)?),
            "output_shape" => self.output_shape(int_arg(method, args, 0)?),
            "output_name" => self.output_name(int_arg(method, args, 0)?),
            _ => {
                return Err(CallError::InvalidMethod {
                    class: <Self as HostClass>::NAME.to_string(),
                    method: method.to_string(),
                });
            }
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
