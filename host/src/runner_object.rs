//! `OnnxRunner`: the script-facing model loader singleton.

use std::any::Any;

use gdort_onnx::{Backend, Runner};

use crate::error::CallError;
use crate::logging::fail;
use crate::object::{arg, HostClass, HostObject, MethodInfo, ObjectDb};
use crate::paths::ProjectPaths;
use crate::session_object::OnnxSession;
use crate::variant::Variant;

/// Script wrapper around the process's [`Runner`].
pub struct OnnxRunner<B: Backend> {
    runner: Runner<B>,
    paths: ProjectPaths,
}

impl<B: Backend + 'static> OnnxRunner<B> {
    pub fn new(runner: Runner<B>, paths: ProjectPaths) -> Self {
        Self { runner, paths }
    }

    pub fn runner(&self) -> &Runner<B> {
        &self.runner
    }

    /// Loads a model and returns a handle to a new `OnnxSession`, or `Nil`.
    fn load_model(&self, path: &str, objects: &mut ObjectDb) -> Variant {
        let resolved = self.paths.globalize(path);
        match self.runner.load_model(&resolved) {
            Ok(session) => {
                let id = objects.insert(Box::new(OnnxSession::new(session)));
                tracing::debug!(%path, object = %id, "host: model loaded");
                Variant::Object(id)
            }
            Err(e) => fail(Variant::Nil, format_args!("Couldn't load model {path}: {e}")),
        }
    }
}

impl<B: Backend + 'static> HostClass for OnnxRunner<B> {
    const NAME: &'static str = "OnnxRunner";
    const METHODS: &'static [MethodInfo] = &[MethodInfo::new("load_model", 1)];
}

impl<B: Backend + 'static> HostObject for OnnxRunner<B> {
    fn class_name(&self) -> &'static str {
        <Self as HostClass>::NAME
    }

    fn call(&mut self, method: &str, args: &[Variant], objects: &mut ObjectDb) -> Result<Variant, CallError> {
        match method {
            "load_model" => {
                let value = arg(method, args, 0)?;
                let path = value.as_str().ok_or_else(|| CallError::InvalidArgument {
                    method: method.to_string(),
                    index: 0,
                    expected: "String",
                    got: value.type_name(),
                })?;
                Ok(self.load_model(path, objects))
            }
            _ => Err(CallError::InvalidMethod {
                class: <Self as HostClass>::NAME.to_string(),
                method: method.to_string(),
            }),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
