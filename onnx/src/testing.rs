//! Scripted in-process backend for tests and benches.
//!
//! A stub "model file" is a YAML document naming the model's inputs,
//! outputs and one fixed operation:
//!
//! ```yaml
//! inputs:
//!   - { name: a, shape: [2] }
//!   - { name: b, shape: [2] }
//! outputs:
//!   - { name: out, shape: [2] }
//! op: add            # sum | add | identity | fail
//! reports:           # only used by `fail`
//!   - { message: bad shape, code: 7 }
//! ```
//!
//! Anything that does not parse is treated like a corrupt model: the
//! failure is reported with [`INVALID_PROTOBUF`].

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Deserialize;

use crate::backend::{Backend, Model, OutputTensor, TensorBinding};
use crate::catcher::report;
use crate::error::OnnxError;
use crate::metadata::TensorInfo;
use crate::options::{RunnerOptions, SessionOptions};

/// Error code used for unparsable model data (`ORT_INVALID_PROTOBUF`).
pub const INVALID_PROTOBUF: i32 = 7;
/// Error code used for scripted environment and metadata failures
/// (`ORT_RUNTIME_EXCEPTION`).
pub const RUNTIME_EXCEPTION: i32 = 6;

static SERIAL: Mutex<()> = Mutex::new(());

/// Serializes tests that construct a [`Runner`](crate::Runner).
pub fn serial() -> MutexGuard<'static, ()> {
    SERIAL.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Writes a stub model file and returns its path.
pub fn write_model(dir: &Path, name: &str, yaml: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, yaml).expect("write stub model");
    path
}

/// What a stub model computes.
#[derive(Debug, Clone, PartialEq)]
pub enum StubOp {
    /// Sum of every input element, written to each output.
    Sum,
    /// Elementwise sum of all inputs, written to each output.
    Add,
    /// Input `i` copied to output `i`.
    Identity,
    /// Reports each `(message, code)` in order, then fails.
    Fail { reports: Vec<(String, i32)> },
}

/// Invocation counters shared by a backend and its models.
#[derive(Debug, Default)]
pub struct StubStats {
    envs: AtomicUsize,
    loads: AtomicUsize,
    runs: AtomicUsize,
    models_alive: AtomicUsize,
    last_intra_op_threads: AtomicUsize,
    last_shapes: Mutex<Vec<Vec<i64>>>,
}

impl StubStats {
    pub fn envs(&self) -> usize {
        self.envs.load(Ordering::SeqCst)
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    pub fn models_alive(&self) -> usize {
        self.models_alive.load(Ordering::SeqCst)
    }

    pub fn last_intra_op_threads(&self) -> usize {
        self.last_intra_op_threads.load(Ordering::SeqCst)
    }

    /// Shapes bound by the most recent run.
    pub fn last_shapes(&self) -> Vec<Vec<i64>> {
        self.last_shapes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Backend whose models are YAML descriptions.
#[derive(Debug, Clone, Default)]
pub struct StubBackend {
    stats: Arc<StubStats>,
    fail_env: Arc<Mutex<Option<(String, i32)>>>,
}

/// Environment handed out by [`StubBackend`].
#[derive(Debug)]
pub struct StubEnv {
    pub name: String,
}

impl StubBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> &StubStats {
        &self.stats
    }

    /// Makes the next environment creation report `message`/`code`.
    pub fn fail_next_env(&self, message: &str, code: i32) {
        *self.fail_env.lock().unwrap_or_else(PoisonError::into_inner) =
            Some((message.to_string(), code));
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
enum OpName {
    Sum,
    Add,
    Identity,
    Fail,
}

#[derive(Deserialize)]
struct ReportDecl {
    message: String,
    code: i32,
}

#[derive(Deserialize)]
struct TensorDecl {
    name: String,
    shape: Vec<i64>,
}

#[derive(Deserialize)]
struct ModelFile {
    inputs: Vec<TensorDecl>,
    outputs: Vec<TensorDecl>,
    op: OpName,
    #[serde(default)]
    reports: Vec<ReportDecl>,
    #[serde(default)]
    fail_metadata: bool,
}

impl Backend for StubBackend {
    type Env = StubEnv;
    type Model = StubModel;

    fn create_env(&self, options: &RunnerOptions) -> Result<StubEnv, OnnxError> {
        let scripted = self
            .fail_env
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some((message, code)) = scripted {
            report(&message, code);
            return Err(OnnxError::Runtime(message));
        }
        self.stats.envs.fetch_add(1, Ordering::SeqCst);
        Ok(StubEnv {
            name: options.env_name.clone(),
        })
    }

    fn load_model(
        &self,
        _env: &StubEnv,
        model_data: &[u8],
        options: &SessionOptions,
    ) -> Result<StubModel, OnnxError> {
        self.stats
            .last_intra_op_threads
            .store(options.intra_op_threads as usize, Ordering::SeqCst);

        let file: ModelFile = match serde_yaml::from_slice(model_data) {
            Ok(file) => file,
            Err(e) => {
                let message = format!("failed to parse model: {e}");
                report(&message, INVALID_PROTOBUF);
                return Err(OnnxError::Runtime(message));
            }
        };
        self.stats.loads.fetch_add(1, Ordering::SeqCst);

        let op = match file.op {
            OpName::Sum => StubOp::Sum,
            OpName::Add => StubOp::Add,
            OpName::Identity => StubOp::Identity,
            OpName::Fail => StubOp::Fail {
                reports: file.reports.into_iter().map(|r| (r.message, r.code)).collect(),
            },
        };
        let infos = |decls: Vec<TensorDecl>| -> Vec<TensorInfo> {
            decls.into_iter().map(|t| TensorInfo::new(t.name, t.shape)).collect()
        };
        let mut model = StubModel::with_stats(
            infos(file.inputs),
            infos(file.outputs),
            op,
            Arc::clone(&self.stats),
        );
        model.fail_metadata = file.fail_metadata;
        Ok(model)
    }
}

/// A scripted model.
#[derive(Debug)]
pub struct StubModel {
    inputs: Vec<TensorInfo>,
    outputs: Vec<TensorInfo>,
    op: StubOp,
    fail_metadata: bool,
    stats: Arc<StubStats>,
}

impl StubModel {
    /// Creates a model with its own counters.
    pub fn new(inputs: Vec<TensorInfo>, outputs: Vec<TensorInfo>, op: StubOp) -> Self {
        Self::with_stats(inputs, outputs, op, Arc::new(StubStats::default()))
    }

    fn with_stats(
        inputs: Vec<TensorInfo>,
        outputs: Vec<TensorInfo>,
        op: StubOp,
        stats: Arc<StubStats>,
    ) -> Self {
        stats.models_alive.fetch_add(1, Ordering::SeqCst);
        Self {
            inputs,
            outputs,
            op,
            fail_metadata: false,
            stats,
        }
    }

    pub fn runs(&self) -> usize {
        self.stats.runs()
    }

    pub fn last_shapes(&self) -> Vec<Vec<i64>> {
        self.stats.last_shapes()
    }

    fn compute(&self, inputs: &[TensorBinding<'_>], outputs: usize) -> Vec<Vec<f32>> {
        match &self.op {
            StubOp::Sum => {
                let total: f32 = inputs.iter().flat_map(|b| b.data.iter()).sum();
                vec![vec![total]; outputs]
            }
            StubOp::Add => {
                let len = inputs.first().map_or(0, |b| b.data.len());
                let mut acc = vec![0.0f32; len];
                for binding in inputs {
                    for (a, v) in acc.iter_mut().zip(binding.data) {
                        *a += v;
                    }
                }
                vec![acc; outputs]
            }
            StubOp::Identity => (0..outputs)
                .map(|i| inputs.get(i).map(|b| b.data.to_vec()).unwrap_or_default())
                .collect(),
            StubOp::Fail { .. } => Vec::new(),
        }
    }
}

impl Drop for StubModel {
    fn drop(&mut self) {
        self.stats.models_alive.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Model for StubModel {
    type Output = StubOutput;

    fn inputs(&self) -> Result<Vec<TensorInfo>, OnnxError> {
        if self.fail_metadata {
            report("metadata unavailable", RUNTIME_EXCEPTION);
            return Err(OnnxError::Runtime("metadata unavailable".into()));
        }
        Ok(self.inputs.clone())
    }

    fn outputs(&self) -> Result<Vec<TensorInfo>, OnnxError> {
        Ok(self.outputs.clone())
    }

    fn run(
        &self,
        inputs: &[TensorBinding<'_>],
        output_names: &[&str],
    ) -> Result<Vec<StubOutput>, OnnxError> {
        self.stats.runs.fetch_add(1, Ordering::SeqCst);
        *self
            .stats
            .last_shapes
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = inputs.iter().map(|b| b.shape.to_vec()).collect();

        for (binding, info) in inputs.iter().zip(&self.inputs) {
            if binding.name != info.name {
                return Err(OnnxError::Runtime(format!(
                    "input bound as {:?}, model expects {:?}",
                    binding.name, info.name
                )));
            }
        }

        if let StubOp::Fail { reports } = &self.op {
            for (message, code) in reports {
                report(message, *code);
            }
            return Err(OnnxError::Runtime("stub model failed".into()));
        }

        Ok(self
            .compute(inputs, output_names.len())
            .into_iter()
            .map(|data| StubOutput { data })
            .collect())
    }
}

/// Output of a [`StubModel`] run.
#[derive(Debug)]
pub struct StubOutput {
    data: Vec<f32>,
}

impl OutputTensor for StubOutput {
    fn element_count(&self) -> Result<usize, OnnxError> {
        Ok(self.data.len())
    }

    fn copy_to(&self, out: &mut [f32]) -> Result<(), OnnxError> {
        if out.len() != self.data.len() {
            return Err(OnnxError::Runtime(format!(
                "output buffer holds {}, tensor has {}",
                out.len(),
                self.data.len()
            )));
        }
        out.copy_from_slice(&self.data);
        Ok(())
    }
}
