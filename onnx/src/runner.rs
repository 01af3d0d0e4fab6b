//! Process-wide model loader.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use once_cell::sync::OnceCell;

use crate::backend::Backend;
use crate::catcher::guarded;
use crate::error::OnnxError;
use crate::options::RunnerOptions;
use crate::session::Session;

// Set while a Runner is alive.
static RUNNER_ALIVE: AtomicBool = AtomicBool::new(false);

/// Loads models into [`Session`]s.
///
/// At most one Runner may be alive per process; constructing a second one
/// panics. The backend environment is created on the first load that gets
/// past the file check and is shared by every session afterwards.
pub struct Runner<B: Backend> {
    backend: B,
    options: RunnerOptions,
    env: OnceCell<B::Env>,
}

impl<B: Backend> Runner<B> {
    /// Creates the process's Runner.
    ///
    /// # Panics
    ///
    /// Panics if another Runner is still alive.
    pub fn new(backend: B, options: RunnerOptions) -> Self {
        if RUNNER_ALIVE.swap(true, Ordering::AcqRel) {
            panic!("onnx: runner already exists; only one Runner may be alive per process");
        }
        tracing::debug!(env = %options.env_name, "onnx: runner created");
        Self {
            backend,
            options,
            env: OnceCell::new(),
        }
    }

    /// Returns true while a Runner is alive in this process.
    pub fn exists() -> bool {
        RUNNER_ALIVE.load(Ordering::Acquire)
    }

    pub fn options(&self) -> &RunnerOptions {
        &self.options
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// True once the backend environment has been created.
    pub fn has_environment(&self) -> bool {
        self.env.get().is_some()
    }

    fn env(&self) -> Result<&B::Env, OnnxError> {
        self.env.get_or_try_init(|| {
            tracing::debug!(env = %self.options.env_name, "onnx: creating environment");
            guarded("create environment", || self.backend.create_env(&self.options))
        })
    }

    /// Loads the model file at `path`.
    ///
    /// No session is returned unless the model compiled and its metadata
    /// could be read.
    pub fn load_model(&self, path: impl AsRef<Path>) -> Result<Session<B::Model>, OnnxError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(OnnxError::ModelNotFound(path.to_path_buf()));
        }
        let data = std::fs::read(path).map_err(|source| OnnxError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if data.is_empty() {
            return Err(OnnxError::EmptyData);
        }

        let env = self.env()?;
        tracing::debug!(path = %path.display(), bytes = data.len(), "onnx: loading model");
        let model = guarded("create session", || {
            self.backend.load_model(env, &data, &self.options.session)
        })?;
        Session::new(model)
    }
}

impl<B: Backend> Drop for Runner<B> {
    fn drop(&mut self) {
        RUNNER_ALIVE.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::RunOutput;
    use crate::testing::{serial, write_model, StubBackend};

    const SUM_MODEL: &str = "
inputs:
  - { name: x, shape: [1, 3] }
outputs:
  - { name: y, shape: [1, 1] }
op: sum
";

    const ADD_MODEL: &str = "
inputs:
  - { name: a, shape: [2] }
  - { name: b, shape: [2] }
outputs:
  - { name: out, shape: [2] }
op: add
";

    #[test]
    fn load_and_run_sum() {
        let _guard = serial();
        let dir = tempfile::tempdir().unwrap();
        let path = write_model(dir.path(), "sum.yaml", SUM_MODEL);

        let backend = StubBackend::new();
        let runner = Runner::new(backend.clone(), RunnerOptions::default());
        let session = runner.load_model(&path).unwrap();
        assert_eq!(session.input_count(), 1);
        assert_eq!(session.input_name(0).unwrap(), "x");
        assert_eq!(session.output_shape(0).unwrap(), &[1, 1]);
        assert_eq!(
            session.run(&[1.0f32, 2.0, 3.0][..]).unwrap(),
            RunOutput::Single(vec![6.0])
        );
        assert_eq!(backend.stats().loads(), 1);
        assert_eq!(backend.stats().runs(), 1);
    }

    #[test]
    fn load_and_run_add() {
        let _guard = serial();
        let dir = tempfile::tempdir().unwrap();
        let path = write_model(dir.path(), "add.yaml", ADD_MODEL);

        let runner = Runner::new(StubBackend::new(), RunnerOptions::default());
        let session = runner.load_model(&path).unwrap();
        assert_eq!(session.input_count(), 2);
        let out = session.run(vec![&[1.0f32, 2.0][..], &[3.0f32, 4.0][..]]).unwrap();
        assert_eq!(out, RunOutput::Single(vec![4.0, 6.0]));
    }

    #[test]
    fn environment_created_once() {
        let _guard = serial();
        let dir = tempfile::tempdir().unwrap();
        let path = write_model(dir.path(), "sum.yaml", SUM_MODEL);

        let backend = StubBackend::new();
        let runner = Runner::new(backend.clone(), RunnerOptions::default());
        assert!(!runner.has_environment());
        let _a = runner.load_model(&path).unwrap();
        let _b = runner.load_model(&path).unwrap();
        assert!(runner.has_environment());
        assert_eq!(backend.stats().envs(), 1);
        assert_eq!(backend.stats().loads(), 2);
    }

    #[test]
    fn missing_file_creates_no_environment() {
        let _guard = serial();
        let dir = tempfile::tempdir().unwrap();
        let backend = StubBackend::new();
        let runner = Runner::new(backend.clone(), RunnerOptions::default());

        let err = runner.load_model(dir.path().join("missing.onnx")).err().unwrap();
        assert!(matches!(err, OnnxError::ModelNotFound(_)));
        assert!(!runner.has_environment());
        assert_eq!(backend.stats().envs(), 0);
        assert_eq!(backend.stats().loads(), 0);

        // A directory is not a model file either.
        assert!(matches!(
            runner.load_model(dir.path()).err().unwrap(),
            OnnxError::ModelNotFound(_)
        ));
    }

    #[test]
    fn empty_file_rejected() {
        let _guard = serial();
        let dir = tempfile::tempdir().unwrap();
        let path = write_model(dir.path(), "empty.onnx", "");
        let runner = Runner::new(StubBackend::new(), RunnerOptions::default());
        assert!(matches!(runner.load_model(&path).err().unwrap(), OnnxError::EmptyData));
    }

    #[test]
    fn malformed_model_reports_backend_error() {
        let _guard = serial();
        let dir = tempfile::tempdir().unwrap();
        let path = write_model(dir.path(), "bad.onnx", "this: [is not a model");

        let backend = StubBackend::new();
        let runner = Runner::new(backend.clone(), RunnerOptions::default());
        let err = runner.load_model(&path).err().unwrap();
        match err {
            OnnxError::Backend { context, code, .. } => {
                assert_eq!(context, "create session");
                assert_eq!(code, crate::testing::INVALID_PROTOBUF);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(backend.stats().models_alive(), 0);
    }

    #[test]
    fn metadata_failure_leaves_no_session() {
        let _guard = serial();
        let dir = tempfile::tempdir().unwrap();
        let path = write_model(
            dir.path(),
            "meta.yaml",
            "inputs: []\noutputs: []\nop: identity\nfail_metadata: true\n",
        );
        let backend = StubBackend::new();
        let runner = Runner::new(backend.clone(), RunnerOptions::default());
        let err = runner.load_model(&path).err().unwrap();
        assert!(matches!(err, OnnxError::Backend { context: "read model metadata", .. }));
        assert_eq!(backend.stats().models_alive(), 0);
    }

    #[test]
    fn environment_failure_is_retried_on_next_load() {
        let _guard = serial();
        let dir = tempfile::tempdir().unwrap();
        let path = write_model(dir.path(), "sum.yaml", SUM_MODEL);
        let backend = StubBackend::new();
        backend.fail_next_env("no threads", 6);

        let runner = Runner::new(backend.clone(), RunnerOptions::default());
        let err = runner.load_model(&path).err().unwrap();
        assert_eq!(err.code(), Some(6));
        assert!(!runner.has_environment());
        assert!(runner.load_model(&path).is_ok());
        assert!(runner.has_environment());
    }

    #[test]
    fn session_drop_releases_model() {
        let _guard = serial();
        let dir = tempfile::tempdir().unwrap();
        let path = write_model(dir.path(), "sum.yaml", SUM_MODEL);
        let backend = StubBackend::new();
        let runner = Runner::new(backend.clone(), RunnerOptions::default());
        let session = runner.load_model(&path).unwrap();
        assert_eq!(backend.stats().models_alive(), 1);
        drop(session);
        assert_eq!(backend.stats().models_alive(), 0);
    }

    #[test]
    fn options_reach_backend() {
        let _guard = serial();
        let dir = tempfile::tempdir().unwrap();
        let path = write_model(dir.path(), "sum.yaml", SUM_MODEL);
        let backend = StubBackend::new();
        let mut options = RunnerOptions::default();
        options.session.intra_op_threads = 3;
        let runner = Runner::new(backend.clone(), options);
        runner.load_model(&path).unwrap();
        assert_eq!(backend.stats().last_intra_op_threads(), 3);
    }

    #[test]
    fn runner_slot_released_on_drop() {
        let _guard = serial();
        let runner = Runner::new(StubBackend::new(), RunnerOptions::default());
        assert!(Runner::<StubBackend>::exists());
        drop(runner);
        assert!(!Runner::<StubBackend>::exists());
        let _again = Runner::new(StubBackend::new(), RunnerOptions::default());
    }

    #[test]
    #[should_panic(expected = "runner already exists")]
    fn second_runner_panics() {
        let _guard = serial();
        let _first = Runner::new(StubBackend::new(), RunnerOptions::default());
        let _second = Runner::new(StubBackend::new(), RunnerOptions::default());
    }
}
