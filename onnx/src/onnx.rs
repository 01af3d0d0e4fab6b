//! ONNX Runtime backend over the C API.

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int, c_void};
use std::ptr;
use std::sync::Arc;

use crate::backend::{Backend, Model, OutputTensor, TensorBinding};
use crate::catcher::report;
use crate::error::OnnxError;
use crate::ffi;
use crate::metadata::TensorInfo;
use crate::options::{LogLevel, RunnerOptions, SessionOptions};

/// Gets the ORT API pointer (cached by the shim after first call).
fn api() -> *const ffi::OrtApi {
    unsafe { ffi::ort_api() }
}

/// Converts an OrtStatus into a Result, reporting failures to the active
/// error scope.
fn check_status(status: *mut ffi::OrtStatus) -> Result<(), OnnxError> {
    if status.is_null() {
        return Ok(());
    }
    let (message, code) = unsafe {
        let ptr = ffi::ort_error_message(api(), status);
        let message = CStr::from_ptr(ptr).to_string_lossy().into_owned();
        let code = ffi::ort_error_code(api(), status);
        ffi::ort_release_status(api(), status);
        (message, code)
    };
    report(&message, code);
    Err(OnnxError::Runtime(message))
}

fn c_string(s: &str) -> Result<CString, OnnxError> {
    CString::new(s).map_err(|e| OnnxError::Runtime(e.to_string()))
}

unsafe extern "C" fn forward_log(
    _param: *mut c_void,
    severity: c_int,
    category: *const c_char,
    _logid: *const c_char,
    _code_location: *const c_char,
    message: *const c_char,
) {
    if message.is_null() {
        return;
    }
    let message = unsafe { CStr::from_ptr(message) }.to_string_lossy();
    let category = if category.is_null() {
        "ort".into()
    } else {
        unsafe { CStr::from_ptr(category) }.to_string_lossy()
    };
    let level = severity_level(severity);
    if level == tracing::Level::TRACE {
        tracing::trace!(%category, "{message}");
    } else if level == tracing::Level::INFO {
        tracing::info!(%category, "{message}");
    } else if level == tracing::Level::WARN {
        tracing::warn!(%category, "{message}");
    } else if severity >= LogLevel::Fatal.as_raw() {
        tracing::error!(%category, fatal = true, "{message}");
    } else {
        tracing::error!(%category, "{message}");
    }
}

/// ORT severity (verbose, info, warning, error, fatal) to a tracing level.
fn severity_level(severity: c_int) -> tracing::Level {
    match severity {
        s if s <= LogLevel::Verbose.as_raw() => tracing::Level::TRACE,
        1 => tracing::Level::INFO,
        2 => tracing::Level::WARN,
        _ => tracing::Level::ERROR,
    }
}

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

/// ONNX Runtime, linked through `csrc/ort_shim.c`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrtBackend;

impl Backend for OrtBackend {
    type Env = Arc<OrtEnvironment>;
    type Model = OrtModel;

    fn create_env(&self, options: &RunnerOptions) -> Result<Self::Env, OnnxError> {
        let c_name = c_string(&options.env_name)?;
        let mut env: *mut ffi::OrtEnv = ptr::null_mut();
        check_status(unsafe {
            ffi::ort_create_env(
                api(),
                options.log_level.as_raw(),
                c_name.as_ptr(),
                forward_log,
                &mut env,
            )
        })?;
        Ok(Arc::new(OrtEnvironment { env }))
    }

    fn load_model(
        &self,
        env: &Self::Env,
        model_data: &[u8],
        options: &SessionOptions,
    ) -> Result<OrtModel, OnnxError> {
        if model_data.is_empty() {
            return Err(OnnxError::EmptyData);
        }

        let threads = c_int::try_from(options.intra_op_threads)
            .map_err(|_| OnnxError::Options(format!("too many threads: {}", options.intra_op_threads)))?;
        let mut opts: *mut ffi::OrtSessionOptions = ptr::null_mut();
        check_status(unsafe {
            ffi::ort_create_session_options(api(), threads, options.graph_optimization.as_raw(), &mut opts)
        })?;

        let mut session: *mut ffi::OrtSession = ptr::null_mut();
        let status = unsafe {
            ffi::ort_create_session_from_memory(
                api(),
                env.env,
                model_data.as_ptr() as *const _,
                model_data.len(),
                opts,
                &mut session,
            )
        };
        unsafe { ffi::ort_release_session_options(api(), opts) };
        check_status(status)?;

        Ok(OrtModel {
            session,
            _env: Arc::clone(env),
        })
    }
}

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

/// ONNX Runtime environment. One per process.
pub struct OrtEnvironment {
    env: *mut ffi::OrtEnv,
}

// The environment is immutable after creation.
unsafe impl Send for OrtEnvironment {}
unsafe impl Sync for OrtEnvironment {}

impl Drop for OrtEnvironment {
    fn drop(&mut self) {
        if !self.env.is_null() {
            unsafe { ffi::ort_release_env(api(), self.env) };
            self.env = ptr::null_mut();
        }
    }
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// A compiled ONNX Runtime session.
pub struct OrtModel {
    session: *mut ffi::OrtSession,
    // Sessions must not outlive their environment.
    _env: Arc<OrtEnvironment>,
}

unsafe impl Send for OrtModel {}

impl OrtModel {
    fn io_infos(&self, is_output: c_int) -> Result<Vec<TensorInfo>, OnnxError> {
        let mut count = 0usize;
        check_status(unsafe { ffi::ort_session_io_count(api(), self.session, is_output, &mut count) })?;
        (0..count).map(|index| self.io_info(is_output, index)).collect()
    }

    fn io_info(&self, is_output: c_int, index: usize) -> Result<TensorInfo, OnnxError> {
        let mut raw_name: *mut c_char = ptr::null_mut();
        check_status(unsafe { ffi::ort_session_io_name(api(), self.session, is_output, index, &mut raw_name) })?;
        let name = unsafe {
            let name = CStr::from_ptr(raw_name).to_string_lossy().into_owned();
            ffi::ort_free_name(api(), raw_name);
            name
        };

        let mut ndim = 0usize;
        check_status(unsafe { ffi::ort_session_io_ndim(api(), self.session, is_output, index, &mut ndim) })?;
        let mut shape = vec![0i64; ndim];
        if ndim > 0 {
            check_status(unsafe {
                ffi::ort_session_io_dims(api(), self.session, is_output, index, shape.as_mut_ptr(), ndim)
            })?;
        }
        Ok(TensorInfo { name, shape })
    }
}

impl Model for OrtModel {
    type Output = OrtOutput;

    fn inputs(&self) -> Result<Vec<TensorInfo>, OnnxError> {
        self.io_infos(0)
    }

    fn outputs(&self) -> Result<Vec<TensorInfo>, OnnxError> {
        self.io_infos(1)
    }

    fn run(
        &self,
        inputs: &[TensorBinding<'_>],
        output_names: &[&str],
    ) -> Result<Vec<OrtOutput>, OnnxError> {
        let mut mem_info: *mut ffi::OrtMemoryInfo = ptr::null_mut();
        check_status(unsafe { ffi::ort_create_cpu_memory_info(api(), &mut mem_info) })?;

        // Input values borrow the caller's buffers; ORT only reads them.
        let mut values: Vec<InputValue<'_>> = Vec::with_capacity(inputs.len());
        let mut failed = Ok(());
        for binding in inputs {
            let mut value: *mut ffi::OrtValue = ptr::null_mut();
            let status = unsafe {
                ffi::ort_create_tensor_float(
                    api(),
                    mem_info,
                    binding.data.as_ptr() as *mut f32,
                    binding.data.len(),
                    binding.shape.as_ptr(),
                    binding.shape.len(),
                    &mut value,
                )
            };
            failed = check_status(status);
            if failed.is_err() {
                break;
            }
            values.push(InputValue {
                value,
                _data: binding.data,
            });
        }
        unsafe { ffi::ort_release_memory_info(api(), mem_info) };
        failed?;

        let c_input_names = inputs
            .iter()
            .map(|b| c_string(b.name))
            .collect::<Result<Vec<_>, _>>()?;
        let c_input_ptrs: Vec<*const c_char> = c_input_names.iter().map(|s| s.as_ptr()).collect();
        let c_inputs: Vec<*const ffi::OrtValue> = values.iter().map(|v| v.value as *const _).collect();

        let c_output_names = output_names
            .iter()
            .map(|n| c_string(n))
            .collect::<Result<Vec<_>, _>>()?;
        let c_output_ptrs: Vec<*const c_char> = c_output_names.iter().map(|s| s.as_ptr()).collect();

        let mut c_outputs: Vec<*mut ffi::OrtValue> = vec![ptr::null_mut(); output_names.len()];

        check_status(unsafe {
            ffi::ort_run(
                api(),
                self.session,
                c_input_ptrs.as_ptr(),
                c_inputs.as_ptr(),
                c_inputs.len(),
                c_output_ptrs.as_ptr(),
                c_output_ptrs.len(),
                c_outputs.as_mut_ptr(),
            )
        })?;

        Ok(c_outputs.into_iter().map(|value| OrtOutput { value }).collect())
    }
}

impl Drop for OrtModel {
    fn drop(&mut self) {
        if !self.session.is_null() {
            unsafe { ffi::ort_release_session(api(), self.session) };
            self.session = ptr::null_mut();
        }
    }
}

// ---------------------------------------------------------------------------
// Tensors
// ---------------------------------------------------------------------------

/// Input tensor over caller memory, released before the borrow ends.
struct InputValue<'a> {
    value: *mut ffi::OrtValue,
    _data: &'a [f32],
}

impl Drop for InputValue<'_> {
    fn drop(&mut self) {
        if !self.value.is_null() {
            unsafe { ffi::ort_release_value(api(), self.value) };
            self.value = ptr::null_mut();
        }
    }
}

/// Runtime-owned output tensor.
pub struct OrtOutput {
    value: *mut ffi::OrtValue,
}

impl OutputTensor for OrtOutput {
    fn element_count(&self) -> Result<usize, OnnxError> {
        let mut count = 0usize;
        check_status(unsafe { ffi::ort_get_tensor_element_count(api(), self.value, &mut count) })?;
        Ok(count)
    }

    fn copy_to(&self, out: &mut [f32]) -> Result<(), OnnxError> {
        let count = self.element_count()?;
        if out.len() != count {
            return Err(OnnxError::Runtime(format!(
                "output buffer holds {}, tensor has {count}",
                out.len()
            )));
        }
        if count == 0 {
            return Ok(());
        }
        let mut data: *mut f32 = ptr::null_mut();
        check_status(unsafe { ffi::ort_get_tensor_float_data(api(), self.value, &mut data) })?;
        unsafe {
            ptr::copy_nonoverlapping(data, out.as_mut_ptr(), count);
        }
        Ok(())
    }
}

impl Drop for OrtOutput {
    fn drop(&mut self) {
        if !self.value.is_null() {
            unsafe { ffi::ort_release_value(api(), self.value) };
            self.value = ptr::null_mut();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::serial;
    use crate::Runner;

    #[test]
    fn ort_severity_maps_to_matching_level() {
        let levels = [
            LogLevel::Verbose,
            LogLevel::Info,
            LogLevel::Warning,
            LogLevel::Error,
            LogLevel::Fatal,
        ]
        .map(|l| severity_level(l.as_raw()));
        assert_eq!(
            levels,
            [
                tracing::Level::TRACE,
                tracing::Level::INFO,
                tracing::Level::WARN,
                tracing::Level::ERROR,
                tracing::Level::ERROR,
            ]
        );
    }

    // Set ORT_TEST_MODEL to an ONNX file with one [1, 3] float input.
    #[test]
    #[ignore]
    fn runs_real_model() {
        let path = std::env::var("ORT_TEST_MODEL").expect("ORT_TEST_MODEL required");
        let _guard = serial();
        let runner = Runner::new(OrtBackend, RunnerOptions::default());
        let session = runner.load_model(&path).unwrap();
        assert_eq!(session.input_count(), 1);
        assert_eq!(session.input_shape(0).unwrap(), &[1, 3]);

        let out = session.run(&[1.0f32, 2.0, 3.0][..]).unwrap();
        let buffers = out.into_vec();
        assert_eq!(buffers.len(), session.output_count());
        for (i, buf) in buffers.iter().enumerate() {
            assert!(buf.iter().all(|v| v.is_finite()), "output {i} not finite");
        }
    }

    #[test]
    #[ignore]
    fn corrupt_model_reports_code() {
        let _guard = serial();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.onnx");
        std::fs::write(&path, b"not a protobuf").unwrap();
        let runner = Runner::new(OrtBackend, RunnerOptions::default());
        let err = runner.load_model(&path).err().unwrap();
        assert!(err.code().is_some(), "{err}");
        assert!(matches!(
            runner.load_model(dir.path().join("missing.onnx")).err(),
            Some(OnnxError::ModelNotFound(_))
        ));
    }

    // Set ORT_TEST_INT_MODEL to an ONNX file with one [1, 3] float input and
    // an int64 output (an argmax head, for example).
    #[test]
    #[ignore]
    fn non_float_output_is_a_backend_error() {
        let path = std::env::var("ORT_TEST_INT_MODEL").expect("ORT_TEST_INT_MODEL required");
        let _guard = serial();
        let runner = Runner::new(OrtBackend, RunnerOptions::default());
        let session = runner.load_model(&path).unwrap();
        let err = session.run(&[1.0f32, 2.0, 3.0][..]).unwrap_err();
        assert!(matches!(err, OnnxError::Backend { context: "run", .. }), "{err}");
        assert!(err.to_string().contains("not float"), "{err}");
    }
}
