//! Raw FFI bindings for the ONNX Runtime C API.
//!
//! The C API is a table of function pointers; `csrc/ort_shim.c` wraps the
//! subset we call in plain C functions so they can be declared here directly.

use std::os::raw::{c_char, c_float, c_int, c_void};

// Opaque types. The ORT C API hands out opaque pointers only.
pub type OrtApi = c_void;
pub type OrtEnv = c_void;
pub type OrtSession = c_void;
pub type OrtSessionOptions = c_void;
pub type OrtMemoryInfo = c_void;
pub type OrtValue = c_void;
pub type OrtStatus = c_void;

/// `OrtLoggingFunction`.
pub type OrtLoggingFn = unsafe extern "C" fn(
    param: *mut c_void,
    severity: c_int,
    category: *const c_char,
    logid: *const c_char,
    code_location: *const c_char,
    message: *const c_char,
);

unsafe extern "C" {
    pub fn ort_api() -> *const OrtApi;
    pub fn ort_create_env(
        api: *const OrtApi,
        log_level: c_int,
        name: *const c_char,
        logger: OrtLoggingFn,
        out: *mut *mut OrtEnv,
    ) -> *mut OrtStatus;
    pub fn ort_create_session_options(
        api: *const OrtApi,
        intra_op_threads: c_int,
        graph_optimization: c_int,
        out: *mut *mut OrtSessionOptions,
    ) -> *mut OrtStatus;
    pub fn ort_create_session_from_memory(
        api: *const OrtApi,
        env: *mut OrtEnv,
        model_data: *const c_void,
        model_data_len: usize,
        opts: *mut OrtSessionOptions,
        out: *mut *mut OrtSession,
    ) -> *mut OrtStatus;

    // is_output selects the session's outputs (1) or inputs (0).
    pub fn ort_session_io_count(
        api: *const OrtApi,
        session: *mut OrtSession,
        is_output: c_int,
        out: *mut usize,
    ) -> *mut OrtStatus;
    pub fn ort_session_io_name(
        api: *const OrtApi,
        session: *mut OrtSession,
        is_output: c_int,
        index: usize,
        out: *mut *mut c_char,
    ) -> *mut OrtStatus;
    pub fn ort_free_name(api: *const OrtApi, name: *mut c_char);
    pub fn ort_session_io_ndim(
        api: *const OrtApi,
        session: *mut OrtSession,
        is_output: c_int,
        index: usize,
        out: *mut usize,
    ) -> *mut OrtStatus;
    pub fn ort_session_io_dims(
        api: *const OrtApi,
        session: *mut OrtSession,
        is_output: c_int,
        index: usize,
        dims: *mut i64,
        dims_len: usize,
    ) -> *mut OrtStatus;

    pub fn ort_create_cpu_memory_info(api: *const OrtApi, out: *mut *mut OrtMemoryInfo) -> *mut OrtStatus;
    pub fn ort_create_tensor_float(
        api: *const OrtApi,
        info: *mut OrtMemoryInfo,
        data: *mut c_float,
        data_len: usize,
        shape: *const i64,
        shape_len: usize,
        out: *mut *mut OrtValue,
    ) -> *mut OrtStatus;
    pub fn ort_run(
        api: *const OrtApi,
        session: *mut OrtSession,
        input_names: *const *const c_char,
        inputs: *const *const OrtValue,
        num_inputs: usize,
        output_names: *const *const c_char,
        num_outputs: usize,
        outputs: *mut *mut OrtValue,
    ) -> *mut OrtStatus;
    pub fn ort_get_tensor_float_data(api: *const OrtApi, value: *mut OrtValue, out: *mut *mut c_float) -> *mut OrtStatus;
    pub fn ort_get_tensor_element_count(api: *const OrtApi, value: *mut OrtValue, out: *mut usize) -> *mut OrtStatus;

    pub fn ort_error_message(api: *const OrtApi, status: *mut OrtStatus) -> *const c_char;
    pub fn ort_error_code(api: *const OrtApi, status: *mut OrtStatus) -> c_int;
    pub fn ort_release_status(api: *const OrtApi, status: *mut OrtStatus);
    pub fn ort_release_env(api: *const OrtApi, env: *mut OrtEnv);
    pub fn ort_release_session(api: *const OrtApi, s: *mut OrtSession);
    pub fn ort_release_session_options(api: *const OrtApi, o: *mut OrtSessionOptions);
    pub fn ort_release_memory_info(api: *const OrtApi, i: *mut OrtMemoryInfo);
    pub fn ort_release_value(api: *const OrtApi, v: *mut OrtValue);
}
