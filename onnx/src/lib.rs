//! Model runner and session wrapper over ONNX Runtime.
//!
//! A [`Runner`] loads model files into [`Session`]s. A session caches the
//! model's input/output names and shapes at load time and runs one
//! synchronous forward pass per [`Session::run`] call over caller-owned
//! `f32` buffers.
//!
//! # Usage
//!
//! ```no_run
//! # #[cfg(feature = "ort")] {
//! use gdort_onnx::{OrtBackend, RunOutput, Runner, RunnerOptions};
//!
//! let runner = Runner::new(OrtBackend, RunnerOptions::default());
//! let session = runner.load_model("models/sum.onnx").unwrap();
//! assert_eq!(session.input_shape(0).unwrap(), &[1, 3]);
//!
//! match session.run(&[1.0f32, 2.0, 3.0][..]).unwrap() {
//!     RunOutput::Single(out) => println!("{out:?}"),
//!     RunOutput::List(outs) => println!("{} outputs", outs.len()),
//! }
//! # }
//! ```
//!
//! # Errors
//!
//! The runtime is driven without unwinding across the FFI boundary. Failing
//! backend calls report through [`report`] to the thread's [`ErrorScope`];
//! every backend call made by the runner and sessions is wrapped in one, and
//! the first reported failure becomes [`OnnxError::Backend`].
//!
//! # Linking
//!
//! With the `ort` feature, ONNX Runtime is dynamically linked through the C
//! shim in `csrc/`. Set `ORT_INCLUDE_DIR` and `ORT_LIB_DIR` to a release of
//! the runtime.

mod backend;
mod catcher;
mod error;
#[cfg(feature = "ort")]
mod ffi;
mod metadata;
#[cfg(feature = "ort")]
mod onnx;
mod options;
mod runner;
mod session;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use backend::{Backend, Model, OutputTensor, TensorBinding};
pub use catcher::{report, ErrorInfo, ErrorScope};
pub use error::OnnxError;
pub use metadata::{ModelMetadata, TensorInfo};
#[cfg(feature = "ort")]
pub use onnx::{OrtBackend, OrtEnvironment, OrtModel, OrtOutput};
pub use options::{GraphOptimization, LogLevel, RunnerOptions, SessionOptions};
pub use runner::Runner;
pub use session::{RunOutput, Session, TensorInput};
