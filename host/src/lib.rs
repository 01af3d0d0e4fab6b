//! Engine-side object model for the ONNX runner plugin.
//!
//! The embedding engine owns object lifetimes and method dispatch; this
//! crate models that surface so the runner can be exposed to scripts:
//!
//! - [`Variant`]: values crossing the script boundary.
//! - [`Engine`]: class registry, object table and named singletons.
//! - [`Extension`]: register-on-load / unregister-on-unload hooks.
//! - [`OnnxRunner`] / [`OnnxSession`]: the two script-visible classes.
//!
//! Methods never fail across the script boundary for bad data: they log an
//! error and return `Nil` (or an empty array/string for accessors).
//!
//! ```
//! use gdort_host::{Engine, Extension, HostConfig, InitializationLevel, Variant, RUNNER_SINGLETON};
//! use gdort_onnx::testing::StubBackend;
//!
//! let mut engine = Engine::new();
//! let mut ext = Extension::new(StubBackend::new(), HostConfig::default());
//! ext.initialize(&mut engine, InitializationLevel::Scene);
//!
//! let session = engine
//!     .call_singleton(RUNNER_SINGLETON, "load_model", &[Variant::from("res://missing.onnx")])
//!     .unwrap();
//! assert!(session.is_nil());
//!
//! ext.terminate(&mut engine, InitializationLevel::Scene);
//! ```

mod class_db;
mod config;
mod engine;
mod error;
mod extension;
mod logging;
mod object;
mod paths;
mod runner_object;
mod session_object;
mod variant;

pub use class_db::ClassDb;
pub use config::{HostConfig, DEFAULT_CONFIG_FILE};
pub use engine::Engine;
pub use error::{CallError, ConfigError};
pub use extension::{Extension, InitializationLevel, RUNNER_SINGLETON};
pub use logging::init_logging;
pub use object::{HostClass, HostObject, MethodInfo, ObjectDb, ObjectId};
pub use paths::ProjectPaths;
pub use runner_object::OnnxRunner;
pub use session_object::OnnxSession;
pub use variant::Variant;
