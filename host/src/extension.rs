//! Module lifecycle: what the plugin registers when the engine loads it.

use gdort_onnx::{Backend, Runner};

use crate::config::HostConfig;
use crate::engine::Engine;
use crate::logging::init_logging;
use crate::object::{HostClass, ObjectId};
use crate::runner_object::OnnxRunner;
use crate::session_object::OnnxSession;

/// Name the runner is registered under.
pub const RUNNER_SINGLETON: &str = "OnnxRunner";

/// Engine initialization stages, in the order they run on load.
/// Termination runs them in reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum InitializationLevel {
    Core,
    Servers,
    Scene,
    Editor,
}

/// The plugin's entry points.
///
/// At [`InitializationLevel::Scene`] it registers the `OnnxSession` and
/// `OnnxRunner` classes, creates the process's [`Runner`] and publishes it
/// as the `OnnxRunner` singleton. Termination at the same level undoes all
/// of it and drops the Runner.
pub struct Extension<B: Backend + Clone + 'static> {
    backend: B,
    config: HostConfig,
    runner: Option<ObjectId>,
}

impl<B: Backend + Clone + 'static> Extension<B> {
    pub fn new(backend: B, config: HostConfig) -> Self {
        Self {
            backend,
            config,
            runner: None,
        }
    }

    /// The lowest level at which this plugin does anything besides logging.
    pub fn minimum_level() -> InitializationLevel {
        InitializationLevel::Scene
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Object id of the runner singleton while initialized.
    pub fn runner(&self) -> Option<ObjectId> {
        self.runner
    }

    pub fn initialize(&mut self, engine: &mut Engine, level: InitializationLevel) {
        match level {
            InitializationLevel::Core => {
                if let Some(filter) = &self.config.log_filter {
                    init_logging(filter);
                }
            }
            InitializationLevel::Scene => {
                engine.classes_mut().register_class::<OnnxSession<B::Model>>();
                engine.classes_mut().register_class::<OnnxRunner<B>>();

                let runner = Runner::new(self.backend.clone(), self.config.runner.clone());
                let id = engine
                    .objects_mut()
                    .insert(Box::new(OnnxRunner::new(runner, self.config.paths())));
                if let Err(e) = engine.register_singleton(RUNNER_SINGLETON, id) {
                    panic!("{e}");
                }
                self.runner = Some(id);
                tracing::info!("host: onnx runner initialized");
            }
            InitializationLevel::Servers | InitializationLevel::Editor => {}
        }
    }

    pub fn terminate(&mut self, engine: &mut Engine, level: InitializationLevel) {
        if level != InitializationLevel::Scene {
            return;
        }
        engine.unregister_singleton(RUNNER_SINGLETON);
        if let Some(id) = self.runner.take() {
            engine.objects_mut().free(id);
        }
        engine.classes_mut().unregister_class(<OnnxRunner<B> as HostClass>::NAME);
        engine.classes_mut().unregister_class(<OnnxSession<B::Model> as HostClass>::NAME);
        tracing::info!("host: onnx runner terminated");
    }
}
