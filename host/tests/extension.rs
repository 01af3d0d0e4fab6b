use std::path::Path;

use gdort_host::{
    CallError, Engine, Extension, HostConfig, HostObject, InitializationLevel, ObjectDb, OnnxRunner,
    OnnxSession, ProjectPaths, Variant, RUNNER_SINGLETON,
};
use gdort_onnx::testing::{serial, write_model, StubBackend};
use gdort_onnx::{Runner, RunnerOptions};

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

const SPLIT_MODEL: &str = "
inputs:
  - { name: left, shape: [1] }
  - { name: right, shape: [2] }
outputs:
  - { name: left_out, shape: [1] }
  - { name: right_out, shape: [2] }
op: identity
";

const FAILING_MODEL: &str = "
inputs:
  - { name: x, shape: [1] }
outputs:
  - { name: y, shape: [1] }
op: fail
reports:
  - { message: bad shape, code: 7 }
  - { message: also bad, code: 8 }
";

fn setup(root: &Path) -> (Engine, Extension<StubBackend>, StubBackend) {
    let backend = StubBackend::new();
    let config = HostConfig {
        project_root: root.to_path_buf(),
        user_dir: Some(root.join("user")),
        ..HostConfig::default()
    };
    let mut engine = Engine::new();
    let mut ext = Extension::new(backend.clone(), config);
    for level in [
        InitializationLevel::Core,
        InitializationLevel::Servers,
        InitializationLevel::Scene,
    ] {
        ext.initialize(&mut engine, level);
    }
    (engine, ext, backend)
}

fn load(engine: &mut Engine, path: &str) -> Variant {
    engine
        .call_singleton(RUNNER_SINGLETON, "load_model", &[Variant::from(path)])
        .unwrap()
}

#[test]
fn registers_classes_and_singleton() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let (mut engine, mut ext, _) = setup(dir.path());

    assert!(engine.classes().is_registered("OnnxRunner"));
    assert!(engine.classes().is_registered("OnnxSession"));
    let id = engine.get_singleton(RUNNER_SINGLETON).unwrap();
    assert_eq!(ext.runner(), Some(id));
    assert!(engine.objects().downcast_ref::<OnnxRunner<StubBackend>>(id).is_some());
    assert!(Runner::<StubBackend>::exists());

    ext.terminate(&mut engine, InitializationLevel::Scene);
    assert!(engine.get_singleton(RUNNER_SINGLETON).is_none());
    assert!(!engine.classes().is_registered("OnnxRunner"));
    assert!(!engine.classes().is_registered("OnnxSession"));
    assert!(engine.objects().is_empty());
    assert!(!Runner::<StubBackend>::exists());
}

#[test]
fn run_sum_model_from_res_path() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    write_model(dir.path(), "sum.yaml", SUM_MODEL);
    let (mut engine, mut ext, backend) = setup(dir.path());

    let session = load(&mut engine, "res://sum.yaml").as_object().unwrap();
    assert_eq!(engine.call(session, "num_inputs", &[]).unwrap(), Variant::Int(1));
    assert_eq!(engine.call(session, "num_outputs", &[]).unwrap(), Variant::Int(1));
    assert_eq!(
        engine.call(session, "input_shape", &[Variant::Int(0)]).unwrap(),
        Variant::PackedInt64Array(vec![1, 3])
    );
    assert_eq!(
        engine.call(session, "input_name", &[Variant::Int(0)]).unwrap(),
        Variant::from("x")
    );
    assert_eq!(
        engine.call(session, "output_shape", &[Variant::Int(0)]).unwrap(),
        Variant::PackedInt64Array(vec![1, 1])
    );
    assert_eq!(
        engine.call(session, "output_name", &[Variant::Int(0)]).unwrap(),
        Variant::from("y")
    );

    let out = engine
        .call(session, "run", &[Variant::from(vec![1.0f32, 2.0, 3.0])])
        .unwrap();
    assert_eq!(out, Variant::PackedFloat32Array(vec![6.0]));
    assert_eq!(backend.stats().runs(), 1);

    ext.terminate(&mut engine, InitializationLevel::Scene);
}

#[test]
fn run_add_model_with_array_input() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let path = write_model(dir.path(), "add.yaml", ADD_MODEL);
    let (mut engine, mut ext, _) = setup(dir.path());

    let session = load(&mut engine, path.to_str().unwrap()).as_object().unwrap();
    let input = Variant::Array(vec![
        Variant::from(vec![1.0f32, 2.0]),
        Variant::from(vec![3.0f32, 4.0]),
    ]);
    assert_eq!(
        engine.call(session, "run", &[input]).unwrap(),
        Variant::PackedFloat32Array(vec![4.0, 6.0])
    );

    ext.terminate(&mut engine, InitializationLevel::Scene);
}

#[test]
fn multi_output_returns_array() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    write_model(dir.path(), "split.yaml", SPLIT_MODEL);
    let (mut engine, mut ext, _) = setup(dir.path());

    let session = load(&mut engine, "res://split.yaml").as_object().unwrap();
    let input = Variant::Array(vec![Variant::from(vec![1.0f32]), Variant::from(vec![2.0f32, 3.0])]);
    assert_eq!(
        engine.call(session, "run", &[input]).unwrap(),
        Variant::Array(vec![
            Variant::PackedFloat32Array(vec![1.0]),
            Variant::PackedFloat32Array(vec![2.0, 3.0]),
        ])
    );
    assert_eq!(
        engine.call(session, "output_name", &[Variant::Int(1)]).unwrap(),
        Variant::from("right_out")
    );

    ext.terminate(&mut engine, InitializationLevel::Scene);
}

#[test]
fn bad_inputs_return_nil_without_running() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    write_model(dir.path(), "add.yaml", ADD_MODEL);
    let (mut engine, mut ext, backend) = setup(dir.path());
    let session = load(&mut engine, "res://add.yaml").as_object().unwrap();

    // Bare buffer for a two-input model.
    let out = engine.call(session, "run", &[Variant::from(vec![1.0f32, 2.0])]).unwrap();
    assert!(out.is_nil());

    // Wrong element count.
    let input = Variant::Array(vec![Variant::from(vec![1.0f32]), Variant::from(vec![3.0f32, 4.0])]);
    assert!(engine.call(session, "run", &[input]).unwrap().is_nil());

    // Wrong element types.
    let input = Variant::Array(vec![Variant::Int(1), Variant::from(vec![3.0f32, 4.0])]);
    assert!(engine.call(session, "run", &[input]).unwrap().is_nil());
    assert!(engine.call(session, "run", &[Variant::from("text")]).unwrap().is_nil());

    assert_eq!(backend.stats().runs(), 0);
    ext.terminate(&mut engine, InitializationLevel::Scene);
}

#[test]
fn out_of_range_accessors_return_empty() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    write_model(dir.path(), "sum.yaml", SUM_MODEL);
    let (mut engine, mut ext, _) = setup(dir.path());
    let session = load(&mut engine, "res://sum.yaml").as_object().unwrap();

    for index in [1, -1, 100] {
        assert_eq!(
            engine.call(session, "input_shape", &[Variant::Int(index)]).unwrap(),
            Variant::PackedInt64Array(vec![])
        );
        assert_eq!(
            engine.call(session, "input_name", &[Variant::Int(index)]).unwrap(),
            Variant::from("")
        );
        assert_eq!(
            engine.call(session, "output_shape", &[Variant::Int(index)]).unwrap(),
            Variant::PackedInt64Array(vec![])
        );
        assert_eq!(
            engine.call(session, "output_name", &[Variant::Int(index)]).unwrap(),
            Variant::from("")
        );
    }

    assert!(matches!(
        engine.call(session, "input_shape", &[Variant::from("zero")]),
        Err(CallError::InvalidArgument { expected: "int", .. })
    ));
    ext.terminate(&mut engine, InitializationLevel::Scene);
}

#[test]
fn backend_failure_returns_nil() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    write_model(dir.path(), "fail.yaml", FAILING_MODEL);
    let (mut engine, mut ext, backend) = setup(dir.path());
    let session = load(&mut engine, "res://fail.yaml").as_object().unwrap();

    assert!(engine.call(session, "run", &[Variant::from(vec![0.0f32])]).unwrap().is_nil());
    assert_eq!(backend.stats().runs(), 1);
    ext.terminate(&mut engine, InitializationLevel::Scene);
}

#[test]
fn load_failures_return_nil() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    write_model(dir.path(), "broken.onnx", "inputs: [");
    let (mut engine, mut ext, backend) = setup(dir.path());

    assert!(load(&mut engine, "res://missing.onnx").is_nil());
    assert_eq!(backend.stats().envs(), 0);
    assert!(load(&mut engine, "res://broken.onnx").is_nil());
    assert!(load(&mut engine, "user://missing.onnx").is_nil());
    assert!(matches!(
        engine.call_singleton(RUNNER_SINGLETON, "load_model", &[Variant::Int(3)]),
        Err(CallError::InvalidArgument { expected: "String", .. })
    ));
    // Only the runner itself is alive.
    assert_eq!(engine.objects().len(), 1);

    ext.terminate(&mut engine, InitializationLevel::Scene);
}

#[test]
fn sessions_unusable_after_terminate() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    write_model(dir.path(), "sum.yaml", SUM_MODEL);
    let (mut engine, mut ext, _) = setup(dir.path());
    let session = load(&mut engine, "res://sum.yaml").as_object().unwrap();

    ext.terminate(&mut engine, InitializationLevel::Scene);
    assert!(matches!(
        engine.call(session, "num_inputs", &[]),
        Err(CallError::ClassNotRegistered(_))
    ));
    assert!(engine.objects_mut().free(session));
}

#[test]
fn other_levels_do_nothing() {
    let _guard = serial();
    let mut engine = Engine::new();
    let mut ext = Extension::new(StubBackend::new(), HostConfig::default());
    ext.initialize(&mut engine, InitializationLevel::Servers);
    ext.initialize(&mut engine, InitializationLevel::Editor);
    assert!(engine.get_singleton(RUNNER_SINGLETON).is_none());
    assert_eq!(Extension::<StubBackend>::minimum_level(), InitializationLevel::Scene);
    ext.terminate(&mut engine, InitializationLevel::Editor);
    assert!(!Runner::<StubBackend>::exists());
}

#[test]
#[should_panic(expected = "runner already exists")]
fn double_initialize_panics() {
    let _guard = serial();
    let mut engine = Engine::new();
    let mut ext = Extension::new(StubBackend::new(), HostConfig::default());
    ext.initialize(&mut engine, InitializationLevel::Scene);
    ext.initialize(&mut engine, InitializationLevel::Scene);
}

#[test]
fn direct_calls_with_missing_arguments_are_rejected() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    write_model(dir.path(), "sum.onnx", SUM_MODEL);
    let runner = Runner::new(StubBackend::new(), RunnerOptions::default());
    let mut objects = ObjectDb::new();

    let session = runner.load_model(dir.path().join("sum.onnx")).unwrap();
    let mut session = OnnxSession::new(session);
    for method in ["run", "input_shape", "input_name", "output_shape", "output_name"] {
        let err = session.call(method, &[], &mut objects).unwrap_err();
        assert!(
            matches!(err, CallError::ArgumentCount { expected: 1, got: 0, .. }),
            "{method}: {err}"
        );
    }

    let mut runner = OnnxRunner::new(runner, ProjectPaths::new(dir.path(), dir.path()));
    let err = runner.call("load_model", &[], &mut objects).unwrap_err();
    assert!(matches!(err, CallError::ArgumentCount { expected: 1, got: 0, .. }));
    assert!(objects.is_empty());
}
