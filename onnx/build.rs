use std::env;

fn main() {
    println!("cargo:rerun-if-changed=csrc/ort_shim.c");
    println!("cargo:rerun-if-env-changed=ORT_INCLUDE_DIR");
    println!("cargo:rerun-if-env-changed=ORT_LIB_DIR");

    // The shim is only needed when linking the real runtime.
    if env::var_os("CARGO_FEATURE_ORT").is_none() {
        return;
    }

    let mut build = cc::Build::new();
    build.file("csrc/ort_shim.c");
    if let Ok(include) = env::var("ORT_INCLUDE_DIR") {
        build.include(include);
    }
    build.compile("ort_shim");

    if let Ok(lib_dir) = env::var("ORT_LIB_DIR") {
        println!("cargo:rustc-link-search=native={lib_dir}");
    }
    println!("cargo:rustc-link-lib=onnxruntime");
}
