use std::env;
use std::path::PathBuf;

fn main() {
    let crate_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string()));
    let header = crate_dir.join("include").join("flipped.h");

    println!("cargo:rerun-if-changed=src/lib.rs");
    println!("cargo:rerun-if-changed=src/types.rs");

    let config = cbindgen::Config {
        language: cbindgen::Language::C,
        include_guard: Some("FLIPPED_FFI_H".to_string()),
        cpp_compat: true,
        ..Default::default()
    };

    // A stale or missing header must not break the Rust build.
    match cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_config(config)
        .generate()
    {
        Ok(bindings) => {
            bindings.write_to_file(header);
        }
        Err(err) => println!("cargo:warning=C header not generated: {err}"),
    }
}
