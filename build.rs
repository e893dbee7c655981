#[cfg(feature = "headers")]
fn generate_headers() {
    use std::env;
    use std::path::Path;

    let crate_dir = env::var("CARGO_MANIFEST_DIR").unwrap();
    let out = Path::new(&crate_dir).join("include").join("header.h");
    cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_language(cbindgen::Language::C)
        .with_include_guard("FKMEANS_H")
        .generate()
        .expect("Unable to generate C bindings")
        .write_to_file(out);
}

fn main() {
    println!("cargo:rerun-if-changed=src/ffi.rs");
    #[cfg(feature = "headers")]
    generate_headers();
}
