fn main() {
    println!("cargo:rerun-if-changed=src/ffi.rs");

    let Ok(crate_dir) = std::env::var("CARGO_MANIFEST_DIR") else {
        return;
    };
    let config = cbindgen::Config::from_file("cbindgen.toml").unwrap_or_default();

    if let Ok(bindings) = cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_config(config)
        .with_language(cbindgen::Language::C)
        .generate()
    {
        bindings.write_to_file(format!("{}/include/joycon_motion.h", crate_dir));
    }
}
