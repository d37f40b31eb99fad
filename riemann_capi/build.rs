//! A build script to install the C++ interface to `riemann`

use std::env;
use std::fs;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=include/riemann.hpp");
    println!("cargo:rerun-if-env-changed=CARGO_C_RIEMANN_INSTALL_PREFIX");

    if let Ok(prefix) = env::var("CARGO_C_RIEMANN_INSTALL_PREFIX") {
        let prefix_path = PathBuf::from(prefix);
        let include_path = prefix_path.join("include").join("riemann_capi");

        fs::create_dir_all(&include_path).expect("Failed to create include directory.");

        let source_header = PathBuf::from("include/riemann.hpp");
        let dest_header = include_path.join("riemann.hpp");

        fs::copy(&source_header, &dest_header).expect("Failed to copy header file.");
    }
}
