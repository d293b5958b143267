//! Embeds the workspace `VERSION` file as `FIND_ME_VERSION`.

use std::path::Path;

fn main() {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").expect("manifest dir");
    let version_file = Path::new(&manifest_dir)
        .ancestors()
        .nth(2)
        .expect("workspace root")
        .join("VERSION");
    println!("cargo:rerun-if-changed={}", version_file.display());

    let version = std::fs::read_to_string(&version_file)
        .map(|raw| raw.trim().to_string())
        .expect("read VERSION file");
    if version.is_empty() {
        panic!("{} is empty", version_file.display());
    }

    println!("cargo:rustc-env=FIND_ME_VERSION={version}");
}
