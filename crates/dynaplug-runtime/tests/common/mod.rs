//! Builds the workspace's plugin modules for native loading tests

#![allow(dead_code)]

use std::env::consts::{DLL_EXTENSION, DLL_PREFIX};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

/// Sample plugin package
pub const SAMPLE: &str = "dynaplug-sample";

/// Package exporting `Execute` with a foreign signature
pub const BAD_SIGNATURE: &str = "dynaplug-fixture-bad-signature";

/// Package without an `Execute` export
pub const NO_ENTRY: &str = "dynaplug-fixture-no-entry";

fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../..")
}

/// Build all module packages once per test binary, returning the profile dir
fn build_dir() -> &'static Path {
    static BUILT: OnceLock<PathBuf> = OnceLock::new();

    BUILT.get_or_init(|| {
        let root = workspace_root();
        let target = match std::env::var_os("CARGO_TARGET_DIR").map(PathBuf::from) {
            Some(dir) if dir.is_absolute() => dir,
            Some(dir) => root.join(dir),
            None => root.join("target"),
        };
        // Separate dir so the build does not wait on the outer cargo lock
        let target_dir = target.join("native-modules");

        let status = Command::new(env!("CARGO"))
            .current_dir(&root)
            .args(["build", "--quiet"])
            .args(["-p", SAMPLE, "-p", BAD_SIGNATURE, "-p", NO_ENTRY])
            .arg("--target-dir")
            .arg(&target_dir)
            .status()
            .expect("failed to run cargo");
        assert!(status.success(), "building plugin modules failed");

        target_dir.join("debug")
    })
}

/// Path of a built module
pub fn module_path(package: &str) -> PathBuf {
    let file = format!(
        "{DLL_PREFIX}{}.{DLL_EXTENSION}",
        package.replace('-', "_")
    );
    build_dir().join(file)
}
