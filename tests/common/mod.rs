use assert_cmd::{Command, cargo::cargo_bin_cmd};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const DIGEST_A: &str = "559aead08264d5795d3909718cdd05abd49572e84fe55590eef31a88a08fdffd";
pub const DIGEST_B: &str = "df7e70e5021544f4834bbee64a9e3789febc4be81470df629cad6ddb03320a5c";

/// The binary with `RUST_LOG` cleared, so log assertions see only what the
/// flags under test ask for.
pub fn mirrorguard_cmd() -> Command {
    let mut cmd = cargo_bin_cmd!("mirrorguard");
    cmd.env_remove("RUST_LOG");
    cmd
}

/// Creates a directory holding `files`, given as `(relative path, contents)`.
pub fn tree(files: &[(&str, &str)]) -> TempDir {
    let temp = TempDir::new().unwrap();
    for (path, contents) in files {
        let full = temp.path().join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, contents).unwrap();
    }
    temp
}

// Each integration test file is compiled as its own crate; not all of them
// generate manifests through the binary.
#[allow(dead_code)]
pub fn generate_manifest(source: &Path, out: &TempDir) -> PathBuf {
    let manifest = out.path().join("manifest.sha256");
    mirrorguard_cmd()
        .arg("generate")
        .arg(source)
        .arg(&manifest)
        .assert()
        .success();
    manifest
}
