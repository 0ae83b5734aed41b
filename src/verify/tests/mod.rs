use super::*;
use crate::context::ScanPolicy;
use crate::generate::generate;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const DIGEST_A: &str = "559aead08264d5795d3909718cdd05abd49572e84fe55590eef31a88a08fdffd";
const DIGEST_B: &str = "df7e70e5021544f4834bbee64a9e3789febc4be81470df629cad6ddb03320a5c";

/// A mirror holding `a.txt` ("A") and `b.txt` ("B"), plus a directory for the
/// manifest kept outside the mirror.
struct Fixture {
    mirror: TempDir,
    out: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let mirror = TempDir::new().unwrap();
        fs::write(mirror.path().join("a.txt"), "A").unwrap();
        fs::write(mirror.path().join("b.txt"), "B").unwrap();
        Fixture {
            mirror,
            out: TempDir::new().unwrap(),
        }
    }

    fn root(&self) -> &Path {
        self.mirror.path()
    }

    fn manifest(&self) -> PathBuf {
        self.out.path().join("manifest.sha256")
    }

    fn generate(&self) {
        generate(&[self.root().to_path_buf()], &self.manifest(), &RunContext::default()).unwrap();
    }

    fn write_manifest(&self, text: &str) {
        fs::write(self.manifest(), text).unwrap();
    }
}

fn ctx_with(policy: ScanPolicy) -> RunContext {
    RunContext {
        policy,
        ..RunContext::default()
    }
}

/// Runs a verification that is expected to complete, passing or failing.
fn run(mirror: &Path, manifest: &Path, ctx: &RunContext) -> VerifyReport {
    match verify(mirror, manifest, ctx) {
        Ok(report) => report,
        Err(VerifyError::Failed(report)) => *report,
        Err(e) => panic!("verification did not complete: {e}"),
    }
}

fn paths(report: &VerifyReport, verdict: Verdict) -> Vec<&str> {
    report
        .entries
        .iter()
        .filter(|e| e.verdict == verdict)
        .map(|e| e.path.as_str())
        .collect()
}

#[cfg(unix)]
#[path = "unix.rs"]
mod unix_tests;
