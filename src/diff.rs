//! Sorted merge-join comparison of two catalogs.
//!
//! Both entry points reduce their inputs to path-sorted record lists and
//! walk them in lockstep. Duplicate paths are kept; each copy pairs with at
//! most one record on the other side.

use crate::catalog::{CatalogError, FileCatalog, FileRecord};
use crate::context::{Counters, RunContext};
use crate::exit_status::ExitStatus;
use crate::manifest::{self, ManifestError};
use crate::scan::{self, ScanError, ScanRoot};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),
    #[error("Failed to scan {path}: {source}")]
    Scan { path: PathBuf, source: ScanError },
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("Interrupted while comparing")]
    Interrupted,
}

impl DiffError {
    pub fn exit_status(&self) -> ExitStatus {
        match self {
            DiffError::Manifest(e) => e.exit_status(),
            DiffError::Scan { source, .. } => source.exit_status(),
            DiffError::Catalog(e) => e.exit_status(),
            DiffError::Interrupted => ExitStatus::Interrupted,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffReport {
    /// Paths present on both sides with equal digests.
    pub same: usize,
    /// Paths present on both sides whose digests differ, in path order.
    pub different: Vec<String>,
    pub only_in_a: Vec<String>,
    pub only_in_b: Vec<String>,
    pub counters: Counters,
}

impl DiffReport {
    pub fn is_identical(&self) -> bool {
        self.different.is_empty() && self.only_in_a.is_empty() && self.only_in_b.is_empty()
    }
}

/// Compare two manifest files entry by entry.
pub fn diff_manifests(a: &Path, b: &Path, ctx: &RunContext) -> Result<DiffReport, DiffError> {
    info!("Comparing manifests {} and {}", a.display(), b.display());

    let left = manifest::load(a)?.into_sorted();
    let right = manifest::load(b)?.into_sorted();

    merge_join(&left, &right, ctx)
}

/// Scan two directory trees and compare their contents by root-relative
/// path.
pub fn diff_directories(a: &Path, b: &Path, ctx: &RunContext) -> Result<DiffReport, DiffError> {
    info!("Comparing directories {} and {}", a.display(), b.display());

    let left = relative_catalog(a, ctx)?;
    let right = relative_catalog(b, ctx)?;

    merge_join(&left, &right, ctx)
}

/// Scans `root` and returns its records keyed by path relative to `root`,
/// sorted.
fn relative_catalog(root: &Path, ctx: &RunContext) -> Result<Vec<FileRecord>, DiffError> {
    let scan_err = |source| DiffError::Scan {
        path: root.to_path_buf(),
        source,
    };
    let scan_root = ScanRoot::new(root).map_err(scan_err)?;
    let scanned = FileCatalog::new();
    scan::scan(root, &scanned, ctx).map_err(scan_err)?;

    let mut records = scanned
        .into_records()
        .into_iter()
        .map(|record| {
            let path = scan_root.relative(record.path()).unwrap_or(record.path());
            record.with_path(path)
        })
        .collect::<Result<Vec<_>, _>>()?;
    records.sort_by(|x, y| x.path().cmp(y.path()));
    Ok(records)
}

/// Linear merge of two path-sorted record lists.
fn merge_join(
    left: &[FileRecord],
    right: &[FileRecord],
    ctx: &RunContext,
) -> Result<DiffReport, DiffError> {
    let mut report = DiffReport::default();
    let mut i = 0;
    let mut j = 0;

    while i < left.len() || j < right.len() {
        if ctx.is_cancelled() {
            return Err(DiffError::Interrupted);
        }
        ctx.stats.add_processed(1);

        let order = match (left.get(i), right.get(j)) {
            (Some(a), Some(b)) => a.path().cmp(b.path()),
            (Some(_), None) => Ordering::Less,
            (None, _) => Ordering::Greater,
        };

        match order {
            Ordering::Equal => {
                let (a, b) = (&left[i], &right[j]);
                if a.digest() == b.digest() {
                    debug!("Same: {}", a.path());
                    report.same += 1;
                } else {
                    debug!("Different: {}", a.path());
                    report.different.push(a.path().to_string());
                }
                i += 1;
                j += 1;
            }
            Ordering::Less => {
                debug!("Only in A: {}", left[i].path());
                report.only_in_a.push(left[i].path().to_string());
                i += 1;
            }
            Ordering::Greater => {
                debug!("Only in B: {}", right[j].path());
                report.only_in_b.push(right[j].path().to_string());
                j += 1;
            }
        }
    }

    report.counters = ctx.stats.snapshot();
    info!(
        "{} same, {} different, {} only in A, {} only in B",
        report.same,
        report.different.len(),
        report.only_in_a.len(),
        report.only_in_b.len()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const DIGEST_A: &str = "559aead08264d5795d3909718cdd05abd49572e84fe55590eef31a88a08fdffd";
    const DIGEST_B: &str = "df7e70e5021544f4834bbee64a9e3789febc4be81470df629cad6ddb03320a5c";

    fn records(entries: &[(&str, &str)]) -> Vec<FileRecord> {
        entries
            .iter()
            .map(|(path, digest)| FileRecord::new(*path, *digest, 0, None).unwrap())
            .collect()
    }

    fn tree(files: &[(&str, &str)]) -> TempDir {
        let temp = TempDir::new().unwrap();
        for (path, content) in files {
            let full = temp.path().join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(full, content).unwrap();
        }
        temp
    }

    #[test]
    fn test_merge_join_classifies_every_path() {
        let left = records(&[("a", DIGEST_A), ("b", DIGEST_A), ("c", DIGEST_A)]);
        let right = records(&[("b", DIGEST_A), ("c", DIGEST_B), ("d", DIGEST_A)]);

        let report = merge_join(&left, &right, &RunContext::default()).unwrap();

        assert_eq!(report.same, 1);
        assert_eq!(report.different, vec!["c"]);
        assert_eq!(report.only_in_a, vec!["a"]);
        assert_eq!(report.only_in_b, vec!["d"]);
        assert_eq!(report.counters.processed, 4);
        assert!(!report.is_identical());
    }

    #[test]
    fn test_merge_join_empty_inputs_are_identical() {
        let report = merge_join(&[], &[], &RunContext::default()).unwrap();
        assert!(report.is_identical());
        assert_eq!(report.same, 0);
    }

    #[test]
    fn test_merge_join_keeps_duplicates() {
        let left = records(&[("x", DIGEST_A), ("x", DIGEST_A)]);
        let right = records(&[("x", DIGEST_A)]);

        let report = merge_join(&left, &right, &RunContext::default()).unwrap();

        assert_eq!(report.same, 1);
        assert_eq!(report.only_in_a, vec!["x"]);
    }

    #[test]
    fn test_merge_join_drains_longer_side() {
        let left = records(&[("a", DIGEST_A)]);
        let right = records(&[("a", DIGEST_A), ("b", DIGEST_A), ("c", DIGEST_B)]);

        let report = merge_join(&left, &right, &RunContext::default()).unwrap();

        assert_eq!(report.same, 1);
        assert_eq!(report.only_in_b, vec!["b", "c"]);
    }

    #[test]
    fn test_merge_join_cancelled() {
        let ctx = RunContext::default();
        ctx.cancel.cancel();
        let left = records(&[("a", DIGEST_A)]);

        let err = merge_join(&left, &[], &ctx).unwrap_err();

        assert_eq!(err.exit_status(), ExitStatus::Interrupted);
    }

    #[test]
    fn test_diff_manifests_sorts_before_joining() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a.sha256");
        let b = temp.path().join("b.sha256");
        fs::write(&a, format!("{DIGEST_B} *z\n{DIGEST_A} *m\n{DIGEST_A} *a\n")).unwrap();
        fs::write(&b, format!("{DIGEST_A} *a\n{DIGEST_A} *m\n{DIGEST_B} *z\n")).unwrap();

        let report = diff_manifests(&a, &b, &RunContext::default()).unwrap();

        assert!(report.is_identical());
        assert_eq!(report.same, 3);
    }

    #[test]
    fn test_diff_manifests_missing_file() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a.sha256");
        fs::write(&a, format!("{DIGEST_A} *a\n")).unwrap();

        let err = diff_manifests(&a, &temp.path().join("missing"), &RunContext::default())
            .unwrap_err();

        assert!(matches!(err, DiffError::Manifest(_)));
        assert_eq!(err.exit_status(), ExitStatus::FileIoError);
    }

    #[test]
    fn test_diff_directories_identical_trees() {
        let files = [("a.txt", "A"), ("sub/b.txt", "B")];
        let left = tree(&files);
        let right = tree(&files);

        let report = diff_directories(left.path(), right.path(), &RunContext::default()).unwrap();

        assert!(report.is_identical());
        assert_eq!(report.same, 2);
    }

    #[test]
    fn test_diff_directories_is_symmetric() {
        let left = tree(&[("a.txt", "A"), ("both.txt", "same"), ("changed.txt", "1")]);
        let right = tree(&[("b.txt", "B"), ("c.txt", "C"), ("both.txt", "same"), ("changed.txt", "2")]);

        let forward = diff_directories(left.path(), right.path(), &RunContext::default()).unwrap();
        let backward = diff_directories(right.path(), left.path(), &RunContext::default()).unwrap();

        assert_eq!(forward.same, 1);
        assert_eq!(forward.different, vec!["changed.txt"]);
        assert_eq!(forward.only_in_a, vec!["a.txt"]);
        assert_eq!(forward.only_in_b, vec!["b.txt", "c.txt"]);

        assert_eq!(backward.same, forward.same);
        assert_eq!(backward.different, forward.different);
        assert_eq!(backward.only_in_a, forward.only_in_b);
        assert_eq!(backward.only_in_b, forward.only_in_a);
    }

    #[test]
    fn test_diff_directories_missing_root() {
        let left = tree(&[("a.txt", "A")]);

        let err = diff_directories(
            left.path(),
            &left.path().join("missing"),
            &RunContext::default(),
        )
        .unwrap_err();

        assert!(matches!(err, DiffError::Scan { .. }));
        assert_eq!(err.exit_status(), ExitStatus::FileIoError);
    }

    #[test]
    fn test_diff_directories_respects_policy() {
        let left = tree(&[("a.txt", "A"), ("skip.tmp", "1")]);
        let right = tree(&[("a.txt", "A"), ("skip.tmp", "2")]);
        let ctx = RunContext {
            policy: crate::context::ScanPolicy {
                exclude: vec![".tmp".to_string()],
                ..Default::default()
            },
            ..RunContext::default()
        };

        let report = diff_directories(left.path(), right.path(), &ctx).unwrap();

        assert!(report.is_identical());
    }
}
