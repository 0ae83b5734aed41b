//! Directory tree walking for catalogs.
//!
//! The walk keeps an explicit stack of pending directories instead of
//! recursing, so nesting depth does not grow the call stack. Entries inside
//! one directory are visited in byte-sorted name order. Filters and the
//! traversal guard are applied to the path relative to the scan root.
//!
//! [`scan`], [`list`] and [`count`] share the same walk and therefore make the
//! same inclusion decisions; `count` exists so progress can be reported as a
//! fraction of the total.

use crate::catalog::{CatalogError, FileCatalog, FileRecord};
use crate::checksum::{ChecksumError, checksum_file};
use crate::context::RunContext;
use crate::exit_status::ExitStatus;
use crate::sanitize::{
    self, SanitizeError, is_safe, normalize, relative_to, should_exclude, should_exclude_dir,
};
use std::ffi::OsString;
use std::fs::Metadata;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("Invalid path {path}: {source}")]
    InvalidPath {
        path: PathBuf,
        source: SanitizeError,
    },
    #[error("Path is not valid UTF-8: {0}")]
    NonUtf8Path(PathBuf),
    #[error("Cannot read directory {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("Interrupted while scanning")]
    Interrupted,
}

impl ScanError {
    pub fn exit_status(&self) -> ExitStatus {
        match self {
            ScanError::InvalidPath { .. } | ScanError::NonUtf8Path(_) => ExitStatus::InvalidFormat,
            ScanError::Io { .. } | ScanError::PermissionDenied(_) | ScanError::NotADirectory(_) => {
                ExitStatus::FileIoError
            }
            ScanError::Catalog(e) => e.exit_status(),
            ScanError::Interrupted => ExitStatus::Interrupted,
        }
    }

    fn from_io(e: std::io::Error, path: &str) -> Self {
        if e.kind() == ErrorKind::PermissionDenied {
            ScanError::PermissionDenied(PathBuf::from(path))
        } else {
            ScanError::Io {
                path: PathBuf::from(path),
                source: e,
            }
        }
    }
}

/// A scan root in the two forms its records may be filed under.
///
/// Regular files are recorded beneath the normalized root. Symlink targets
/// inside the tree are recorded by their canonical path, which lies beneath
/// the canonical root; targets outside it are recorded under the link.
#[derive(Debug, Clone)]
pub struct ScanRoot {
    normalized: String,
    canonical: Option<String>,
}

impl ScanRoot {
    pub fn new(root: &Path) -> Result<Self, ScanError> {
        let raw = root
            .to_str()
            .ok_or_else(|| ScanError::NonUtf8Path(root.to_path_buf()))?;
        let normalized = normalize(raw).map_err(|source| ScanError::InvalidPath {
            path: root.to_path_buf(),
            source,
        })?;
        let canonical = root
            .canonicalize()
            .ok()
            .and_then(|p| p.to_str().and_then(|s| normalize(s).ok()));

        Ok(ScanRoot {
            normalized,
            canonical,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.normalized
    }

    /// Path of `path` relative to this root, if it lies beneath it.
    pub fn relative<'a>(&self, path: &'a str) -> Option<&'a str> {
        relative_to(path, &self.normalized).or_else(|| {
            self.canonical
                .as_deref()
                .and_then(|canonical| relative_to(path, canonical))
        })
    }
}

/// A regular file selected by the walk.
struct Found {
    /// Normalized path, or the canonical target for a followed symlink that
    /// stays inside the tree.
    path: String,
    size: u64,
    mtime: Option<SystemTime>,
}

impl Found {
    fn new(path: String, metadata: &Metadata) -> Self {
        Found {
            path,
            size: metadata.len(),
            mtime: metadata.modified().ok(),
        }
    }
}

/// Walks the tree under `root` and hashes every selected regular file into
/// `catalog`.
///
/// Per-file failures (unreadable file, unreadable subdirectory) are logged
/// and counted as errors without stopping the walk. Failure to read the root
/// itself, a full catalog and cancellation abort the scan; the catalog then
/// holds whatever was collected so far and must be discarded by the caller.
pub fn scan(root: &Path, catalog: &FileCatalog, ctx: &RunContext) -> Result<(), ScanError> {
    let total = ctx.stats.snapshot().total;
    walk(root, ctx, |found| {
        let checksum = match checksum_file(Path::new(&found.path), ctx) {
            Ok(checksum) => checksum,
            Err(ChecksumError::Interrupted(_)) => return Err(ScanError::Interrupted),
            Err(e) => {
                warn!("Failed to hash {}: {}", found.path, e);
                ctx.stats.add_error();
                return Ok(());
            }
        };

        let record = FileRecord::new(
            found.path,
            checksum.sha256,
            checksum.size,
            Some(checksum.mtime),
        )?;
        catalog.push(record)?;

        if let Some(total) = total {
            debug!("Hashed {}/{} files", catalog.len(), total);
        }
        Ok(())
    })
}

/// Walks the tree under `root` and records every selected regular file
/// without hashing it. Records carry an empty digest.
pub fn list(root: &Path, catalog: &FileCatalog, ctx: &RunContext) -> Result<(), ScanError> {
    walk(root, ctx, |found| {
        catalog.push(FileRecord::new(found.path, "", found.size, found.mtime)?)?;
        Ok(())
    })
}

/// Counts the files [`scan`] would hash under `root`.
///
/// Skipped entries are logged but not counted as errors; the scan that
/// follows counts them.
pub fn count(root: &Path, ctx: &RunContext) -> Result<usize, ScanError> {
    let counting = RunContext::new(ctx.policy.clone(), ctx.cancel.clone());
    let mut total = 0;
    walk(root, &counting, |_| {
        total += 1;
        Ok(())
    })?;
    Ok(total)
}

fn walk<F>(root: &Path, ctx: &RunContext, mut on_file: F) -> Result<(), ScanError>
where
    F: FnMut(Found) -> Result<(), ScanError>,
{
    let root = ScanRoot::new(root)?;
    let policy = &ctx.policy;

    let root_metadata =
        std::fs::metadata(root.as_str()).map_err(|e| ScanError::from_io(e, root.as_str()))?;
    if !root_metadata.is_dir() {
        return Err(ScanError::NotADirectory(PathBuf::from(root.as_str())));
    }

    info!("Scanning {}", root.as_str());

    let mut pending = vec![root.as_str().to_string()];

    while let Some(dir) = pending.pop() {
        let names = match read_sorted(&dir) {
            Ok(names) => names,
            Err(e) if dir == root.as_str() => return Err(ScanError::from_io(e, &dir)),
            Err(e) => {
                warn!("Cannot read directory '{}': {}", dir, e);
                ctx.stats.add_error();
                continue;
            }
        };

        let mut subdirs = Vec::new();

        for name in names {
            if ctx.is_cancelled() {
                return Err(ScanError::Interrupted);
            }

            let Some(name) = name.to_str() else {
                warn!("Skipping non UTF-8 name in {}: {:?}", dir, name);
                continue;
            };
            if name.contains('\\') {
                warn!("Cannot represent {}/{}: backslash in file name reads as a separator", dir, name);
                ctx.stats.add_error();
                continue;
            }

            let path = match sanitize::join(&dir, name) {
                Ok(path) => path,
                Err(e) => {
                    warn!("Skipping {}/{}: {}", dir, name, e);
                    continue;
                }
            };

            let relative = root.relative(&path).unwrap_or(&path);
            if !is_safe(relative) {
                warn!("Unsafe path, skipping: {}", path);
                continue;
            }

            let metadata = match std::fs::symlink_metadata(&path) {
                Ok(metadata) => metadata,
                Err(e) => {
                    warn!("Cannot stat '{}': {}", path, e);
                    continue;
                }
            };
            let file_type = metadata.file_type();

            if file_type.is_symlink() {
                if !policy.follow_symlinks || should_exclude(relative, policy) {
                    debug!("Skipping symlink {}", path);
                    continue;
                }
                if let Some(mut found) = resolve_symlink(&path) {
                    if root.relative(&found.path).is_none() {
                        debug!("Target of {} lies outside {}, filing under the link", path, root.as_str());
                        found.path = path;
                    }
                    on_file(found)?;
                }
            } else if file_type.is_dir() {
                if should_exclude_dir(relative, policy) {
                    debug!("Excluded directory {}", path);
                } else if policy.recursive {
                    subdirs.push(path);
                }
            } else if file_type.is_file() {
                if should_exclude(relative, policy) {
                    debug!("Excluded {}", path);
                } else {
                    on_file(Found::new(path, &metadata))?;
                }
            } else {
                debug!("Skipping special file {}", path);
            }
        }

        // Reversed so that the first subdirectory is popped next.
        pending.extend(subdirs.into_iter().rev());
    }

    Ok(())
}

fn read_sorted(dir: &str) -> std::io::Result<Vec<OsString>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        match entry {
            Ok(entry) => names.push(entry.file_name()),
            Err(e) => warn!("Cannot read entry in '{}': {}", dir, e),
        }
    }
    names.sort();
    Ok(names)
}

/// Resolves a symlink to a regular file.
///
/// A relative target is interpreted against the link's own directory and
/// then canonicalized, which also collapses any chain of links. Links to
/// anything other than a regular file, dangling links and link loops yield
/// `None`.
fn resolve_symlink(link: &str) -> Option<Found> {
    let target = match std::fs::read_link(link) {
        Ok(target) => target,
        Err(e) => {
            warn!("Cannot read symlink '{}': {}", link, e);
            return None;
        }
    };

    let link_dir = Path::new(link).parent().unwrap_or(Path::new("."));
    let candidate = if target.is_absolute() {
        target
    } else {
        link_dir.join(target)
    };

    let resolved = match candidate.canonicalize() {
        Ok(resolved) => resolved,
        Err(e) => {
            warn!("Cannot resolve symlink '{}': {}", link, e);
            return None;
        }
    };

    let metadata = match std::fs::metadata(&resolved) {
        Ok(metadata) if metadata.is_file() => metadata,
        Ok(_) => {
            debug!("Symlink {} does not point to a regular file", link);
            return None;
        }
        Err(e) => {
            warn!("Cannot stat symlink target '{}': {}", resolved.display(), e);
            return None;
        }
    };

    let resolved = resolved.to_str().and_then(|s| normalize(s).ok());
    match resolved {
        Some(path) => Some(Found::new(path, &metadata)),
        None => {
            warn!("Skipping symlink {} with unrepresentable target", link);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ScanPolicy;
    use std::fs;
    use tempfile::TempDir;

    fn ctx_with(policy: ScanPolicy) -> RunContext {
        RunContext {
            policy,
            ..RunContext::default()
        }
    }

    fn root_str(temp: &TempDir) -> String {
        normalize(temp.path().to_str().unwrap()).unwrap()
    }

    fn relative_paths(temp: &TempDir, catalog: FileCatalog) -> Vec<String> {
        let root = root_str(temp);
        catalog
            .into_records()
            .iter()
            .map(|r| relative_to(r.path(), &root).unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_scan_simple_tree() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::write(root.join("file1.txt"), "content1").unwrap();
        fs::write(root.join("file2.txt"), "content2").unwrap();
        fs::create_dir(root.join("dir1")).unwrap();
        fs::write(root.join("dir1/file3.txt"), "content3").unwrap();

        let ctx = RunContext::default();
        let catalog = FileCatalog::new();
        scan(root, &catalog, &ctx).unwrap();

        let records = catalog.with_records(<[FileRecord]>::to_vec);
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.has_digest()));
        assert_eq!(
            relative_paths(&temp, catalog),
            vec!["file1.txt", "file2.txt", "dir1/file3.txt"]
        );
        assert_eq!(ctx.stats.snapshot().bytes_hashed, 24);
    }

    #[test]
    fn test_scan_records_size_and_mtime() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("test.txt"), "content").unwrap();

        let catalog = FileCatalog::new();
        scan(temp.path(), &catalog, &RunContext::default()).unwrap();

        let records = catalog.into_records();
        assert_eq!(records[0].size, 7);
        assert!(records[0].mtime.is_some());
        assert_eq!(
            records[0].digest(),
            "ed7002b439e9ac845f22357d822bac1444730fbdb6016d3ec9432297b9ec9f73"
        );
    }

    #[test]
    fn test_scan_deeply_nested_tree() {
        let temp = TempDir::new().unwrap();
        let mut dir = temp.path().to_path_buf();
        for i in 0..64 {
            dir = dir.join(format!("d{i}"));
        }
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("leaf.txt"), "leaf").unwrap();

        let catalog = FileCatalog::new();
        scan(temp.path(), &catalog, &RunContext::default()).unwrap();

        let records = catalog.into_records();
        assert_eq!(records.len(), 1);
        assert!(records[0].path().ends_with("/d63/leaf.txt"));
    }

    #[test]
    fn test_scan_non_recursive() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("top.txt"), "top").unwrap();
        fs::create_dir(temp.path().join("sub")).unwrap();
        fs::write(temp.path().join("sub/nested.txt"), "nested").unwrap();

        let ctx = ctx_with(ScanPolicy {
            recursive: false,
            ..ScanPolicy::default()
        });
        let catalog = FileCatalog::new();
        scan(temp.path(), &catalog, &ctx).unwrap();

        assert_eq!(relative_paths(&temp, catalog), vec!["top.txt"]);
    }

    #[test]
    fn test_scan_filters_match_relative_paths() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("build")).unwrap();
        fs::write(temp.path().join("build/out.txt"), "x").unwrap();
        fs::create_dir(temp.path().join("src")).unwrap();
        fs::write(temp.path().join("src/lib.txt"), "y").unwrap();
        fs::write(temp.path().join("src/lib.bin"), "z").unwrap();
        fs::write(temp.path().join(".hidden.txt"), "h").unwrap();

        let ctx = ctx_with(ScanPolicy {
            ignore_hidden: true,
            include: vec![".txt".to_string()],
            exclude: vec!["build".to_string()],
            ..ScanPolicy::default()
        });
        let catalog = FileCatalog::new();
        scan(temp.path(), &catalog, &ctx).unwrap();

        assert_eq!(relative_paths(&temp, catalog), vec!["src/lib.txt"]);
    }

    #[test]
    #[cfg(unix)]
    fn test_scan_skips_symlinks_by_default() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("target.txt"), "content").unwrap();
        std::os::unix::fs::symlink("target.txt", temp.path().join("link.txt")).unwrap();

        let catalog = FileCatalog::new();
        scan(temp.path(), &catalog, &RunContext::default()).unwrap();

        assert_eq!(relative_paths(&temp, catalog), vec!["target.txt"]);
    }

    #[test]
    #[cfg(unix)]
    fn test_scan_files_outside_target_under_link_path() {
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("real.txt"), "real").unwrap();

        let temp = TempDir::new().unwrap();
        std::os::unix::fs::symlink(outside.path().join("real.txt"), temp.path().join("link"))
            .unwrap();

        let ctx = ctx_with(ScanPolicy {
            follow_symlinks: true,
            ..ScanPolicy::default()
        });
        let catalog = FileCatalog::new();
        scan(temp.path(), &catalog, &ctx).unwrap();

        let records = catalog.into_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].size, 4);
        assert!(records[0].has_digest());
        let root = ScanRoot::new(temp.path()).unwrap();
        assert_eq!(root.relative(records[0].path()), Some("link"));
    }

    #[test]
    #[cfg(unix)]
    fn test_scan_files_inside_target_under_resolved_path() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("real.txt"), "real").unwrap();
        std::os::unix::fs::symlink("real.txt", temp.path().join("link")).unwrap();

        let ctx = ctx_with(ScanPolicy {
            follow_symlinks: true,
            ..ScanPolicy::default()
        });
        let catalog = FileCatalog::new();
        scan(temp.path(), &catalog, &ctx).unwrap();

        let root = ScanRoot::new(temp.path()).unwrap();
        let paths: Vec<_> = catalog
            .into_records()
            .iter()
            .map(|r| root.relative(r.path()).map(str::to_string))
            .collect();
        assert_eq!(paths, vec![Some("real.txt".to_string()), Some("real.txt".to_string())]);
    }

    #[test]
    #[cfg(unix)]
    fn test_scan_relative_symlink_resolves_against_link_dir() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("sub")).unwrap();
        fs::write(temp.path().join("sub/target.txt"), "t").unwrap();
        std::os::unix::fs::symlink("target.txt", temp.path().join("sub/link")).unwrap();

        let ctx = ctx_with(ScanPolicy {
            follow_symlinks: true,
            ..ScanPolicy::default()
        });
        let catalog = FileCatalog::new();
        scan(temp.path(), &catalog, &ctx).unwrap();

        let records = catalog.into_records();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.path().ends_with("sub/target.txt")));
    }

    #[test]
    #[cfg(unix)]
    fn test_scan_never_enters_symlinked_directories_or_loops() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("dir")).unwrap();
        fs::write(temp.path().join("dir/file.txt"), "f").unwrap();
        std::os::unix::fs::symlink("..", temp.path().join("dir/parent_link")).unwrap();
        std::os::unix::fs::symlink("self", temp.path().join("self")).unwrap();
        std::os::unix::fs::symlink("b", temp.path().join("a")).unwrap();
        std::os::unix::fs::symlink("a", temp.path().join("b")).unwrap();
        std::os::unix::fs::symlink("/nonexistent/target", temp.path().join("dangling")).unwrap();

        let ctx = ctx_with(ScanPolicy {
            follow_symlinks: true,
            ..ScanPolicy::default()
        });
        let catalog = FileCatalog::new();
        scan(temp.path(), &catalog, &ctx).unwrap();

        assert_eq!(relative_paths(&temp, catalog), vec!["dir/file.txt"]);
    }

    #[test]
    fn test_scan_missing_root_is_an_error() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("missing");

        let result = scan(&missing, &FileCatalog::new(), &RunContext::default());

        match result {
            Err(e @ ScanError::Io { .. }) => assert_eq!(e.exit_status(), ExitStatus::FileIoError),
            other => panic!("Expected Io error, got {other:?}"),
        }
    }

    #[test]
    fn test_scan_root_must_be_directory() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("file.txt");
        fs::write(&file, "x").unwrap();

        let result = scan(&file, &FileCatalog::new(), &RunContext::default());

        assert!(matches!(result, Err(ScanError::NotADirectory(_))));
    }

    #[test]
    #[cfg(unix)]
    fn test_scan_unreadable_subdirectory_is_counted_not_fatal() {
        use std::os::unix::fs::PermissionsExt;

        if nix::unistd::geteuid().is_root() {
            return;
        }

        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("ok.txt"), "ok").unwrap();
        let restricted = temp.path().join("restricted");
        fs::create_dir(&restricted).unwrap();
        fs::write(restricted.join("hidden.txt"), "no").unwrap();
        fs::set_permissions(&restricted, fs::Permissions::from_mode(0o000)).unwrap();

        let ctx = RunContext::default();
        let catalog = FileCatalog::new();
        let result = scan(temp.path(), &catalog, &ctx);

        fs::set_permissions(&restricted, fs::Permissions::from_mode(0o755)).unwrap();

        result.unwrap();
        assert_eq!(relative_paths(&temp, catalog), vec!["ok.txt"]);
        assert_eq!(ctx.stats.snapshot().errors, 1);
    }

    #[test]
    fn test_scan_cancelled_before_first_entry() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.txt"), "a").unwrap();

        let ctx = RunContext::default();
        ctx.cancel.cancel();
        let catalog = FileCatalog::new();

        let result = scan(temp.path(), &catalog, &ctx);

        assert!(matches!(result, Err(ScanError::Interrupted)));
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_scan_stops_when_catalog_is_full() {
        let temp = TempDir::new().unwrap();
        for i in 0..3 {
            fs::write(temp.path().join(format!("f{i}")), "x").unwrap();
        }

        let catalog = FileCatalog::with_limit(2);
        let result = scan(temp.path(), &catalog, &RunContext::default());

        match result {
            Err(e @ ScanError::Catalog(CatalogError::CapacityExceeded { .. })) => {
                assert_eq!(e.exit_status(), ExitStatus::MemoryError)
            }
            other => panic!("Expected capacity error, got {other:?}"),
        }
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_list_leaves_digest_unset() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.txt"), "abc").unwrap();

        let ctx = RunContext::default();
        let catalog = FileCatalog::new();
        list(temp.path(), &catalog, &ctx).unwrap();

        let records = catalog.into_records();
        assert_eq!(records.len(), 1);
        assert!(!records[0].has_digest());
        assert_eq!(records[0].size, 3);
        assert_eq!(ctx.stats.snapshot().bytes_hashed, 0);
    }

    #[test]
    #[cfg(unix)]
    fn test_count_matches_scan_decisions() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.txt"), "a").unwrap();
        fs::write(temp.path().join(".hidden"), "h").unwrap();
        fs::create_dir(temp.path().join("sub")).unwrap();
        fs::write(temp.path().join("sub/b.txt"), "b").unwrap();
        fs::write(temp.path().join("sub/skip.tmp"), "t").unwrap();
        std::os::unix::fs::symlink("a.txt", temp.path().join("link")).unwrap();
        std::os::unix::fs::symlink("sub", temp.path().join("dirlink")).unwrap();

        let ctx = ctx_with(ScanPolicy {
            follow_symlinks: true,
            ignore_hidden: true,
            exclude: vec![".tmp".to_string()],
            ..ScanPolicy::default()
        });

        let total = count(temp.path(), &ctx).unwrap();
        let catalog = FileCatalog::new();
        scan(temp.path(), &catalog, &ctx).unwrap();

        assert_eq!(total, 3);
        assert_eq!(catalog.len(), total);
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn test_non_utf8_names_are_skipped() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.txt"), "a").unwrap();
        fs::write(temp.path().join(OsStr::from_bytes(b"bad\xff")), "bad").unwrap();
        fs::create_dir(temp.path().join("sub")).unwrap();
        fs::write(temp.path().join("sub/b.txt"), "b").unwrap();

        let ctx = RunContext::default();
        let catalog = FileCatalog::new();
        scan(temp.path(), &catalog, &ctx).unwrap();
        assert_eq!(relative_paths(&temp, catalog), vec!["a.txt", "sub/b.txt"]);

        let listed = FileCatalog::new();
        list(temp.path(), &listed, &ctx).unwrap();
        assert_eq!(relative_paths(&temp, listed), vec!["a.txt", "sub/b.txt"]);

        assert_eq!(count(temp.path(), &ctx).unwrap(), 2);
    }

    #[test]
    #[cfg(unix)]
    fn test_backslash_names_are_counted_as_errors() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a\\b.txt"), "x").unwrap();
        fs::write(temp.path().join("ok.txt"), "ok").unwrap();

        let ctx = RunContext::default();
        let catalog = FileCatalog::new();
        scan(temp.path(), &catalog, &ctx).unwrap();

        assert_eq!(relative_paths(&temp, catalog), vec!["ok.txt"]);
        assert_eq!(ctx.stats.snapshot().errors, 1);
    }

    #[test]
    #[cfg(unix)]
    fn test_count_leaves_error_counter_to_the_scan() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a\\b.txt"), "x").unwrap();
        fs::write(temp.path().join("ok.txt"), "ok").unwrap();

        let ctx = RunContext::default();

        assert_eq!(count(temp.path(), &ctx).unwrap(), 1);
        assert_eq!(ctx.stats.snapshot().errors, 0);
    }

    #[test]
    fn test_scan_root_relative_lookup() {
        let temp = TempDir::new().unwrap();
        let root = ScanRoot::new(temp.path()).unwrap();
        let inside = format!("{}/x/y.txt", root.as_str());

        assert_eq!(root.relative(&inside), Some("x/y.txt"));
        assert_eq!(root.relative("/definitely/elsewhere"), None);
    }
}
