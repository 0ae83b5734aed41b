use crate::catalog::{CatalogError, FileCatalog, FileRecord};
use crate::context::{Counters, RunContext};
use crate::exit_status::ExitStatus;
use crate::manifest::{self, ManifestError};
use crate::report;
use crate::scan::{self, ScanError, ScanRoot};
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("At least one source directory is required")]
    NoSources,
    #[error("Failed to scan {path}: {source}")]
    Scan { path: PathBuf, source: ScanError },
    #[error("No files found to process")]
    NothingToProcess,
    #[error("Sources disagree on the contents of {0}; write them to separate manifests")]
    PathCollision(String),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),
}

impl GenerateError {
    pub fn exit_status(&self) -> ExitStatus {
        match self {
            GenerateError::NoSources => ExitStatus::InvalidArguments,
            GenerateError::Scan { source, .. } => source.exit_status(),
            GenerateError::NothingToProcess => ExitStatus::GeneralError,
            GenerateError::PathCollision(_) => ExitStatus::InvalidArguments,
            GenerateError::Catalog(e) => e.exit_status(),
            GenerateError::Manifest(e) => e.exit_status(),
        }
    }
}

#[derive(Debug)]
pub struct GenerateReport {
    pub manifest: PathBuf,
    /// Entries in the manifest (or that would be, for a dry run).
    pub files: usize,
    pub dry_run: bool,
    pub counters: Counters,
}

/// Scan every source tree and publish one manifest covering all of them.
///
/// # Behavior
///
/// - Sources are scanned in order into one shared catalog. The first scan
///   failure, including cancellation, aborts the run; nothing is written.
/// - Each entry is recorded relative to the source root it was found under.
///   A followed symlink is recorded under its target's path when the target
///   is inside the tree and under its own path otherwise.
/// - Sources whose trees hold the same relative path with different contents
///   fail with `PathCollision`, since no single mirror could match both.
/// - The destination manifest is skipped if it lies inside a source tree.
/// - Entries are sorted by path, so an unchanged tree always produces a
///   byte-identical manifest.
/// - An empty catalog fails with `NothingToProcess` and leaves any existing
///   manifest untouched.
/// - With `dry_run`, everything runs except the write and rename.
///
/// The manifest is published atomically (see [`manifest::publish`]).
pub fn generate(
    sources: &[PathBuf],
    manifest_path: &Path,
    ctx: &RunContext,
) -> Result<GenerateReport, GenerateError> {
    if sources.is_empty() {
        return Err(GenerateError::NoSources);
    }

    info!("Generating manifest {} from {} source(s)", manifest_path.display(), sources.len());

    if ctx.count_first {
        let mut total = 0;
        for source in sources {
            total += scan::count(source, ctx).map_err(|e| GenerateError::Scan {
                path: source.clone(),
                source: e,
            })?;
        }
        info!("Found {} files to hash", total);
        ctx.stats.set_total(total);
    }

    let catalog = FileCatalog::new();
    let mut spans: Vec<(ScanRoot, Range<usize>)> = Vec::with_capacity(sources.len());

    for (i, source) in sources.iter().enumerate() {
        info!("Scanning source {}/{}: {}", i + 1, sources.len(), source.display());
        let scan_err = |e| GenerateError::Scan {
            path: source.clone(),
            source: e,
        };
        let root = ScanRoot::new(source).map_err(scan_err)?;
        let start = catalog.len();
        scan::scan(source, &catalog, ctx).map_err(scan_err)?;
        spans.push((root, start..catalog.len()));
    }

    if catalog.is_empty() {
        return Err(GenerateError::NothingToProcess);
    }

    let entries = manifest_catalog(&catalog, &spans, manifest_path)?;
    let files = entries.len();
    if files == 0 {
        return Err(GenerateError::NothingToProcess);
    }
    ctx.stats.add_processed(files);

    if ctx.policy.dry_run {
        entries.with_records(|records| {
            for record in records {
                info!(
                    "  {} ({}, modified {})",
                    record.path(),
                    report::format_size(record.size),
                    record
                        .mtime
                        .map(report::format_mtime)
                        .unwrap_or_else(|| "unknown".to_string())
                );
            }
        });
        info!("DRY RUN - {} would list {} files", manifest_path.display(), files);
    } else {
        manifest::publish(&entries, manifest_path, ctx)?;
    }

    Ok(GenerateReport {
        manifest: manifest_path.to_path_buf(),
        files,
        dry_run: ctx.policy.dry_run,
        counters: ctx.stats.snapshot(),
    })
}

/// Re-files scanned records under their manifest paths, sorted.
fn manifest_catalog(
    scanned: &FileCatalog,
    spans: &[(ScanRoot, Range<usize>)],
    manifest_path: &Path,
) -> Result<FileCatalog, GenerateError> {
    let entries = FileCatalog::new();

    scanned.with_records(|records| {
        for (root, span) in spans {
            for record in &records[span.clone()] {
                if manifest::is_manifest_file(manifest_path, record.path()) {
                    debug!("Not listing the manifest itself: {}", record.path());
                    continue;
                }
                let path = root.relative(record.path()).unwrap_or(record.path());
                entries.push(record.with_path(path)?)?;
            }
        }
        Ok::<_, CatalogError>(())
    })?;

    entries.sort_by_path();
    if let Some(path) = entries.with_records(conflicting_path) {
        return Err(GenerateError::PathCollision(path));
    }
    Ok(entries)
}

/// First path listed twice with different digests, in path-sorted records.
fn conflicting_path(records: &[FileRecord]) -> Option<String> {
    records
        .windows(2)
        .find(|pair| pair[0].path() == pair[1].path() && pair[0].digest() != pair[1].digest())
        .map(|pair| pair[0].path().to_string())
}
