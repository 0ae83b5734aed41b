use crate::catalog::FileCatalog;
use crate::checksum::{ChecksumError, checksum_file};
use crate::context::{Counters, RunContext};
use crate::exit_status::ExitStatus;
use crate::manifest::{self, ManifestEntry, ManifestError, ManifestReader};
use crate::sanitize::{self, is_filtered, is_safe, normalize};
use crate::scan::{self, ScanError, ScanRoot};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, error, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),
    #[error("Mirror scan error: {0}")]
    Scan(#[from] ScanError),
    #[error("Interrupted during verification")]
    Interrupted,
    #[error(
        "Verification failed: {} missing, {} corrupt, {} errors",
        .0.counters.missing,
        .0.counters.corrupt,
        .0.counters.errors
    )]
    Failed(Box<VerifyReport>),
}

impl VerifyError {
    pub fn exit_status(&self) -> ExitStatus {
        match self {
            VerifyError::Manifest(e) => e.exit_status(),
            VerifyError::Scan(e) => e.exit_status(),
            VerifyError::Interrupted => ExitStatus::Interrupted,
            VerifyError::Failed(_) => ExitStatus::VerifyFailed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Valid,
    Missing,
    Corrupt,
    /// In the mirror but not in the manifest.
    Extra,
    /// Exists but is not a regular file, could not be hashed, or has a path
    /// that cannot be normalized.
    Error,
}

impl Verdict {
    pub fn label(self) -> &'static str {
        match self {
            Verdict::Valid => "VALID",
            Verdict::Missing => "MISSING",
            Verdict::Corrupt => "CORRUPT",
            Verdict::Extra => "EXTRA",
            Verdict::Error => "ERROR",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyEntry {
    /// Path as written in the manifest, or mirror-relative for extras.
    pub path: String,
    pub verdict: Verdict,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    /// Every entry that did not verify as valid, manifest entries first
    /// (in manifest order), then extras sorted by path.
    pub entries: Vec<VerifyEntry>,
    pub counters: Counters,
}

impl VerifyReport {
    /// Extras are reported but never fail a run.
    pub fn is_success(&self) -> bool {
        self.counters.missing == 0 && self.counters.corrupt == 0 && self.counters.errors == 0
    }
}

/// Mirror files found by the extra-file pre-scan, keyed by mirror-relative
/// path. The flag records whether a manifest entry consumed the file.
type MirrorListing = BTreeMap<String, bool>;

/// Check a mirror tree against a manifest.
///
/// # Behavior
///
/// - The manifest is streamed one line at a time; malformed lines are skipped.
/// - Entries with traversal segments are rejected before touching the
///   filesystem and counted under `rejected`.
/// - Entries filtered by the policy are skipped, using the same decisions a
///   scan of the mirror would make.
/// - Every other entry is resolved under `mirror` and classified as
///   [`Verdict::Valid`], [`Verdict::Missing`], [`Verdict::Corrupt`] or
///   [`Verdict::Error`]. Per-entry failures never abort the run.
/// - With `check_extra`, the mirror is listed up front and every listed file
///   that no manifest entry named is reported as [`Verdict::Extra`]. The
///   manifest file itself is never an extra.
///
/// # Errors
///
/// Structural failures (unreadable manifest, missing mirror root) abort
/// without a report. Cancellation is observed once per manifest line and per
/// hashed chunk. A completed run with any missing, corrupt or errored entry
/// returns [`VerifyError::Failed`] carrying the full report.
pub fn verify(mirror: &Path, manifest_path: &Path, ctx: &RunContext) -> Result<VerifyReport, VerifyError> {
    info!("Verifying {} against {}", mirror.display(), manifest_path.display());

    let root = ScanRoot::new(mirror)?;
    let root_metadata = std::fs::metadata(mirror).map_err(|e| ScanError::Io {
        path: mirror.to_path_buf(),
        source: e,
    })?;
    if !root_metadata.is_dir() {
        return Err(ScanError::NotADirectory(mirror.to_path_buf()).into());
    }

    let reader = ManifestReader::open(manifest_path)?;

    if ctx.count_first {
        let total = ManifestReader::open(manifest_path)?.filter(Result::is_ok).count();
        info!("Manifest lists {} files", total);
        ctx.stats.set_total(total);
    }

    let mut listing = if ctx.policy.check_extra {
        Some(list_mirror(mirror, &root, manifest_path, ctx)?)
    } else {
        None
    };

    let mut entries = Vec::new();
    let total = ctx.stats.snapshot().total;

    for entry in reader {
        if ctx.is_cancelled() {
            return Err(VerifyError::Interrupted);
        }
        let entry = entry.map_err(|e| ManifestError::from_io(e, manifest_path))?;

        let Some((relative, verdict)) = check_entry(&root, &entry, ctx)? else {
            continue;
        };

        ctx.stats.add_processed(1);
        record_verdict(&entry.path, verdict, ctx);
        if verdict != Verdict::Valid {
            entries.push(VerifyEntry {
                path: entry.path,
                verdict,
            });
        }

        if let Some(consumed) = listing.as_mut().and_then(|l| l.get_mut(&relative)) {
            *consumed = true;
        }

        if let Some(total) = total {
            debug!("Verified {}/{} files", ctx.stats.snapshot().processed, total);
        }
    }

    if let Some(listing) = listing {
        for (path, _) in listing.into_iter().filter(|(_, consumed)| !consumed) {
            record_verdict(&path, Verdict::Extra, ctx);
            entries.push(VerifyEntry {
                path,
                verdict: Verdict::Extra,
            });
        }
    }

    let report = VerifyReport {
        entries,
        counters: ctx.stats.snapshot(),
    };

    if report.is_success() {
        info!("Verification passed");
        Ok(report)
    } else {
        Err(VerifyError::Failed(Box::new(report)))
    }
}

/// Lists the mirror without hashing, keyed the way manifest entries are.
fn list_mirror(
    mirror: &Path,
    root: &ScanRoot,
    manifest_path: &Path,
    ctx: &RunContext,
) -> Result<MirrorListing, VerifyError> {
    debug!("Listing {} for extra files", mirror.display());

    let catalog = FileCatalog::new();
    scan::list(mirror, &catalog, ctx)?;

    let mut listing = MirrorListing::new();
    for record in catalog.into_records() {
        if manifest::is_manifest_file(manifest_path, record.path()) {
            continue;
        }
        let key = root.relative(record.path()).unwrap_or(record.path());
        listing.insert(key.to_string(), false);
    }
    Ok(listing)
}

/// Classifies one manifest entry.
///
/// Returns the normalized relative path together with the verdict, or `None`
/// when the entry is rejected or filtered and takes no part in the run.
fn check_entry(
    root: &ScanRoot,
    entry: &ManifestEntry,
    ctx: &RunContext,
) -> Result<Option<(String, Verdict)>, VerifyError> {
    if !is_safe(&entry.path) {
        warn!("Rejecting unsafe manifest path: {}", entry.path);
        ctx.stats.add_rejected();
        return Ok(None);
    }

    let relative = match normalize(&entry.path) {
        Ok(relative) => relative,
        Err(e) => {
            warn!("Invalid manifest path: {}", e);
            return Ok(Some((entry.path.clone(), Verdict::Error)));
        }
    };

    if is_filtered(&relative, &ctx.policy) {
        debug!("Excluded {}", relative);
        return Ok(None);
    }

    let verdict = match sanitize::join(root.as_str(), &relative) {
        Ok(full) => classify(Path::new(&full), &entry.digest, ctx)?,
        Err(e) => {
            warn!("Invalid mirror path for {}: {}", relative, e);
            Verdict::Error
        }
    };

    Ok(Some((relative, verdict)))
}

fn classify(path: &Path, expected: &str, ctx: &RunContext) -> Result<Verdict, VerifyError> {
    match std::fs::metadata(path) {
        Ok(metadata) if metadata.is_file() => {}
        Ok(_) => {
            warn!("Not a regular file: {}", path.display());
            return Ok(Verdict::Error);
        }
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Verdict::Missing),
        Err(e) => {
            warn!("Cannot stat '{}': {}", path.display(), e);
            return Ok(Verdict::Error);
        }
    }

    match checksum_file(path, ctx) {
        Ok(checksum) if checksum.sha256 == expected => Ok(Verdict::Valid),
        Ok(checksum) => {
            debug!("Expected {} but found {} for {}", expected, checksum.sha256, path.display());
            Ok(Verdict::Corrupt)
        }
        Err(ChecksumError::Interrupted(_)) => Err(VerifyError::Interrupted),
        Err(e) => {
            warn!("Failed to hash {}: {}", path.display(), e);
            Ok(Verdict::Error)
        }
    }
}

fn record_verdict(path: &str, verdict: Verdict, ctx: &RunContext) {
    let label = verdict.label();
    match verdict {
        Verdict::Valid => info!("{}: {}", label, path),
        Verdict::Extra => warn!("{}: {}", label, path),
        Verdict::Missing | Verdict::Corrupt | Verdict::Error => error!("{}: {}", label, path),
    }
    match verdict {
        Verdict::Valid => {}
        Verdict::Missing => ctx.stats.add_missing(),
        Verdict::Corrupt => ctx.stats.add_corrupt(),
        Verdict::Extra => ctx.stats.add_extra(),
        Verdict::Error => ctx.stats.add_error(),
    }
}

#[cfg(test)]
mod tests;
