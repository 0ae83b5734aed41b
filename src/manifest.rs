//! Manifest text format.
//!
//! One record per line, `<64 hex digest> *<path>`, newline terminated. This
//! is the layout `sha256sum --binary` produces, so manifests can be checked
//! with stock tools as well.

use crate::catalog::{CatalogError, FileCatalog, FileRecord, is_hex_digest};
use crate::checksum::DIGEST_HEX_LEN;
use crate::context::RunContext;
use crate::exit_status::ExitStatus;
use std::ffi::OsString;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("IO error on manifest {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("Invalid manifest destination: {0}")]
    InvalidDestination(PathBuf),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("Interrupted before the manifest was published")]
    Interrupted,
}

impl ManifestError {
    pub fn exit_status(&self) -> ExitStatus {
        match self {
            ManifestError::Io { .. }
            | ManifestError::PermissionDenied(_)
            | ManifestError::InvalidDestination(_) => ExitStatus::FileIoError,
            ManifestError::Catalog(e) => e.exit_status(),
            ManifestError::Interrupted => ExitStatus::Interrupted,
        }
    }

    pub(crate) fn from_io(e: std::io::Error, path: &Path) -> Self {
        if e.kind() == ErrorKind::PermissionDenied {
            ManifestError::PermissionDenied(path.to_path_buf())
        } else {
            ManifestError::Io {
                path: path.to_path_buf(),
                source: e,
            }
        }
    }
}

/// One parsed manifest line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Lowercase hex digest.
    pub digest: String,
    pub path: String,
}

/// Parses `<digest> *<path>`.
///
/// The digest must be exactly 64 hex characters (either case; stored
/// lowercase) followed by a single space and `*`. The path runs to the end of
/// the line; a trailing `\r` is dropped. Returns `None` for anything else.
pub fn parse_line(line: &str) -> Option<ManifestEntry> {
    let line = line.strip_suffix('\n').unwrap_or(line);
    let line = line.strip_suffix('\r').unwrap_or(line);

    let digest = line.get(..DIGEST_HEX_LEN)?.to_ascii_lowercase();
    if !is_hex_digest(&digest) {
        return None;
    }
    let path = line[DIGEST_HEX_LEN..].strip_prefix(" *")?;
    if path.is_empty() {
        return None;
    }

    Some(ManifestEntry {
        digest,
        path: path.to_string(),
    })
}

/// Writes every hashed record of `catalog` in catalog order.
///
/// Records without a digest and paths containing a newline cannot be
/// represented and are skipped with a warning.
pub fn write<W: Write>(catalog: &FileCatalog, writer: &mut W) -> std::io::Result<usize> {
    catalog.with_records(|records| {
        let mut written = 0;
        for record in records {
            if !record.has_digest() {
                warn!("Not writing unhashed entry {}", record.path());
                continue;
            }
            if record.path().contains('\n') {
                warn!("Not writing path containing a newline: {:?}", record.path());
                continue;
            }
            writeln!(writer, "{} *{}", record.digest(), record.path())?;
            written += 1;
        }
        Ok(written)
    })
}

/// Streaming manifest parser.
///
/// Yields one [`ManifestEntry`] per well-formed line. Malformed lines,
/// including lines that are not valid UTF-8, are skipped.
pub struct ManifestReader<R> {
    reader: R,
    buffer: Vec<u8>,
    line_no: usize,
}

impl<R: BufRead> ManifestReader<R> {
    pub fn new(reader: R) -> Self {
        ManifestReader {
            reader,
            buffer: Vec::new(),
            line_no: 0,
        }
    }
}

impl ManifestReader<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self, ManifestError> {
        let file = File::open(path).map_err(|e| ManifestError::from_io(e, path))?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> Iterator for ManifestReader<R> {
    type Item = std::io::Result<ManifestEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buffer.clear();
            match self.reader.read_until(b'\n', &mut self.buffer) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(e)),
            }
            self.line_no += 1;

            let parsed = std::str::from_utf8(&self.buffer).ok().and_then(parse_line);
            match parsed {
                Some(entry) => return Some(Ok(entry)),
                None => debug!("Skipping malformed manifest line {}", self.line_no),
            }
        }
    }
}

/// Reads the manifest file at `path` into a catalog. Records carry no size
/// or mtime.
pub fn load(path: &Path) -> Result<FileCatalog, ManifestError> {
    read_into(ManifestReader::open(path)?, path)
}

fn read_into<R: BufRead>(
    reader: ManifestReader<R>,
    path: &Path,
) -> Result<FileCatalog, ManifestError> {
    let catalog = FileCatalog::new();
    for entry in reader {
        let entry = entry.map_err(|e| ManifestError::from_io(e, path))?;
        catalog.push(FileRecord::new(entry.path, entry.digest, 0, None)?)?;
    }
    Ok(catalog)
}

/// Whether the scanned file at `candidate` is the manifest at `manifest`
/// itself.
///
/// Only entries sharing the manifest's file name are resolved, so this is
/// cheap to call for every record of a scan.
pub fn is_manifest_file(manifest: &Path, candidate: &str) -> bool {
    let candidate = Path::new(candidate);
    if manifest.file_name().is_none() || candidate.file_name() != manifest.file_name() {
        return false;
    }
    match (manifest.canonicalize(), candidate.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Path of the temporary file used while publishing `dest`.
pub fn temp_path(dest: &Path) -> Result<PathBuf, ManifestError> {
    let file_name = dest
        .file_name()
        .ok_or_else(|| ManifestError::InvalidDestination(dest.to_path_buf()))?;
    let mut name = OsString::from(file_name);
    name.push(format!(".tmp.{}", std::process::id()));
    Ok(dest.with_file_name(name))
}

/// Atomically replaces `dest` with the contents of `catalog`.
///
/// Writes to `<dest>.tmp.<pid>` beside the destination, fsyncs it, then
/// renames it over `dest`. Readers therefore see either the previous
/// manifest or the new one, never a partial file. The temporary file is
/// removed on every failure path, including cancellation observed just
/// before the rename.
pub fn publish(catalog: &FileCatalog, dest: &Path, ctx: &RunContext) -> Result<usize, ManifestError> {
    let temp_path = temp_path(dest)?;
    let parent = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    // A leftover from an earlier run with the same pid would block creation.
    match std::fs::remove_file(&temp_path) {
        Ok(()) => debug!("Removed stale {}", temp_path.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(ManifestError::from_io(e, &temp_path)),
    }

    let mut prefix = dest.file_name().map(OsString::from).unwrap_or_default();
    prefix.push(".tmp.");
    let suffix = std::process::id().to_string();

    let mut temp_file = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(&suffix)
        .rand_bytes(0)
        .tempfile_in(parent)
        .map_err(|e| ManifestError::from_io(e, &temp_path))?;

    let written = {
        let mut writer = BufWriter::new(&mut temp_file);
        let written = write(catalog, &mut writer).map_err(|e| ManifestError::from_io(e, &temp_path))?;
        writer
            .flush()
            .map_err(|e| ManifestError::from_io(e, &temp_path))?;
        written
    };

    temp_file
        .as_file()
        .sync_all()
        .map_err(|e| ManifestError::from_io(e, &temp_path))?;

    if ctx.is_cancelled() {
        return Err(ManifestError::Interrupted);
    }

    temp_file
        .persist(dest)
        .map_err(|e| ManifestError::from_io(e.error, dest))?;

    info!("Wrote {} entries to {}", written, dest.display());

    Ok(written)
}
