use crate::context::RunContext;
use crate::exit_status::ExitStatus;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};

/// Length of a hex encoded SHA-256 digest.
pub const DIGEST_HEX_LEN: usize = 64;

/// Read size between cancellation checks.
const CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ChecksumError {
    #[error("IO error: {0}")]
    Io(std::io::Error),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("Not a regular file: {0}")]
    NotRegularFile(PathBuf),
    #[error("Interrupted while hashing {0}")]
    Interrupted(PathBuf),
}

impl ChecksumError {
    pub fn exit_status(&self) -> ExitStatus {
        match self {
            ChecksumError::Interrupted(_) => ExitStatus::Interrupted,
            _ => ExitStatus::FileIoError,
        }
    }

    fn from_io(e: std::io::Error, path: &Path) -> Self {
        if e.kind() == ErrorKind::PermissionDenied {
            ChecksumError::PermissionDenied(path.to_path_buf())
        } else {
            ChecksumError::Io(e)
        }
    }
}

pub struct FileChecksum {
    /// Hex encoded.
    pub sha256: String,
    /// Modification time captured after checksumming.
    pub mtime: SystemTime,
    /// File size in bytes.
    pub size: u64,
}

/// Computes the SHA-256 checksum of a regular file.
///
/// # Behavior
/// - Follows symlinks and rejects anything that is not a regular file
///   (directories, FIFOs, devices) before opening it
/// - Reads the file in 64 KiB chunks, adding each chunk's length to the
///   run's `bytes_hashed` counter
/// - Polls the cancellation token after every chunk; a raised token aborts
///   with `Interrupted` and no digest is returned
/// - Logs a warning if the modification time changed while reading. The
///   digest is still returned: metadata is informational only.
pub fn checksum_file(path: &Path, ctx: &RunContext) -> Result<FileChecksum, ChecksumError> {
    debug!("Checksumming {}", path.display());

    let metadata_before = std::fs::metadata(path).map_err(|e| ChecksumError::from_io(e, path))?;
    if !metadata_before.is_file() {
        return Err(ChecksumError::NotRegularFile(path.to_path_buf()));
    }
    let mtime_before = metadata_before.modified().map_err(ChecksumError::Io)?;

    let mut file = File::open(path).map_err(|e| ChecksumError::from_io(e, path))?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        if ctx.is_cancelled() {
            return Err(ChecksumError::Interrupted(path.to_path_buf()));
        }
        let bytes_read = match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(ChecksumError::Io(e)),
        };
        hasher.update(&buffer[..bytes_read]);
        ctx.stats.add_bytes(bytes_read as u64);
    }

    let metadata_after = std::fs::metadata(path).map_err(ChecksumError::Io)?;
    let mtime_after = metadata_after.modified().map_err(ChecksumError::Io)?;

    if mtime_before != mtime_after {
        warn!("File modified during checksumming: {}", path.display());
    }

    let sha256 = format!("{:x}", hasher.finalize());

    debug!("Checksum of {} is {}", path.display(), sha256);

    Ok(FileChecksum {
        sha256,
        mtime: mtime_after,
        size: metadata_after.len(),
    })
}
