//! In-memory catalog of hashed files.

use crate::checksum::DIGEST_HEX_LEN;
use crate::exit_status::ExitStatus;
use std::sync::{Mutex, PoisonError};
use std::time::SystemTime;

/// Hard ceiling on the number of records a catalog may hold.
pub const MAX_RECORDS: usize = 1_000_000;

const INITIAL_CAPACITY: usize = 128;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("File catalog exceeds {limit} records")]
    CapacityExceeded { limit: usize },
    #[error("Catalog record has an empty path")]
    EmptyPath,
    #[error("Invalid digest for {path}: {digest:?}")]
    InvalidDigest { path: String, digest: String },
}

impl CatalogError {
    pub fn exit_status(&self) -> ExitStatus {
        match self {
            CatalogError::CapacityExceeded { .. } => ExitStatus::MemoryError,
            CatalogError::EmptyPath | CatalogError::InvalidDigest { .. } => {
                ExitStatus::InvalidFormat
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    path: String,
    digest: String,
    /// Informational only; never used for verification decisions.
    pub size: u64,
    /// Informational only. `None` for records read back from a manifest.
    pub mtime: Option<SystemTime>,
}

impl FileRecord {
    /// Builds a record, enforcing a non-empty path and a digest that is
    /// either empty (not computed) or exactly [`DIGEST_HEX_LEN`] lowercase
    /// hex characters.
    pub fn new(
        path: impl Into<String>,
        digest: impl Into<String>,
        size: u64,
        mtime: Option<SystemTime>,
    ) -> Result<Self, CatalogError> {
        let path = path.into();
        let digest = digest.into();

        if path.is_empty() {
            return Err(CatalogError::EmptyPath);
        }
        if !digest.is_empty() && !is_hex_digest(&digest) {
            return Err(CatalogError::InvalidDigest { path, digest });
        }

        Ok(FileRecord {
            path,
            digest,
            size,
            mtime,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Hex digest, or an empty string when the file was listed but not hashed.
    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn has_digest(&self) -> bool {
        !self.digest.is_empty()
    }

    /// Returns a copy of this record filed under a different path.
    pub fn with_path(&self, path: impl Into<String>) -> Result<Self, CatalogError> {
        FileRecord::new(path, self.digest.clone(), self.size, self.mtime)
    }
}

/// Whether `s` is a lowercase hex SHA-256 digest.
pub fn is_hex_digest(s: &str) -> bool {
    s.len() == DIGEST_HEX_LEN && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Growable, lock-protected collection of [`FileRecord`]s.
///
/// Records keep insertion order and are not deduplicated. Appends go
/// through `&self` so that several producers could share one catalog.
#[derive(Debug)]
pub struct FileCatalog {
    records: Mutex<Vec<FileRecord>>,
    limit: usize,
}

impl Default for FileCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl FileCatalog {
    pub fn new() -> Self {
        Self::with_limit(MAX_RECORDS)
    }

    /// Creates a catalog that refuses to grow past `limit` records.
    pub fn with_limit(limit: usize) -> Self {
        FileCatalog {
            records: Mutex::new(Vec::with_capacity(INITIAL_CAPACITY.min(limit))),
            limit,
        }
    }

    /// Appends a record.
    ///
    /// Fails with `CapacityExceeded` once the limit is reached; the catalog
    /// keeps what it already holds.
    pub fn push(&self, record: FileRecord) -> Result<(), CatalogError> {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        if records.len() >= self.limit {
            return Err(CatalogError::CapacityExceeded { limit: self.limit });
        }
        records.push(record);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorts records by path, byte-wise. Records with equal paths keep their
    /// relative order.
    pub fn sort_by_path(&self) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .sort_by(|a, b| a.path.cmp(&b.path));
    }

    /// Runs `f` over the records while holding the catalog lock.
    pub fn with_records<R>(&self, f: impl FnOnce(&[FileRecord]) -> R) -> R {
        f(&self.records.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn into_records(self) -> Vec<FileRecord> {
        self.records
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the records sorted by path.
    pub fn into_sorted(self) -> Vec<FileRecord> {
        let mut records = self.into_records();
        records.sort_by(|a, b| a.path.cmp(&b.path));
        records
    }
}
