//! Per-invocation state threaded through every operation.
//!
//! A [`RunContext`] bundles the scan policy, the cancellation token and the
//! statistics counters for one run. Nothing here is process-global: the
//! binary builds one context per invocation and each service returns a
//! snapshot of the counters in its report.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Policies consumed by the scanner, the verifier and the manifest writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanPolicy {
    /// Resolve symlinks to regular files and hash their targets.
    pub follow_symlinks: bool,
    /// Descend into subdirectories.
    pub recursive: bool,
    /// Skip entries whose name starts with a dot.
    pub ignore_hidden: bool,
    /// Whether include/exclude patterns match case-sensitively.
    pub case_sensitive: bool,
    /// Allow-list of substrings. Empty means everything is allowed.
    pub include: Vec<String>,
    /// Deny-list of substrings.
    pub exclude: Vec<String>,
    /// Report mirror files that the manifest does not mention.
    pub check_extra: bool,
    /// Scan and hash, but never write the manifest.
    pub dry_run: bool,
}

impl Default for ScanPolicy {
    fn default() -> Self {
        ScanPolicy {
            follow_symlinks: false,
            recursive: true,
            ignore_hidden: false,
            case_sensitive: true,
            include: Vec::new(),
            exclude: Vec::new(),
            check_extra: true,
            dry_run: false,
        }
    }
}

/// Cooperative cancellation flag.
///
/// Cloning shares the underlying flag. Raising it never interrupts a
/// syscall in flight; operations observe it at their next checkpoint.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Returns the shared flag so that a signal handler can raise it.
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.0)
    }
}

/// Snapshot of the run counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    /// Pre-counted number of files, when progress reporting asked for it.
    pub total: Option<usize>,
    pub processed: usize,
    pub missing: usize,
    pub corrupt: usize,
    pub extra: usize,
    pub errors: usize,
    /// Paths excluded outright because they contain traversal segments.
    pub rejected: usize,
    pub bytes_hashed: u64,
}

/// Lock-protected counters shared by the scanning and verification paths.
#[derive(Debug, Default)]
pub struct Statistics {
    counters: Mutex<Counters>,
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    fn update(&self, f: impl FnOnce(&mut Counters)) {
        let mut counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut counters);
    }

    pub fn set_total(&self, total: usize) {
        self.update(|c| c.total = Some(total));
    }

    pub fn add_processed(&self, n: usize) {
        self.update(|c| c.processed += n);
    }

    pub fn add_missing(&self) {
        self.update(|c| c.missing += 1);
    }

    pub fn add_corrupt(&self) {
        self.update(|c| c.corrupt += 1);
    }

    pub fn add_extra(&self) {
        self.update(|c| c.extra += 1);
    }

    pub fn add_error(&self) {
        self.update(|c| c.errors += 1);
    }

    pub fn add_rejected(&self) {
        self.update(|c| c.rejected += 1);
    }

    pub fn add_bytes(&self, n: u64) {
        self.update(|c| c.bytes_hashed += n);
    }

    pub fn snapshot(&self) -> Counters {
        *self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Everything an operation needs besides its path arguments.
#[derive(Debug, Default)]
pub struct RunContext {
    pub policy: ScanPolicy,
    pub cancel: CancelToken,
    pub stats: Statistics,
    /// Pre-count files before hashing so progress can be reported as a fraction.
    pub count_first: bool,
}

impl RunContext {
    pub fn new(policy: ScanPolicy, cancel: CancelToken) -> Self {
        RunContext {
            policy,
            cancel,
            stats: Statistics::new(),
            count_first: false,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
